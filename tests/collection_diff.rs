use pretty_assertions::assert_eq;

use entity_watcher::changeset::diff_collections;
use entity_watcher::{Collection, Key, Value};

fn list(items: &[&str]) -> Value {
    Value::from(items.to_vec())
}

fn keyed(entries: &[(&str, &str)]) -> Value {
    Value::map(entries.iter().copied())
}

fn diff(old: &Value, new: &Value) -> (Collection, Collection) {
    let old = Collection::from_value(old).unwrap();
    let new = Collection::from_value(new).unwrap();
    let d = diff_collections(&old, &new);
    (d.additions, d.removals)
}

#[test]
fn additions_and_removals_are_disjoint_from_the_other_side() {
    let old = list(&["a", "b", "c", "d"]);
    let new = list(&["c", "e", "a", "f"]);
    let (additions, removals) = diff(&old, &new);

    let old_c = Collection::from_value(&old).unwrap();
    let new_c = Collection::from_value(&new).unwrap();
    assert!(additions.values().all(|v| new_c.contains(v) && !old_c.contains(v)));
    assert!(removals.values().all(|v| old_c.contains(v) && !new_c.contains(v)));
    assert_eq!(additions, Collection::List(vec![Value::from("e"), Value::from("f")]));
    assert_eq!(removals, Collection::List(vec![Value::from("b"), Value::from("d")]));
}

#[test]
fn identical_and_reordered_inputs_have_no_changes() {
    let a = list(&["x", "y", "z"]);
    let (additions, removals) = diff(&a, &a);
    assert!(additions.is_empty());
    assert!(removals.is_empty());

    let (additions, removals) = diff(&a, &list(&["z", "x", "y"]));
    assert!(additions.is_empty());
    assert!(removals.is_empty());
}

#[test]
fn membership_is_strict() {
    let old = Value::from(vec![Value::Int(1), Value::from("2")]);
    let new = Value::from(vec![Value::from("1"), Value::Int(2)]);
    let (additions, removals) = diff(&old, &new);

    assert_eq!(additions, Collection::List(vec![Value::from("1"), Value::Int(2)]));
    assert_eq!(removals, Collection::List(vec![Value::Int(1), Value::from("2")]));
}

#[test]
fn duplicates_are_not_double_counted() {
    let (additions, removals) = diff(&list(&["a", "a", "b"]), &list(&["a", "b"]));
    assert!(additions.is_empty());
    assert!(removals.is_empty());
}

#[test]
fn null_sides_act_as_empty() {
    let (additions, removals) = diff(&Value::Null, &list(&["a"]));
    assert_eq!(additions, Collection::List(vec![Value::from("a")]));
    assert!(removals.is_empty());

    let (additions, removals) = diff(&list(&["a"]), &Value::Null);
    assert!(additions.is_empty());
    assert_eq!(removals, Collection::List(vec![Value::from("a")]));
}

#[test]
fn keyed_inputs_keep_their_keys() {
    let old = keyed(&[("admin", "ROLE_ADMIN"), ("user", "ROLE_USER")]);
    let new = keyed(&[("user", "ROLE_USER"), ("editor", "ROLE_EDITOR")]);
    let (additions, removals) = diff(&old, &new);

    assert_eq!(
        additions,
        Collection::Keyed([(Key::from("editor"), Value::from("ROLE_EDITOR"))].into_iter().collect())
    );
    assert_eq!(
        removals,
        Collection::Keyed([(Key::from("admin"), Value::from("ROLE_ADMIN"))].into_iter().collect())
    );
}

#[test]
fn mixed_shapes_use_source_positions_as_keys() {
    let old = list(&["a", "b"]);
    let new = keyed(&[("first", "a"), ("second", "c")]);
    let (additions, removals) = diff(&old, &new);

    assert_eq!(
        additions,
        Collection::Keyed([(Key::from("second"), Value::from("c"))].into_iter().collect())
    );
    assert_eq!(
        removals,
        Collection::Keyed([(Key::Int(1), Value::from("b"))].into_iter().collect())
    );
}

#[test]
fn map_with_dense_integer_keys_is_a_list() {
    let old = Value::map([(0i64, "a"), (1i64, "b")]);
    let (additions, removals) = diff(&old, &list(&["b", "c"]));

    assert_eq!(additions, Collection::List(vec![Value::from("c")]));
    assert_eq!(removals, Collection::List(vec![Value::from("a")]));
}

#[test]
fn applying_a_diff_reaches_the_new_membership() {
    let old = list(&["foo", "baz", "bar"]);
    let new = list(&["foo", "boom"]);
    let (additions, removals) = diff(&old, &new);

    let mut applied: Vec<Value> = Collection::from_value(&old)
        .unwrap()
        .values()
        .filter(|v| !removals.contains(v))
        .cloned()
        .collect();
    applied.extend(additions.values().cloned());

    let new_c = Collection::from_value(&new).unwrap();
    assert_eq!(applied.len(), new_c.len());
    assert!(new_c.values().all(|v| applied.contains(v)));
}

#[test]
fn dense_map_keeps_its_shape_through_json() {
    let old = Value::map([(0i64, "a"), (1i64, "b")]);
    let json = serde_json::to_string(&old).unwrap();
    let restored: Value = serde_json::from_str(&json).unwrap();

    assert_eq!(restored, old);
    assert!(Collection::from_value(&restored).unwrap().is_ordered());
    assert_eq!(diff(&old, &list(&["b", "c"])), diff(&restored, &list(&["b", "c"])));
}
