use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use entity_watcher::changeset::diff_collections;
use entity_watcher::{
    Collection, Entity, EntitySchema, EntityType, InMemorySession, Value, WatchOverrides, Watcher,
    WatcherConfig,
};

#[derive(Debug, Default)]
struct Account {
    name: String,
    roles: Vec<String>,
}

impl Entity for Account {
    fn entity_type(&self) -> EntityType {
        EntityType::new("Account")
    }
}

fn roles(n: usize, offset: usize) -> Collection {
    Collection::List((offset..offset + n).map(|i| Value::from(format!("ROLE_{i}"))).collect())
}

fn bench_diff(c: &mut Criterion) {
    let mut group = c.benchmark_group("diff/list");
    for size in [8usize, 64, 512] {
        // Half the elements overlap between old and new.
        let old = roles(size, 0);
        let new = roles(size, size / 2);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| diff_collections(black_box(&old), black_box(&new)));
        });
    }
    group.finish();
}

fn bench_flush(c: &mut Criterion) {
    c.bench_function("flush/update_two_watches", |b| {
        let mut watcher = Watcher::new(WatcherConfig::default());
        watcher
            .watch("Account", "name", |_, _, _, _| Ok(()), WatchOverrides::new())
            .unwrap();
        watcher
            .watch_collection(
                "Account",
                "roles",
                |changeset, _, _, _| {
                    black_box(changeset.additions()?.len());
                    Ok(())
                },
                WatchOverrides::new().trigger_when_no_changes(false),
            )
            .unwrap();

        let mut session = InMemorySession::new();
        session.register_schema(
            EntitySchema::builder::<Account>("Account")
                .field("name", Value::Null, |a| Value::from(a.name.clone()))
                .field("roles", Value::Null, |a| Value::from(a.roles.clone()))
                .build(),
        );
        session.subscribe(Arc::new(watcher));
        let id = session.persist(Account {
            name: "bench".to_string(),
            roles: vec!["ROLE_USER".to_string()],
        });
        session.flush().unwrap();

        let mut i = 0u64;
        b.iter(|| {
            i += 1;
            let account = session.get_mut::<Account>(id).unwrap();
            account.name = format!("bench-{i}");
            account.roles = vec!["ROLE_USER".to_string(), format!("ROLE_{}", i % 16)];
            session.flush().unwrap()
        });
    });
}

criterion_group!(benches, bench_diff, bench_flush);
criterion_main!(benches);
