//! Resolver and store benchmarks
//!
//! Resolution is linear in the number of statements; these benches track
//! the per-operation cost as the policy set grows.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keyward_authz::{
    ChannelManifestSource, Effect, ManifestEntry, Operation, Policy, PolicyStore, Resolver,
    Statement, UserInfo,
};
use serde_json::json;
use std::sync::Arc;
use tokio::runtime::Runtime;

fn create_test_policies(count: usize) -> Vec<Policy> {
    (0..count)
        .map(|i| {
            let effect = if i % 5 == 0 { Effect::Deny } else { Effect::Allow };
            Policy::new(
                format!("policy-{}", i),
                vec![
                    Statement::new(
                        "kv",
                        effect,
                        [format!("secret.read.{}*", i % 10)],
                        [format!("/kv/team-{}/*", i % 100)],
                    )
                    .unwrap(),
                    Statement::new("list", Effect::Allow, ["secret.list"], ["*"]).unwrap(),
                ],
            )
        })
        .collect()
}

fn bench_is_authorized(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_authorized");

    for policy_count in [10, 100, 1000] {
        let resolver = Resolver::new(create_test_policies(policy_count));
        let ops = [
            Operation::new("secret.read.3", "/kv/team-3/db-password"),
            Operation::new("secret.list", "/kv/team-3"),
        ];

        group.bench_with_input(
            BenchmarkId::new("policies", policy_count),
            &ops,
            |b, ops| b.iter(|| black_box(resolver.is_authorized(black_box(ops)))),
        );
    }

    group.finish();
}

fn bench_user_policies(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let (store, user) = rt.block_on(async {
        let source = Arc::new(ChannelManifestSource::new());
        let store = PolicyStore::new(source.clone());
        store.start().await.unwrap();

        for policy in create_test_policies(100) {
            let entry = ManifestEntry::new(
                "Policy",
                policy.name.clone(),
                json!({ "statements": policy.statements }),
            );
            source.load(entry).await.unwrap();
        }

        let mut user = UserInfo::new("bench");
        for g in 0..10 {
            let policies: Vec<String> = (0..10).map(|p| format!("policy-{}", g * 10 + p)).collect();
            let name = format!("group-{}", g);
            source
                .load(ManifestEntry::new("Group", name.clone(), json!({ "policies": policies })))
                .await
                .unwrap();
            user = user.with_group(name);
        }

        (store, user)
    });

    c.bench_function("user_policies_resolver", |b| {
        b.to_async(&rt).iter(|| async {
            let resolver = store.resolver_for(Some(&user)).await;
            black_box(resolver.is_authorized(&[Operation::new("secret.list", "/kv/x")]))
        })
    });
}

criterion_group!(benches, bench_is_authorized, bench_user_policies);
criterion_main!(benches);
