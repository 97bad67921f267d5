// Benchmark for job registry lookups and transitions
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use print_relay::print_job::{JobRegistry, StoredImage};
use print_relay::{JobId, JobState};
use std::path::PathBuf;

fn image() -> StoredImage {
    let job_id = JobId::new();
    StoredImage {
        job_id,
        path: PathBuf::from(format!("uploads/{}.jpg", job_id)),
        filename: "bench.jpg".to_string(),
        size: 1024,
    }
}

fn bench_registry_lifecycle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    c.bench_function("create + print + complete 1k jobs", |b| {
        b.iter(|| {
            rt.block_on(async {
                let registry = JobRegistry::new(10_000);
                for _ in 0..1000 {
                    let job = registry.create(image()).await.unwrap();
                    registry.transition(&job.id, JobState::Uploaded, JobState::Printing, None).await.unwrap();
                    registry.transition(&job.id, JobState::Printing, JobState::Completed, None).await.unwrap();
                }
                assert_eq!(registry.len().await, 1000);
            });
        });
    });
}

fn bench_status_lookup(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let registry = JobRegistry::new(10_000);
    let ids: Vec<JobId> = rt.block_on(async {
        let mut ids = Vec::new();
        for _ in 0..5000 {
            ids.push(registry.create(image()).await.unwrap().id);
        }
        ids
    });
    c.bench_function("status lookup across 5k jobs", |b| {
        b.iter(|| {
            rt.block_on(async {
                for id in ids.iter().step_by(50) {
                    registry.get(id).await.unwrap();
                }
            });
        });
    });
}

criterion_group!(benches, bench_registry_lifecycle, bench_status_lookup);
criterion_main!(benches);
