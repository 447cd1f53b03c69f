use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gcouple::coupling::{analyze, WindowLength};
use gcouple::model::FileCommitEvent;

fn synthetic_stream(repo_index: usize, days: i64, files_per_day: usize) -> Vec<FileCommitEvent> {
    let start = Utc.with_ymd_and_hms(2020, 1, 1, 9, 0, 0).unwrap();
    (0..days)
        .flat_map(|d| {
            (0..files_per_day).map(move |f| FileCommitEvent {
                repo_index,
                path: format!("src/module_{}/file_{}.rs", f % 5, (d as usize + f) % 40),
                lines_added: (f as u64 % 7) + 1,
                lines_deleted: f as u64 % 3,
                cloc: 100,
                commit_id: format!("{repo_index}{d:06}"),
                author: "bench".to_string(),
                timestamp: start + Duration::days(d) + Duration::minutes(f as i64),
            })
        })
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let window = WindowLength::days(7).unwrap_or_else(|e| panic!("{e}"));
    let streams: Vec<_> = (0..2).map(|r| synthetic_stream(r, 365, 4)).collect();

    c.bench_function("analyze 2 repos x 1 year", |b| {
        b.iter(|| analyze(black_box(streams.clone()), window))
    });
}

criterion_group!(benches, bench_analyze);
criterion_main!(benches);
