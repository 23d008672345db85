use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rave::domain::models::{
    Checklist, ExtractedNugget, KnowledgeBase, KnowledgeNugget, MissingScorePolicy, NuggetUpdate,
    ScoreAssignment,
};
use rave::services::merge;

fn knowledge_base(size: usize) -> KnowledgeBase {
    KnowledgeBase::from(
        (0..size)
            .map(|i| {
                KnowledgeNugget::new(
                    format!("n{i}"),
                    format!("Fact number {i} about the question"),
                    format!("https://source.example/{i}"),
                    0.7,
                )
            })
            .collect::<Vec<_>>(),
    )
}

/// Half new nuggets, half updates to existing ones.
fn extraction(existing: usize, count: usize) -> Vec<ExtractedNugget> {
    (0..count)
        .map(|i| {
            if i % 2 == 0 {
                ExtractedNugget::New(KnowledgeNugget::new(
                    format!("new{i}"),
                    format!("New fact {i}"),
                    "https://new.example",
                    0.8,
                ))
            } else {
                ExtractedNugget::Update(
                    NuggetUpdate::new(format!("n{}", i % existing.max(1)))
                        .confidence(0.9)
                        .conflicts_with([format!("new{}", i - 1)]),
                )
            }
        })
        .collect()
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("knowledge_merge");
    for size in [10usize, 100, 1_000] {
        let kb = knowledge_base(size);
        let units = extraction(size, 20);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| merge(black_box(&kb), black_box(&units)))
        });
    }
    group.finish();

    let kb = knowledge_base(1_000);
    let empty: Vec<ExtractedNugget> = Vec::new();
    c.bench_function("knowledge_merge_empty_batch", |b| {
        b.iter(|| merge(black_box(&kb), black_box(&empty)))
    });
}

fn bench_rescore(c: &mut Criterion) {
    let checklist = Checklist::from_requirements((0..50).map(|i| format!("Requirement {i}")));
    let by_id: Vec<_> = checklist
        .iter()
        .map(|item| ScoreAssignment::for_id(item.id.clone(), 0.5))
        .collect();
    let by_text: Vec<_> = checklist
        .iter()
        .map(|item| ScoreAssignment::for_requirement(item.requirement.to_uppercase(), 0.5))
        .collect();

    c.bench_function("checklist_rescore_by_id", |b| {
        b.iter(|| checklist.rescored(black_box(&by_id), MissingScorePolicy::Retain))
    });
    c.bench_function("checklist_rescore_by_text", |b| {
        b.iter(|| checklist.rescored(black_box(&by_text), MissingScorePolicy::Retain))
    });
}

criterion_group!(benches, bench_merge, bench_rescore);
criterion_main!(benches);
