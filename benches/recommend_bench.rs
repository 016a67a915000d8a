use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use wayfarer::{
    Catalog, CosineScorer, PairConfig, RecommendConfig, TagVocabulary, TrainConfig, Trainer,
    TwoTowerTrainer, recommend, sample_pairs,
};

const CATALOG: &str = include_str!("../scripts/destinations.json");

fn fixture() -> (Catalog, TagVocabulary) {
    let catalog = Catalog::from_json(CATALOG).expect("shipped catalog parses");
    let vocab = TagVocabulary::from_catalog(&catalog).expect("shipped catalog has tags");
    (catalog, vocab)
}

fn sampling_bench(c: &mut Criterion) {
    let (catalog, vocab) = fixture();
    let cfg = PairConfig::default();
    c.bench_function("sample_pairs_10k_iterations", |b| {
        b.iter(|| {
            let set = sample_pairs(&catalog, &vocab, black_box(&cfg)).expect("sampling");
            black_box(set);
        });
    });
}

fn ranking_bench(c: &mut Criterion) {
    let (catalog, vocab) = fixture();
    let query = vocab.encode(["trekking", "mountains"]);
    let set = sample_pairs(&catalog, &vocab, &PairConfig::new().with_iterations(500))
        .expect("sampling");
    let model = TwoTowerTrainer::new(TrainConfig::new().with_epochs(2))
        .train(&set)
        .expect("training")
        .model;

    let sequential = RecommendConfig::default();
    let parallel = RecommendConfig::default().with_parallel(true);

    c.bench_function("recommend_top3_cosine", |b| {
        b.iter(|| {
            let recs = recommend(&CosineScorer, &catalog, &vocab, black_box(&query), &sequential)
                .expect("ranking");
            black_box(recs);
        });
    });
    c.bench_function("recommend_top3_two_tower", |b| {
        b.iter(|| {
            let recs = recommend(&model, &catalog, &vocab, black_box(&query), &sequential)
                .expect("ranking");
            black_box(recs);
        });
    });
    c.bench_function("recommend_top3_two_tower_parallel", |b| {
        b.iter(|| {
            let recs = recommend(&model, &catalog, &vocab, black_box(&query), &parallel)
                .expect("ranking");
            black_box(recs);
        });
    });
}

criterion_group!(benches, sampling_bench, ranking_bench);
criterion_main!(benches);
