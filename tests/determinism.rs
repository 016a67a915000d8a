use wayfarer::{
    Catalog, Exporter, PairConfig, QuantizedExporter, TagVocabulary, TrainConfig, Trainer,
    TwoTowerTrainer, sample_pairs,
};

const CATALOG: &str = r#"[
    {"id": 1, "name": "Manali", "tags": ["mountains", "trekking"]},
    {"id": 2, "name": "Goa", "tags": ["beach", "nightlife"]},
    {"id": 3, "name": "Jaipur", "tags": ["forts", "culture"]},
    {"id": 4, "name": "Leh", "tags": ["mountains", "monasteries"]},
    {"id": 5, "name": "Munnar", "tags": ["tea", "hills"]}
]"#;

fn fixture() -> (Catalog, TagVocabulary) {
    let catalog = Catalog::from_json(CATALOG).unwrap();
    let vocab = TagVocabulary::from_catalog(&catalog).unwrap();
    (catalog, vocab)
}

fn train_config() -> TrainConfig {
    TrainConfig::new().with_embedding_dim(8).with_epochs(3)
}

#[test]
fn same_seed_yields_identical_pairs() {
    let (catalog, vocab) = fixture();
    let cfg = PairConfig::new().with_iterations(200).with_seed(99);
    let a = sample_pairs(&catalog, &vocab, &cfg).unwrap();
    let b = sample_pairs(&catalog, &vocab, &cfg).unwrap();
    assert_eq!(a, b);

    let c = sample_pairs(&catalog, &vocab, &cfg.clone().with_seed(100)).unwrap();
    assert_ne!(a, c);
}

#[test]
fn same_seeds_yield_identical_artifact_bytes() {
    let (catalog, vocab) = fixture();
    let pair_cfg = PairConfig::new().with_iterations(200).with_seed(7);

    let export = || {
        let set = sample_pairs(&catalog, &vocab, &pair_cfg).unwrap();
        let outcome = TwoTowerTrainer::new(train_config()).train(&set).unwrap();
        QuantizedExporter::default()
            .export(&outcome.model, &vocab)
            .unwrap()
    };
    assert_eq!(export(), export());
}

#[test]
fn vocabulary_order_is_independent_of_catalog_order() {
    let (catalog, vocab) = fixture();
    let mut reversed: Vec<_> = catalog.destinations().to_vec();
    reversed.reverse();
    let reversed = Catalog::from_destinations(reversed).unwrap();
    assert_eq!(TagVocabulary::from_catalog(&reversed).unwrap(), vocab);
}
