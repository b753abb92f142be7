use proptest::prelude::*;
use std::sync::Arc;
use triage_index::{cosine_similarity, EmbeddingIndex, HashingEmbedder};
use triage_model::{Category, DocumentRecord};

const DIMS: usize = 4;

fn vector() -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-100.0f32..100.0, DIMS)
}

fn category() -> impl Strategy<Value = Category> {
    prop::sample::select(vec![Category::Database, Category::Network, Category::Security])
}

proptest! {
    #[test]
    fn prop_cosine_is_symmetric(a in vector(), b in vector()) {
        prop_assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn prop_cosine_is_bounded(a in vector(), b in vector()) {
        let s = cosine_similarity(&a, &b);
        prop_assert!((-1.0..=1.0).contains(&s));
    }

    #[test]
    fn prop_zero_vector_scores_zero(a in vector()) {
        prop_assert_eq!(cosine_similarity(&a, &[0.0; DIMS]), 0.0);
        prop_assert_eq!(cosine_similarity(&[0.0; DIMS], &a), 0.0);
    }

    #[test]
    fn prop_search_respects_top_k_order_and_filter(
        docs in proptest::collection::vec((vector(), category()), 0..20),
        query in vector(),
        top_k in 0..8usize,
        filter in proptest::option::of(category()),
    ) {
        let index = EmbeddingIndex::new(Arc::new(HashingEmbedder::new(DIMS)));
        for (i, (v, c)) in docs.into_iter().enumerate() {
            index
                .upsert_record(DocumentRecord::new(format!("doc-{i}.md"), "t", "", c, v))
                .unwrap();
        }

        let hits = index.search_vector(&query, top_k, filter);
        prop_assert!(hits.len() <= top_k);
        for pair in hits.windows(2) {
            prop_assert!(pair[0].similarity >= pair[1].similarity);
        }
        if let Some(c) = filter {
            prop_assert!(hits.iter().all(|h| h.document.category == c));
        }
    }
}

#[test]
fn test_top_one_returns_strongest_match() {
    let index = EmbeddingIndex::new(Arc::new(HashingEmbedder::new(2)));
    // cos = 0.9 and cos = 0.1 against [1, 0]
    let strong = vec![0.9, (1.0f32 - 0.81).sqrt()];
    let weak = vec![0.1, (1.0f32 - 0.01).sqrt()];
    index
        .upsert_record(DocumentRecord::new("weak.md", "weak", "", Category::General, weak))
        .unwrap();
    index
        .upsert_record(DocumentRecord::new("strong.md", "strong", "", Category::General, strong))
        .unwrap();

    let hits = index.search_vector(&[1.0, 0.0], 1, None);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].document.path, "strong.md");
    assert!((hits[0].similarity - 0.9).abs() < 1e-5);
}
