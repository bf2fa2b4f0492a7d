mod helpers;

use std::sync::Arc;

use openregister::config::OpenRegisterConfig;
use openregister::register::files::NewFile;
use openregister::register::objects::NewObject;
use openregister::register::RegisterStore;
use openregister::vectorization::strategy::{ProcessingMode, VectorizeOptions};
use openregister::vectorization::{StrategyRegistry, VectorizationService};
use openregister::vectors::types::{HybridWeights, SearchFilters};
use openregister::vectors::VectorEmbeddings;
use serde_json::json;

struct Pipeline {
    store: Arc<RegisterStore>,
    embeddings: Arc<VectorEmbeddings>,
    service: VectorizationService,
}

fn pipeline() -> Pipeline {
    let mut config: OpenRegisterConfig = helpers::test_config();
    config.files.chunk_size = 200;
    config.files.chunk_overlap = 20;
    config.files.min_chunk_size = 10;

    let db = helpers::test_db();
    let settings = Arc::new(config.clone());
    let store = Arc::new(RegisterStore::new(db.clone()));
    let embeddings = helpers::facade(db, config);
    let service = VectorizationService::new(
        StrategyRegistry::with_register(store.clone(), settings),
        embeddings.clone(),
    );
    Pipeline {
        store,
        embeddings,
        service,
    }
}

fn seed(store: &RegisterStore) {
    let objects = [
        json!({
            "uuid": "a1",
            "register": "gemeente",
            "schema": "organisatie",
            "name": "Gemeente Amsterdam",
            "object": {"naam": "Gemeente Amsterdam", "stad": "Amsterdam", "inwoners": 921402}
        }),
        json!({
            "uuid": "a2",
            "register": "gemeente",
            "schema": "organisatie",
            "name": "Gemeente Utrecht",
            "object": {"naam": "Gemeente Utrecht", "stad": "Utrecht"}
        }),
        json!({
            "naam": "Parkeervergunning",
            "omschrijving": "Aanvragen van een parkeervergunning in Amsterdam",
            "@self": {"id": "p1", "register": "producten", "schema": "product"}
        }),
    ];
    for value in &objects {
        let object = NewObject::from_value(value).unwrap();
        store.insert_object(&object).unwrap().unwrap();
    }

    let text: String = (1..=12)
        .map(|i| format!("Besluit {i}: de gemeenteraad stemt in met onderdeel {i} van de begroting. "))
        .collect();
    store
        .upsert_file(&NewFile {
            path: "/docs/raadsbesluit.txt".into(),
            name: "raadsbesluit.txt".into(),
            mime_type: Some("text/plain".into()),
            size: 4096,
            text: Some(text),
        })
        .unwrap();
    store
        .upsert_file(&NewFile {
            path: "/docs/scan.pdf".into(),
            name: "scan.pdf".into(),
            mime_type: Some("application/pdf".into()),
            size: 1024,
            text: None,
        })
        .unwrap();
}

#[tokio::test]
async fn objects_and_files_become_searchable() {
    let p = pipeline();
    seed(&p.store);

    let objects = p
        .service
        .vectorize_batch("object", &VectorizeOptions::default())
        .await
        .unwrap();
    assert_eq!(objects.total_entities, 3);
    assert_eq!(objects.total_items, 3);
    assert_eq!(objects.vectorized, 3);

    let files = p
        .service
        .vectorize_batch(
            "file",
            &VectorizeOptions {
                mode: ProcessingMode::Parallel,
                batch_size: 2,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    // the pdf has no extracted text
    assert_eq!(files.total_entities, 1);
    assert!(files.total_items > 1);
    assert_eq!(files.vectorized, files.total_items);

    let stats = p.embeddings.get_stats().await.unwrap();
    assert_eq!(stats.backend, "local");
    assert_eq!(stats.total_vectors as usize, 3 + files.total_items);
    assert_eq!(stats.by_entity_type["object"], 3);
    assert_eq!(stats.by_model["nomic-embed-text"], stats.total_vectors);

    let report = p.embeddings.check_embedding_model_mismatch();
    assert!(report.has_vectors);
    assert!(!report.mismatch);
}

#[tokio::test]
async fn exact_chunk_text_is_the_top_hit() {
    let p = pipeline();
    seed(&p.store);
    p.service
        .vectorize_batch("file", &VectorizeOptions::default())
        .await
        .unwrap();

    let filters = SearchFilters {
        entity_type: Some("file".into()),
        ..Default::default()
    };
    let hits = p
        .embeddings
        .semantic_search("begroting", 10, &filters, None)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.entity_type == "file"));
    assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));

    let target = hits.last().unwrap().clone();
    let text = target.chunk_text.clone().unwrap();
    let again = p
        .embeddings
        .semantic_search(&text, 1, &filters, None)
        .await
        .unwrap();
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].chunk_index, target.chunk_index);
    assert!((again[0].similarity - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn hybrid_search_blends_keyword_matches() {
    let p = pipeline();
    seed(&p.store);
    p.service
        .vectorize_batch("object", &VectorizeOptions::default())
        .await
        .unwrap();

    let keyword_hits = p.store.keyword_search("Amsterdam", 10).unwrap();
    assert_eq!(keyword_hits.len(), 2);

    let result = p
        .embeddings
        .hybrid_search("Amsterdam", &keyword_hits, 5, HybridWeights::default(), None)
        .await
        .unwrap();

    assert_eq!(result.total, result.results.len());
    assert!(result.total <= 5);
    let breakdown = &result.source_breakdown;
    assert_eq!(
        breakdown.vector_only + breakdown.keyword_only + breakdown.both,
        result.total
    );
    // every object has a vector, so keyword matches are also vector matches
    assert_eq!(breakdown.keyword_only, 0);
    assert_eq!(breakdown.both, 2);
    assert!(result
        .results
        .windows(2)
        .all(|w| w[0].combined_score >= w[1].combined_score));
    for hit in result.results.iter().filter(|h| h.keyword_score.is_some()) {
        assert!(hit.combined_score > 0.0);
    }
}

#[tokio::test]
async fn view_restricts_object_vectorization() {
    let p = pipeline();
    seed(&p.store);
    p.store
        .upsert_view("producten-view", "Producten", Some("producten"), None)
        .unwrap();

    let result = p
        .service
        .vectorize_batch(
            "object",
            &VectorizeOptions {
                views: vec!["producten-view".into()],
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.total_entities, 1);
    assert_eq!(result.vectorized, 1);
}

#[tokio::test]
async fn offset_pages_through_objects_without_duplicates() {
    let p = pipeline();
    seed(&p.store);
    let page = |offset| VectorizeOptions {
        limit: 2,
        offset,
        ..Default::default()
    };

    let first = p.service.vectorize_batch("object", &page(0)).await.unwrap();
    let second = p.service.vectorize_batch("object", &page(2)).await.unwrap();
    assert_eq!(first.total_entities, 2);
    assert_eq!(second.total_entities, 1);
    assert_eq!(p.embeddings.get_stats().await.unwrap().total_vectors, 3);

    // vectorizing the same page again replaces its rows
    let rerun = p.service.vectorize_batch("object", &page(0)).await.unwrap();
    assert_eq!(rerun.vectorized, 2);
    let stats = p.embeddings.get_stats().await.unwrap();
    assert_eq!(stats.total_vectors, 3);
    assert_eq!(stats.by_entity_type["object"], 3);
}
