use crate::support::{collection, credentials, nodes, ScriptedGenerator};
use collection_scribe::generation::{GenerationKind, GenerationTask};
use collection_scribe::store::memory::StoreCall;
use collection_scribe::store::MemoryStore;
use collection_scribe::sync::SyncConfig;
use collection_scribe::tree::{locate, Node, RequestNode, TEST_EVENT};
use collection_scribe::workflows::{CollectionService, PersistPath};
use serde_json::json;
use std::sync::Arc;

fn seeded_store(store: MemoryStore) -> MemoryStore {
    let item = nodes(json!([
        {
            "id": "fld-orders",
            "name": "Orders",
            "item": [
                {
                    "id": "req-get-order",
                    "name": "Get order",
                    "protocolProfileBehavior": { "disableBodyPruning": true },
                    "event": [
                        { "listen": "prerequest", "script": { "type": "text/javascript", "exec": ["pm.variables.set('id', 1);"] } },
                        { "listen": "test", "script": { "type": "text/javascript", "exec": ["OLD"] } }
                    ],
                    "request": {
                        "method": "GET",
                        "url": { "raw": "{{baseUrl}}/orders/:id", "host": ["{{baseUrl}}"], "path": ["orders", ":id"] },
                        "header": [{ "key": "Accept", "value": "application/json" }]
                    }
                }
            ]
        }
    ]));
    store.with_collection("shop", collection("shop", "Shop", item))
}

fn service(store: &Arc<MemoryStore>, generator: &Arc<ScriptedGenerator>) -> CollectionService {
    CollectionService::new(store.clone(), generator.clone(), SyncConfig::default())
}

fn stored_request(store: &MemoryStore) -> RequestNode {
    let tree = store.collection("shop").unwrap();
    match locate(&tree.item, "req-get-order") {
        Some(Node::Request(request)) => request.clone(),
        other => panic!("request missing: {:?}", other),
    }
}

#[tokio::test]
async fn new_script_is_placed_before_existing_ones() {
    let store = Arc::new(seeded_store(MemoryStore::new()));
    let generator = Arc::new(ScriptedGenerator::new().reply(GenerationKind::TestScript, "NEW"));
    let before = stored_request(&store);

    service(&store, &generator)
        .generate_test_script(&credentials(), "shop", "req-get-order")
        .await
        .unwrap();

    let after = stored_request(&store);
    let exec = &after.event(TEST_EVENT).unwrap().script.exec;
    assert_eq!(exec.len(), 2);
    assert!(exec[0].starts_with("// AI-Generated Test ("));
    assert!(exec[0].ends_with(" UTC)\nNEW\n"));
    assert_eq!(exec[1], "OLD");

    assert_eq!(after.request, before.request);
    assert_eq!(after.extra, before.extra);
    assert_eq!(after.event("prerequest"), before.event("prerequest"));
}

#[tokio::test]
async fn repeated_injection_keeps_the_most_recent_first() {
    let store = Arc::new(seeded_store(MemoryStore::new()));
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply(GenerationKind::TestScript, "pm.test('first')")
            .reply(GenerationKind::TestScript, "pm.test('second')"),
    );
    let service = service(&store, &generator);

    for _ in 0..2 {
        service
            .generate_test_script(&credentials(), "shop", "req-get-order")
            .await
            .unwrap();
    }

    let exec = stored_request(&store).event(TEST_EVENT).unwrap().script.exec.clone();
    assert_eq!(exec.len(), 3);
    assert!(exec[0].contains("pm.test('second')"));
    assert!(exec[1].contains("pm.test('first')"));
    assert_eq!(exec[2], "OLD");
}

#[tokio::test]
async fn generator_sees_the_request_being_tested() {
    let store = Arc::new(seeded_store(MemoryStore::new()));
    let generator = Arc::new(ScriptedGenerator::new().reply(GenerationKind::TestScript, "pm.test()"));

    service(&store, &generator)
        .generate_test_script(&credentials(), "shop", "req-get-order")
        .await
        .unwrap();

    let tasks = generator.tasks.lock();
    match &tasks[0] {
        GenerationTask::TestScript { name, request } => {
            assert_eq!(name, "Get order");
            assert_eq!(request["request"]["method"], "GET");
            assert_eq!(request["request"]["url"]["raw"], "{{baseUrl}}/orders/:id");
        }
        other => panic!("unexpected task {:?}", other),
    }
}

#[tokio::test]
async fn stores_without_request_update_get_the_whole_collection() {
    let store = Arc::new(seeded_store(MemoryStore::new().without_request_update()));
    let generator = Arc::new(ScriptedGenerator::new().reply(GenerationKind::TestScript, "NEW"));

    let outcome = service(&store, &generator)
        .generate_test_script(&credentials(), "shop", "req-get-order")
        .await
        .unwrap();

    assert_eq!(outcome.persisted_via, PersistPath::CollectionReplace);
    assert_eq!(
        store.calls(),
        vec![StoreCall::ReplaceCollection {
            collection: "shop".to_string()
        }]
    );
    let exec = stored_request(&store).event(TEST_EVENT).unwrap().script.exec.clone();
    assert!(exec[0].contains("NEW"));
    assert_eq!(exec[1], "OLD");

    let tree = store.collection("shop").unwrap();
    assert_eq!(tree.item[0].name(), "Orders");
    assert_eq!(tree.info.name, "Shop");
}

#[tokio::test]
async fn unknown_request_is_not_found() {
    let store = Arc::new(seeded_store(MemoryStore::new()));
    let generator = Arc::new(ScriptedGenerator::new());

    let err = service(&store, &generator)
        .generate_test_script(&credentials(), "shop", "req-missing")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(generator.calls(), 0);
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let generator = Arc::new(ScriptedGenerator::new());

    let err = service(&store, &generator)
        .generate_test_script(&credentials(), "nope", "req-1")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn request_without_url_is_not_found() {
    let item = nodes(json!([{ "id": "req-bare", "name": "Bare", "request": { "method": "GET" } }]));
    let store = Arc::new(MemoryStore::new().with_collection("bare", collection("bare", "Bare", item)));
    let generator = Arc::new(ScriptedGenerator::new().reply(GenerationKind::TestScript, "NEW"));

    let err = service(&store, &generator)
        .generate_test_script(&credentials(), "bare", "req-bare")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Not found: Request not found in collection");
    assert_eq!(generator.calls(), 0);
    assert!(store.calls().is_empty());
}
