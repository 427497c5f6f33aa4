use crate::support::{
    collection, credentials, destination, nodes, sync_config, users_tree, LostResponseStore,
    ScriptedGenerator,
};
use collection_scribe::error::ApiError;
use collection_scribe::generation::GenerationKind;
use collection_scribe::store::memory::StoreCall;
use collection_scribe::store::MemoryStore;
use collection_scribe::sync::{SyncConfig, TreeSynchronizer};
use collection_scribe::tree::{Node, NodeKind, RequestUrl};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn synchronizer(
    store: &Arc<MemoryStore>,
    generator: &Arc<ScriptedGenerator>,
    config: &SyncConfig,
) -> TreeSynchronizer {
    TreeSynchronizer::new(store.clone(), generator.clone(), credentials(), config)
}

fn created_request_names(store: &MemoryStore) -> Vec<String> {
    store
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            StoreCall::CreateRequest { name, .. } => Some(name),
            _ => None,
        })
        .collect()
}

fn delete_requests(names: &[&str]) -> Vec<Node> {
    nodes(json!(names
        .iter()
        .map(|name| json!({
            "name": name,
            "request": { "method": "DELETE", "url": format!("https://api.test/{}", name) }
        }))
        .collect::<Vec<_>>()))
}

#[tokio::test]
async fn users_folder_is_replicated_with_generated_examples() {
    let store = Arc::new(MemoryStore::new());
    let collection = destination(&store).await;
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply(
                GenerationKind::ExampleBody,
                "```json\n{\"name\": \"Jane Doe\", \"email\": \"jane@example.com\"}\n```",
            )
            .reply(
                GenerationKind::ExampleQueryParams,
                r#"[{"key": "page", "value": "2"}, {"key": "limit", "value": 25}]"#,
            ),
    );

    let report = synchronizer(&store, &generator, &sync_config())
        .synchronize(&users_tree(), &collection, None)
        .await
        .unwrap();

    assert_eq!(report.folders_created, 1);
    assert_eq!(report.requests_created, 2);
    assert!(report.skipped.is_empty());

    let calls = store.calls();
    let folder_id = match &calls[1] {
        StoreCall::CreateFolder { name, parent, id, .. } => {
            assert_eq!(name, "Users");
            assert_eq!(*parent, None);
            id.clone()
        }
        other => panic!("expected the folder first, got {:?}", other),
    };
    for call in &calls[2..] {
        match call {
            StoreCall::CreateRequest { parent, .. } => {
                assert_eq!(parent.as_deref(), Some(folder_id.as_str()))
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    let tree = store.collection(&collection).unwrap();
    let users = tree.item[0].as_folder().unwrap();
    assert_eq!(users.children.len(), 2);

    let list = users.children[0].as_request().unwrap();
    match list.request.url.as_ref().unwrap() {
        RequestUrl::Structured(parts) => {
            let query = parts.query.as_ref().unwrap();
            assert_eq!(query.len(), 2);
            assert_eq!(query[0].key.as_deref(), Some("page"));
            assert_eq!(query[1].value.as_deref(), Some("25"));
            assert_eq!(parts.raw.as_deref(), Some("{{baseUrl}}/users"));
        }
        other => panic!("url was not normalized: {:?}", other),
    }

    let create = users.children[1].as_request().unwrap();
    let body = create.request.body.as_ref().unwrap();
    let sent: serde_json::Value = serde_json::from_str(body.raw.as_deref().unwrap()).unwrap();
    assert_eq!(sent, json!({ "name": "Jane Doe", "email": "jane@example.com" }));
    assert_eq!(body.options, Some(json!({ "raw": { "language": "json" } })));
    assert_ne!(create.id.as_deref(), Some("src-create"));

    let tasks = generator.tasks.lock();
    assert!(tasks.iter().any(|task| matches!(
        task,
        collection_scribe::generation::GenerationTask::ExampleBody { path, original_body: Some(_), .. }
            if path == "users"
    )));
}

#[tokio::test]
async fn unparsable_query_params_leave_the_request_unchanged() {
    let store = Arc::new(MemoryStore::new());
    let collection = destination(&store).await;
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply(GenerationKind::ExampleQueryParams, "Sorry, I can't think of any."),
    );
    let source = nodes(json!([
        { "name": "Search", "request": { "method": "GET", "url": "https://api.test/search" } }
    ]));

    let report = synchronizer(&store, &generator, &sync_config())
        .synchronize(&source, &collection, None)
        .await
        .unwrap();
    assert_eq!(report.requests_created, 1);

    let tree = store.collection(&collection).unwrap();
    let search = tree.item[0].as_request().unwrap();
    match search.request.url.as_ref().unwrap() {
        RequestUrl::Structured(parts) => {
            assert_eq!(parts.query, None);
            assert_eq!(parts.raw.as_deref(), Some("https://api.test/search"));
        }
        other => panic!("url was not normalized: {:?}", other),
    }
}

#[tokio::test]
async fn requests_without_url_make_no_remote_calls() {
    let store = Arc::new(MemoryStore::new());
    let collection = destination(&store).await;
    let generator = Arc::new(ScriptedGenerator::new());
    let source = nodes(json!([
        { "name": "Draft", "request": { "method": "POST" } },
        { "name": "Blank", "request": { "method": "GET", "url": "" } },
        { "name": "Hostless", "request": { "method": "GET", "url": { "query": [] } } }
    ]));
    let before = store.calls().len();

    let report = synchronizer(&store, &generator, &sync_config())
        .synchronize(&source, &collection, None)
        .await
        .unwrap();

    assert_eq!(report.skipped, vec!["Draft", "Blank", "Hostless"]);
    assert_eq!(report.requests_created, 0);
    assert_eq!(store.calls().len(), before);
    assert_eq!(generator.calls(), 0);
}

#[tokio::test]
async fn empty_folders_are_still_created() {
    let store = Arc::new(MemoryStore::new());
    let collection = destination(&store).await;
    let generator = Arc::new(ScriptedGenerator::new());
    let source = nodes(json!([{ "name": "Placeholder", "item": [] }]));

    let report = synchronizer(&store, &generator, &sync_config())
        .synchronize(&source, &collection, None)
        .await
        .unwrap();
    assert_eq!(report.folders_created, 1);
    assert_eq!(report.created[0].kind, NodeKind::Folder);
}

#[tokio::test(start_paused = true)]
async fn children_are_never_created_before_their_folder() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(3)));
    let collection = destination(&store).await;
    let generator = Arc::new(ScriptedGenerator::new().reply(GenerationKind::ExampleBody, "{}"));
    let source = nodes(json!([
        {
            "name": "A",
            "item": [
                { "name": "A1", "request": { "method": "DELETE", "url": "https://x/a1" } },
                {
                    "name": "B",
                    "item": [
                        { "name": "B1", "request": { "method": "POST", "url": "https://x/b1" } },
                        { "name": "C", "item": [
                            { "name": "C1", "request": { "method": "PUT", "url": "https://x/c1" } }
                        ] }
                    ]
                }
            ]
        },
        { "name": "Root", "request": { "method": "HEAD", "url": "https://x/root" } }
    ]));
    let config = SyncConfig {
        preserve_sibling_order: false,
        ..sync_config()
    };

    synchronizer(&store, &generator, &config)
        .synchronize(&source, &collection, None)
        .await
        .unwrap();

    let calls = store.calls();
    let folder_position = |folder_id: &str| {
        calls.iter().position(|call| {
            matches!(call, StoreCall::CreateFolder { id, .. } if id == folder_id)
        })
    };
    let mut checked = 0;
    for (index, call) in calls.iter().enumerate() {
        let parent = match call {
            StoreCall::CreateFolder { parent, .. } | StoreCall::CreateRequest { parent, .. } => parent,
            _ => continue,
        };
        if let Some(parent) = parent {
            let created_at = folder_position(parent.as_str()).expect("parent folder was created");
            assert!(created_at < index, "{:?} created before its parent", call);
            checked += 1;
        }
    }
    assert_eq!(checked, 5);
}

#[tokio::test(start_paused = true)]
async fn sibling_creation_follows_source_order() {
    let store = Arc::new(MemoryStore::new());
    let collection = destination(&store).await;
    let generator = Arc::new(
        ScriptedGenerator::new()
            .reply(GenerationKind::ExampleBody, "{\"ok\": true}")
            .reply(GenerationKind::ExampleQueryParams, "[]")
            .delay(GenerationKind::ExampleBody, Duration::from_millis(40)),
    );
    let source = nodes(json!([
        { "name": "1 create", "request": { "method": "POST", "url": "https://x/1" } },
        { "name": "2 list", "request": { "method": "GET", "url": "https://x/2" } },
        { "name": "3 remove", "request": { "method": "DELETE", "url": "https://x/3" } },
        { "name": "4 folder", "item": [] },
        { "name": "5 patch", "request": { "method": "PATCH", "url": "https://x/5" } },
        { "name": "6 head", "request": { "method": "HEAD", "url": "https://x/6" } }
    ]));

    synchronizer(&store, &generator, &sync_config())
        .synchronize(&source, &collection, None)
        .await
        .unwrap();

    assert_eq!(
        created_request_names(&store),
        vec!["1 create", "2 list", "3 remove", "5 patch", "6 head"]
    );
    let tree = store.collection(&collection).unwrap();
    let names: Vec<&str> = tree.item.iter().map(Node::name).collect();
    assert_eq!(
        names,
        vec!["1 create", "2 list", "3 remove", "4 folder", "5 patch", "6 head"]
    );
}

#[tokio::test]
async fn store_failure_aborts_with_the_created_ledger() {
    let store = Arc::new(MemoryStore::new().fail_request_named("Broken"));
    let collection = destination(&store).await;
    let generator = Arc::new(ScriptedGenerator::new());
    let source = nodes(json!([
        { "name": "Accounts", "item": [
            { "name": "Close", "request": { "method": "DELETE", "url": "https://x/close" } }
        ] },
        { "name": "Broken", "request": { "method": "DELETE", "url": "https://x/broken" } }
    ]));

    let err = synchronizer(&store, &generator, &sync_config())
        .synchronize(&source, &collection, None)
        .await
        .unwrap_err();

    match err {
        ApiError::SyncAborted { source, created } => {
            assert!(matches!(*source, ApiError::RemoteError(_)));
            assert_eq!(created[0].name, "Accounts");
            assert_eq!(created[0].kind, NodeKind::Folder);
            assert!(created.iter().all(|node| node.name != "Broken"));
            assert!(created
                .iter()
                .skip(1)
                .all(|node| node.name == "Close" && node.parent.as_deref() == Some(created[0].id.as_str())));
        }
        other => panic!("expected SyncAborted, got {:?}", other),
    }
}

#[tokio::test]
async fn generator_failure_aborts_the_synchronization() {
    let store = Arc::new(MemoryStore::new());
    let collection = destination(&store).await;
    let generator = Arc::new(ScriptedGenerator::new().fail(GenerationKind::ExampleBody));
    let source = nodes(json!([
        { "name": "Create", "request": { "method": "POST", "url": "https://x/create" } }
    ]));

    let err = synchronizer(&store, &generator, &sync_config())
        .synchronize(&source, &collection, None)
        .await
        .unwrap_err();
    match err {
        ApiError::SyncAborted { source, created } => {
            assert!(matches!(*source, ApiError::GenerationError(_)));
            assert!(created.is_empty());
        }
        other => panic!("expected SyncAborted, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn throttled_calls_are_retried() {
    let store = Arc::new(
        MemoryStore::new()
            .with_collection("dest", collection("dest", "Destination", Vec::new()))
            .throttle_next(2),
    );
    let collection = "dest".to_string();
    let generator = Arc::new(ScriptedGenerator::new());
    let config = SyncConfig {
        max_retry_attempts: 3,
        ..sync_config()
    };

    let report = synchronizer(&store, &generator, &config)
        .synchronize(&delete_requests(&["Purge"]), &collection, None)
        .await
        .unwrap();
    assert_eq!(report.requests_created, 1);
    assert_eq!(created_request_names(&store), vec!["Purge"]);
}

#[tokio::test(start_paused = true)]
async fn retries_stop_at_the_configured_limit() {
    let store = Arc::new(
        MemoryStore::new()
            .with_collection("dest", collection("dest", "Destination", Vec::new()))
            .throttle_next(10),
    );
    let collection = "dest".to_string();
    let generator = Arc::new(ScriptedGenerator::new());
    let config = SyncConfig {
        max_retry_attempts: 2,
        ..sync_config()
    };

    let err = synchronizer(&store, &generator, &config)
        .synchronize(&delete_requests(&["Purge"]), &collection, None)
        .await
        .unwrap_err();
    match err {
        ApiError::SyncAborted { source, .. } => {
            assert!(matches!(*source, ApiError::RemoteRateLimit(_)))
        }
        other => panic!("expected SyncAborted, got {:?}", other),
    }
    assert!(created_request_names(&store).is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_stay_within_the_cap() {
    let store = Arc::new(MemoryStore::new().with_latency(Duration::from_millis(10)));
    let collection = destination(&store).await;
    let generator = Arc::new(ScriptedGenerator::new());
    let names: Vec<String> = (0..12).map(|i| format!("r{}", i)).collect();
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let config = SyncConfig {
        max_concurrent_calls: 3,
        preserve_sibling_order: false,
        ..sync_config()
    };

    let report = synchronizer(&store, &generator, &config)
        .synchronize(&delete_requests(&names), &collection, None)
        .await
        .unwrap();
    assert_eq!(report.requests_created, 12);
    assert!(store.peak_in_flight() <= 3);
    assert!(store.peak_in_flight() > 1);
}

#[tokio::test]
async fn synchronizing_under_an_existing_folder() {
    let store = Arc::new(MemoryStore::new());
    let collection = destination(&store).await;
    let generator = Arc::new(ScriptedGenerator::new().reply(GenerationKind::ExampleQueryParams, "[]"));
    let sync = synchronizer(&store, &generator, &sync_config());

    let first = sync
        .synchronize(&nodes(json!([{ "name": "Imported", "item": [] }])), &collection, None)
        .await
        .unwrap();
    let folder_id = first.created[0].id.clone();

    let second = sync
        .synchronize(&users_tree(), &collection, Some(&folder_id))
        .await
        .unwrap();
    assert_eq!(second.created[0].parent.as_deref(), Some(folder_id.as_str()));

    let tree = store.collection(&collection).unwrap();
    let imported = tree.item[0].as_folder().unwrap();
    assert_eq!(imported.children[0].name(), "Users");
}

#[tokio::test]
async fn create_with_lost_response_is_not_repeated() {
    let store = Arc::new(LostResponseStore::new(MemoryStore::new()));
    let collection = destination(&store.inner).await;
    let generator = Arc::new(ScriptedGenerator::new());
    let config = SyncConfig {
        max_retry_attempts: 3,
        ..sync_config()
    };
    let source = nodes(json!([{ "id": "src-users", "name": "Users", "item": [] }]));

    let synchronizer = TreeSynchronizer::new(store.clone(), generator, credentials(), &config);
    let err = synchronizer
        .synchronize(&source, &collection, None)
        .await
        .unwrap_err();

    match err {
        ApiError::SyncAborted { source, created } => {
            assert!(matches!(*source, ApiError::RemoteOutcomeUnknown(_)));
            assert!(created.is_empty());
        }
        other => panic!("unexpected error {:?}", other),
    }
    let folders: Vec<String> = store
        .inner
        .collection(&collection)
        .unwrap()
        .item
        .iter()
        .map(|node| node.name().to_string())
        .collect();
    assert_eq!(folders, vec!["Users"]);
}
