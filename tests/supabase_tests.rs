use bytes::Bytes;
use image_gallery::object_store::{ObjectStore, ObjectStoreError, SupabaseStore};
use image_gallery::storage::models::{InsertOutcome, NewImage};
use image_gallery::storage::{ImageTable, PostgrestTable, TableError};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TABLE_PATH: &str = "/rest/v1/main";

fn table(server: &MockServer) -> PostgrestTable {
    PostgrestTable::new(&server.uri(), "service-key", "main").unwrap()
}

fn new_image(url: &str) -> NewImage {
    NewImage {
        url: url.to_string(),
        tags: vec!["a".to_string()],
    }
}

// ============================================================================
// PostgREST metadata table
// ============================================================================

#[tokio::test]
async fn test_insert_returns_created_row() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .and(header("apikey", "service-key"))
        .and(header("Prefer", "return=representation"))
        .and(body_partial_json(json!({"url": "http://x/a.png", "tags": ["a"]})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([
            {"id": 7, "url": "http://x/a.png", "tags": ["a"]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = table(&server).insert(new_image("http://x/a.png")).await.unwrap();
    let InsertOutcome::Inserted(record) = outcome else {
        panic!("expected insert, got {outcome:?}");
    };
    assert_eq!(record.id, "7");
    assert_eq!(record.tags, vec!["a"]);
}

#[tokio::test]
async fn test_insert_conflict_is_duplicate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"main_url_key\""
        })))
        .mount(&server)
        .await;

    let outcome = table(&server).insert(new_image("http://x/a.png")).await.unwrap();
    assert_eq!(outcome, InsertOutcome::Duplicate);
}

#[tokio::test]
async fn test_insert_unique_violation_code_without_409_is_duplicate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key"
        })))
        .mount(&server)
        .await;

    let outcome = table(&server).insert(new_image("http://x/a.png")).await.unwrap();
    assert_eq!(outcome, InsertOutcome::Duplicate);
}

#[tokio::test]
async fn test_error_message_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "42P01",
            "message": "relation \"public.main\" does not exist"
        })))
        .mount(&server)
        .await;

    let err = table(&server).select_all().await.unwrap_err();
    assert!(matches!(err, TableError::Backend(_)));
    assert_eq!(err.to_string(), "relation \"public.main\" does not exist");
}

#[tokio::test]
async fn test_non_json_error_body_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream connect error"))
        .mount(&server)
        .await;

    let err = table(&server).select_all().await.unwrap_err();
    assert!(matches!(err, TableError::Backend(_)));
    assert!(err.to_string().contains("upstream connect error"), "{err}");
    assert!(err.to_string().contains("502"), "{err}");
}

#[tokio::test]
async fn test_select_by_url_filters_on_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("url", "eq.http://x/a.png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "1", "url": "http://x/a.png", "tags": null}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(TABLE_PATH))
        .and(query_param("url", "eq.http://x/missing.png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let table = table(&server);
    let found = table.select_by_url("http://x/a.png").await.unwrap().unwrap();
    assert_eq!(found.id, "1");
    assert!(found.tags.is_empty());
    assert!(table
        .select_by_url("http://x/missing.png")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_update_tags_unknown_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.1"))
        .and(body_partial_json(json!({"tags": ["x", "y"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "url": "http://x/a.png", "tags": ["x", "y"]}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let table = table(&server);
    let updated = table
        .update_tags("1", vec!["x".to_string(), "y".to_string()])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.tags, vec!["x", "y"]);

    assert!(table
        .update_tags("404", vec!["x".to_string()])
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_delete_unknown_id() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 1, "url": "http://x/a.png", "tags": []}
        ])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path(TABLE_PATH))
        .and(query_param("id", "eq.2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let table = table(&server);
    assert!(table.delete_by_id("1").await.unwrap());
    assert!(!table.delete_by_id("2").await.unwrap());
}

// ============================================================================
// Supabase Storage bucket
// ============================================================================

const LIST_PATH: &str = "/storage/v1/object/list/images";

fn store(server: &MockServer, page_size: usize) -> SupabaseStore {
    SupabaseStore::new(&server.uri(), "service-key", "images", page_size).unwrap()
}

async fn mount_page(server: &MockServer, offset: usize, entries: serde_json::Value) {
    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .and(header("apikey", "service-key"))
        .and(body_partial_json(json!({"offset": offset})))
        .respond_with(ResponseTemplate::new(200).set_body_json(entries))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_list_pages_and_skips_folders() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        0,
        json!([
            {"name": "albums", "id": null, "metadata": null},
            {"name": "a.png", "id": "1", "metadata": {"size": 10, "mimetype": "image/png"}}
        ]),
    )
    .await;
    mount_page(
        &server,
        2,
        json!([
            {"name": ".emptyFolderPlaceholder", "id": "2", "metadata": {}},
            {"name": "b.jpg", "id": "3", "metadata": {"size": 5, "mimetype": "image/jpeg"}}
        ]),
    )
    .await;
    mount_page(&server, 4, json!([{"name": "c.gif", "id": "4"}])).await;

    let objects = store(&server, 2).list(None).await.unwrap();

    let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["a.png", "b.jpg", "c.gif"]);
    assert_eq!(objects[0].size, Some(10));
    assert_eq!(objects[1].content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(objects[2].size, None);
}

#[tokio::test]
async fn test_list_stops_at_limit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .and(body_partial_json(json!({"offset": 0, "limit": 1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"name": "a.png", "id": "1"}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let objects = store(&server, 100).list(Some(1)).await.unwrap();
    assert_eq!(objects.len(), 1);
}

#[tokio::test]
async fn test_list_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("Bucket not found"))
        .mount(&server)
        .await;

    let err = store(&server, 100).list(None).await.unwrap_err();
    assert!(matches!(err, ObjectStoreError::Backend(_)));
    assert!(err.to_string().contains("Bucket not found"), "{err}");
}

#[tokio::test]
async fn test_put_upserts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/images/cat.png"))
        .and(header("x-upsert", "true"))
        .and(header("Content-Type", "image/png"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Key": "images/cat.png"})))
        .expect(1)
        .mount(&server)
        .await;

    store(&server, 100)
        .put("cat.png", Bytes::from_static(b"png"), "image/png")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_get_missing_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/object/images/gone.png"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "statusCode": "404",
            "error": "not_found",
            "message": "Object not found"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/storage/v1/object/images/cat.png"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"png".to_vec()))
        .mount(&server)
        .await;

    let store = store(&server, 100);
    assert!(matches!(
        store.get("gone.png").await,
        Err(ObjectStoreError::NotFound(_))
    ));
    assert_eq!(store.get("cat.png").await.unwrap(), Bytes::from_static(b"png"));
}
