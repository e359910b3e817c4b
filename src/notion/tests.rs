use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path, query_param},
};

use super::*;

fn client_for(server: &MockServer) -> NotionClient {
    let config = NotesConfig {
        api_base: server.uri(),
        ..NotesConfig::default()
    };
    NotionClient::with_token(&config, "secret_test").expect("client should build")
}

fn page(id: &str, title: &str) -> Value {
    json!({
        "object": "page",
        "id": id,
        "properties": {
            "Tags": { "id": "a1", "type": "multi_select", "multi_select": [] },
            "Name": {
                "id": "title",
                "type": "title",
                "title": [
                    { "type": "text", "plain_text": title }
                ]
            }
        }
    })
}

fn paragraph(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {
            "rich_text": [
                { "type": "text", "plain_text": text }
            ]
        }
    })
}

#[test]
fn block_text_reads_rich_text() {
    let heading = json!({
        "type": "heading_2",
        "heading_2": {
            "rich_text": [
                { "plain_text": "Week " },
                { "plain_text": "one" }
            ]
        }
    });
    let divider = json!({ "type": "divider", "divider": {} });

    assert_eq!(block_text(&heading).as_deref(), Some("Week one"));
    assert_eq!(block_text(&divider), None);
    assert_eq!(block_text(&paragraph("")), None);
}

#[test]
fn untitled_page_has_no_title() {
    let page: PageObject = serde_json::from_value(json!({
        "id": "p1",
        "properties": {
            "Name": { "type": "title", "title": [] }
        }
    }))
    .expect("page should parse");

    assert_eq!(page.title(), None);
}

#[tokio::test]
async fn query_follows_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/db1/query"))
        .and(body_partial_json(json!({ "start_cursor": "cursor-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [ page("p3", "Third") ],
            "has_more": false,
            "next_cursor": null
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/db1/query"))
        .and(header("Authorization", "Bearer secret_test"))
        .and(header("Notion-Version", "2022-06-28"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [ page("p1", "First"), page("p2", "Second") ],
            "has_more": true,
            "next_cursor": "cursor-2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let pages = tokio::task::spawn_blocking(move || client.query_database("db1"))
        .await
        .expect("blocking task should finish")
        .expect("query should succeed");

    let titles: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["First", "Second", "Third"]);
    assert_eq!(pages[2].id, "p3");
}

#[tokio::test]
async fn page_text_follows_block_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/blocks/p1/children"))
        .and(query_param("start_cursor", "b-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [ paragraph("Second half.") ],
            "has_more": false,
            "next_cursor": null
        })))
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/blocks/p1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                paragraph("First half."),
                { "type": "divider", "divider": {} }
            ],
            "has_more": true,
            "next_cursor": "b-2"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = tokio::task::spawn_blocking(move || client.page_text("p1"))
        .await
        .expect("blocking task should finish")
        .expect("blocks should load");

    assert_eq!(text, "First half.\nSecond half.");
}

#[tokio::test]
async fn load_documents_names_pages_by_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/databases/db1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [ page("p1", "Biology notes") ],
            "has_more": false,
            "next_cursor": null
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/blocks/p1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [ paragraph("Mitochondria make ATP.") ],
            "has_more": false,
            "next_cursor": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let documents = tokio::task::spawn_blocking(move || client.load_documents("db1"))
        .await
        .expect("blocking task should finish")
        .expect("documents should load");

    assert_eq!(
        documents,
        vec![Document::from_pages(
            "Biology notes",
            ["Mitochondria make ATP."]
        )]
    );
}

#[tokio::test]
async fn rejected_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "object": "error",
            "status": 401,
            "code": "unauthorized"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.query_database("db1"))
        .await
        .expect("blocking task should finish");

    assert_eq!(result, Err(ProviderError::Unauthorized(401)));
}

#[test]
fn only_blocks_with_children_are_expanded() {
    let toggle = json!({ "id": "t1", "type": "toggle", "has_children": true });
    let leaf = json!({ "id": "b1", "type": "paragraph", "has_children": false });

    assert_eq!(nested_block_id(&toggle), Some("t1"));
    assert_eq!(nested_block_id(&leaf), None);
    assert_eq!(nested_block_id(&paragraph("no flag")), None);
}

#[tokio::test]
async fn page_text_includes_nested_blocks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/blocks/p1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "object": "block",
                    "id": "t1",
                    "type": "toggle",
                    "has_children": true,
                    "toggle": {
                        "rich_text": [ { "type": "text", "plain_text": "Photosynthesis" } ]
                    }
                },
                paragraph("Summary.")
            ],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/blocks/t1/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "object": "block",
                    "id": "b2",
                    "type": "bulleted_list_item",
                    "has_children": true,
                    "bulleted_list_item": {
                        "rich_text": [ { "type": "text", "plain_text": "Chlorophyll absorbs light." } ]
                    }
                }
            ],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/blocks/b2/children"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [ paragraph("Mostly red and blue.") ],
            "has_more": false,
            "next_cursor": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let text = tokio::task::spawn_blocking(move || client.page_text("p1"))
        .await
        .expect("blocking task should finish")
        .expect("blocks should load");

    assert_eq!(
        text,
        "Photosynthesis\n\tChlorophyll absorbs light.\n\t\tMostly red and blue.\nSummary."
    );
}
