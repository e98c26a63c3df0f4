//! Integration tests that call the real Notion API.
//!
//! These tests require NOTION_TOKEN and NOTION_PAGE_ID to be set (via .env
//! file or environment).
//! Run with: `cargo test -p notion --test api_integration -- --ignored`
//!
//! These are marked #[ignore] by default to avoid:
//! - Test failures when no integration token is available
//! - Slow test runs (API calls take seconds)

use notion::Notion;

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

/// Check if the integration credentials are available
fn has_credentials() -> bool {
    std::env::var("NOTION_TOKEN").is_ok() && std::env::var("NOTION_PAGE_ID").is_ok()
}

#[tokio::test]
#[ignore] // Run with: cargo test -p notion --test api_integration -- --ignored
async fn test_list_page_children() {
    setup();
    if !has_credentials() {
        eprintln!("Skipping test: NOTION_TOKEN / NOTION_PAGE_ID not set");
        return;
    }

    let client = Notion::from_env().expect("client from env");
    let page_id = std::env::var("NOTION_PAGE_ID").unwrap();

    let children = client
        .list_all_children(&page_id)
        .await
        .expect("page children should list");

    // The dashboard page always has at least the settings toggle on it.
    assert!(!children.is_empty(), "dashboard page should have blocks");
    for block in &children {
        assert!(!block.id.is_empty());
        assert!(!block.kind.is_empty());
    }
}

#[tokio::test]
#[ignore]
async fn test_find_collection_miss_is_none() {
    setup();
    if !has_credentials() {
        eprintln!("Skipping test: NOTION_TOKEN / NOTION_PAGE_ID not set");
        return;
    }

    let client = Notion::from_env().expect("client from env");
    let found = client
        .find_collection("No Such Collection Title 9c1f")
        .await
        .expect("search should succeed");
    assert!(found.is_none());
}
