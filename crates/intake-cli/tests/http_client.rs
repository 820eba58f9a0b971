//! The HTTP client driving the core views against a live mock server.

use std::sync::Arc;

use intake_cli::Config;
use intake_cli::client::HttpIngestClient;
use intake_core::IngestApi;
use intake_core::error::Error;
use intake_core::observability::Redacted;
use intake_core::registry::DatasetRegistryView;
use intake_core::schema::{ColumnUpdate, SchemaEditor};
use intake_core::upload::{UploadStatus, UploadTracker};
use intake_test_utils::{
    ApiCall, MemoryIngestApi, MockIngestServer, ORDERS, RecordingNotifier, SALES,
    assert_default_column, last_schema_update, orders_table, sales_dataset, sample_upload,
};

fn seeded() -> MemoryIngestApi {
    let api = MemoryIngestApi::new();
    api.insert_dataset(sales_dataset());
    api.insert_table(orders_table());
    api
}

fn client_for(server: &MockIngestServer, token: Option<&str>) -> Arc<HttpIngestClient> {
    let config = Config {
        api_url: server.base_url().to_string(),
        api_token: token.map(|t| Redacted(t.to_string())),
        ..Config::default()
    };
    Arc::new(HttpIngestClient::new(&config).expect("client"))
}

#[tokio::test]
async fn schema_edit_round_trips_over_http() {
    let server = MockIngestServer::start(seeded()).await;
    let notifier = Arc::new(RecordingNotifier::new());
    let mut editor = SchemaEditor::new(client_for(&server, None), notifier.clone());

    editor.select_dataset(SALES).await.expect("dataset");
    assert_eq!(editor.tables(), [ORDERS.to_string()]);
    editor.select_table(ORDERS).await.expect("table");

    let added = editor.add_column().expect("add");
    editor.save().await.expect("save");

    let sent = last_schema_update(server.api());
    assert_eq!(sent.columns.len(), 3);
    assert_default_column(&sent.columns[added]);
    assert_eq!(
        server.api().table(SALES, ORDERS).map(|t| t.columns.len()),
        Some(3)
    );
    assert_eq!(
        notifier.successes(),
        vec!["Schema updated successfully".to_string()]
    );
}

#[tokio::test]
async fn edits_keep_unusual_names_intact() {
    let server = MockIngestServer::start(seeded()).await;
    let mut editor = SchemaEditor::new(
        client_for(&server, None),
        Arc::new(RecordingNotifier::new()),
    );
    editor.select_dataset(SALES).await.expect("dataset");
    editor.select_table(ORDERS).await.expect("table");

    editor
        .update_column(1, ColumnUpdate::Description(Some("gross, in €".to_string())))
        .expect("describe");
    editor.save().await.expect("save");

    assert_eq!(
        last_schema_update(server.api()).columns[1]
            .description
            .as_deref(),
        Some("gross, in €")
    );
}

#[tokio::test]
async fn upload_sends_metadata_and_reports_match() {
    let server = MockIngestServer::start(seeded()).await;
    let notifier = Arc::new(RecordingNotifier::new());
    let tracker = UploadTracker::new(client_for(&server, None), notifier.clone())
        .with_metadata(Some("q3 backfill".to_string()));

    tracker
        .submit(vec![
            sample_upload("orders_2024.csv"),
            sample_upload("notes.txt"),
        ])
        .await;

    let items = tracker.snapshot();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.status() == UploadStatus::Success));
    assert_eq!(
        items[0].matched().map(|d| d.dataset_name.as_str()),
        Some(SALES)
    );
    assert!(items[1].matched().is_none());

    let uploads = server.api().calls_to("upload_file");
    assert_eq!(uploads.len(), 2);
    for call in uploads {
        match call {
            ApiCall::UploadFile { metadata, size, .. } => {
                assert_eq!(metadata.as_deref(), Some("q3 backfill"));
                assert!(size > 0);
            }
            other => panic!("unexpected call {other:?}"),
        }
    }
    assert!(notifier.errors().is_empty());
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let server = MockIngestServer::start_with_token(seeded(), "secret").await;

    let err = client_for(&server, None)
        .list_datasets()
        .await
        .unwrap_err();
    match err {
        Error::Rejected { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Not authenticated");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let datasets = client_for(&server, Some("secret"))
        .list_datasets()
        .await
        .expect("authorized");
    assert!(datasets.contains_key(SALES));
}

#[tokio::test]
async fn registry_creates_dataset_over_http() {
    let server = MockIngestServer::start(seeded()).await;
    let mut registry = DatasetRegistryView::new(client_for(&server, None));
    registry.load().await.expect("load");

    registry.form_mut().dataset_name = "new_ds".to_string();
    registry.form_mut().file_prefix = "new_".to_string();
    registry.submit().await.expect("create");

    assert!(registry.find("new_ds").is_some());
    assert_eq!(server.api().dataset_names(), vec!["new_ds", SALES]);
}

#[tokio::test]
async fn unknown_table_message_comes_from_body() {
    let server = MockIngestServer::start(seeded()).await;

    let err = client_for(&server, None)
        .get_table(SALES, "missing")
        .await
        .unwrap_err();
    match err {
        Error::Rejected { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Table not found");
        }
        other => panic!("unexpected error {other:?}"),
    }
}
