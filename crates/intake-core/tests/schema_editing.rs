//! Schema editor behavior against the in-memory service.

use intake_core::error::Error;
use intake_core::model::{Column, ColumnType, Sensitivity, Table};
use intake_core::schema::{ColumnUpdate, SchemaEditor};
use intake_core::view::LoadState;
use intake_test_utils::{
    ORDERS, SALES, TestContext, assert_call_count, assert_default_column, last_schema_update,
    orders_table,
};

async fn editor_on_orders(ctx: &TestContext) -> SchemaEditor {
    let mut editor = ctx.editor();
    editor.select_dataset(SALES).await.expect("select dataset");
    editor.select_table(ORDERS).await.expect("select table");
    editor
}

#[tokio::test]
async fn adding_a_column_saves_the_full_table() {
    let ctx = TestContext::new();
    let mut editor = editor_on_orders(&ctx).await;
    assert_eq!(editor.columns().len(), 2);
    assert!(!editor.has_unsaved_changes());

    let index = editor.add_column().expect("add column");
    assert_eq!(index, 2);
    assert!(editor.has_unsaved_changes());

    let saved = editor.save().await.expect("save");

    let sent = last_schema_update(&ctx.api);
    assert_eq!(sent.columns.len(), 3);
    assert_eq!(sent.columns[..2], orders_table().columns[..]);
    assert_default_column(&sent.columns[2]);
    assert_eq!(sent.description, orders_table().description);

    assert_eq!(saved, sent);
    assert_eq!(editor.columns().len(), 3);
    assert!(!editor.has_unsaved_changes());
    assert_eq!(editor.state(), LoadState::Loaded);
    assert_eq!(
        ctx.notifier.successes(),
        vec!["Schema updated successfully".to_string()]
    );
    assert_call_count(&ctx.api, "get_table", 2);
}

#[tokio::test]
async fn draft_reflects_the_net_effect_of_edits() {
    let ctx = TestContext::new();
    let mut editor = editor_on_orders(&ctx).await;

    let added = editor.add_column().expect("add");
    editor
        .update_column(added, ColumnUpdate::Name("customer_id".to_string()))
        .expect("rename");
    editor
        .update_column(added, ColumnUpdate::Type(ColumnType::Long))
        .expect("retype");
    editor
        .update_column(1, ColumnUpdate::Sensitivity(Sensitivity::Pii))
        .expect("classify");
    let removed = editor.remove_column(0).expect("remove");
    assert_eq!(removed.column_name, "order_id");

    let names: Vec<&str> = editor
        .columns()
        .iter()
        .map(|c| c.column_name.as_str())
        .collect();
    assert_eq!(names, vec!["amount", "customer_id"]);
    assert_eq!(editor.columns()[0].sensitivity, Sensitivity::Pii);
    assert_eq!(editor.columns()[1].column_type, ColumnType::Long);

    editor.save().await.expect("save");
    assert_eq!(last_schema_update(&ctx.api).columns, editor.columns());
}

#[tokio::test]
async fn switching_table_discards_unsaved_edits() {
    let ctx = TestContext::new();
    ctx.api.insert_table(
        Table::new(SALES, "refunds").with_columns(vec![Column::new("refund_id", ColumnType::Long)]),
    );
    let mut editor = editor_on_orders(&ctx).await;

    editor.add_column().expect("add");
    editor.select_table("refunds").await.expect("switch");
    assert_eq!(editor.selected_table(), Some("refunds"));
    assert_eq!(editor.columns().len(), 1);
    assert!(!editor.has_unsaved_changes());

    editor.select_table(ORDERS).await.expect("switch back");
    assert_eq!(editor.columns().len(), 2);
    assert_call_count(&ctx.api, "update_table", 0);
}

#[tokio::test]
async fn switching_dataset_clears_table_and_draft() {
    let ctx = TestContext::new();
    let mut editor = editor_on_orders(&ctx).await;
    editor.add_column().expect("add");

    editor.select_dataset(SALES).await.expect("reselect");

    assert_eq!(editor.selected_table(), None);
    assert!(editor.draft().is_none());
    assert_eq!(editor.tables(), [ORDERS.to_string()]);
}

#[tokio::test]
async fn failed_save_keeps_local_edits() {
    let ctx = TestContext::new();
    ctx.api.inject_failure("update_table");
    let mut editor = editor_on_orders(&ctx).await;
    editor.add_column().expect("add");

    let err = editor.save().await.unwrap_err();
    assert!(err.is_rejection());

    assert_eq!(editor.columns().len(), 3);
    assert!(editor.has_unsaved_changes());
    assert_eq!(editor.state(), LoadState::Failed);
    assert_eq!(
        ctx.notifier.errors(),
        vec!["Failed to update schema: request rejected (500): Injected failure for update_table"
            .to_string()]
    );
    assert_eq!(ctx.api.table(SALES, ORDERS), Some(orders_table()));

    ctx.api.clear_failures();
    editor.save().await.expect("retry save");
    assert_eq!(ctx.api.table(SALES, ORDERS).expect("stored").columns.len(), 3);
}

#[tokio::test]
async fn save_succeeds_when_refetch_fails() {
    let ctx = TestContext::new();
    let mut editor = editor_on_orders(&ctx).await;
    editor.add_column().expect("add");

    ctx.api.inject_failure("get_table");
    let saved = editor.save().await.expect("save");

    assert_eq!(saved.columns.len(), 3);
    assert_eq!(editor.state(), LoadState::Loaded);
    assert_eq!(editor.error(), None);
    assert!(!editor.has_unsaved_changes());
    assert_eq!(editor.columns().len(), 3);
    assert_eq!(
        ctx.notifier.successes(),
        vec!["Schema updated successfully".to_string()]
    );
    assert!(ctx.notifier.errors().is_empty());
    assert_call_count(&ctx.api, "get_table", 2);
}

#[tokio::test]
async fn table_selection_requires_a_dataset() {
    let ctx = TestContext::new();
    let mut editor = ctx.editor();

    let err = editor.select_table(ORDERS).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));
    assert!(ctx.api.calls().is_empty());
}

#[tokio::test]
async fn out_of_range_edit_leaves_draft_unchanged() {
    let ctx = TestContext::new();
    let mut editor = editor_on_orders(&ctx).await;

    assert!(editor.update_column(5, ColumnUpdate::Nullable(false)).is_err());
    assert!(editor.remove_column(2).is_err());
    assert!(!editor.has_unsaved_changes());
}

#[tokio::test]
async fn duplicate_names_are_reported_but_saved() {
    let ctx = TestContext::new();
    let mut editor = editor_on_orders(&ctx).await;

    editor
        .update_column(1, ColumnUpdate::Name("order_id".to_string()))
        .expect("rename");
    assert_eq!(editor.duplicate_column_names(), vec!["order_id".to_string()]);

    editor.save().await.expect("save");
    assert_eq!(last_schema_update(&ctx.api).columns.len(), 2);
}

#[tokio::test]
async fn discard_changes_restores_loaded_schema() {
    let ctx = TestContext::new();
    let mut editor = editor_on_orders(&ctx).await;
    editor.remove_column(0).expect("remove");
    assert!(editor.has_unsaved_changes());

    editor.discard_changes();

    assert!(!editor.has_unsaved_changes());
    assert_eq!(editor.columns(), orders_table().columns.as_slice());
}

#[tokio::test]
async fn failed_table_list_is_reported() {
    let ctx = TestContext::new();
    ctx.api.inject_failure("list_tables");
    let mut editor = ctx.editor();

    assert!(editor.select_dataset(SALES).await.is_err());

    assert_eq!(editor.state(), LoadState::Failed);
    assert!(
        editor
            .error()
            .is_some_and(|e| e.starts_with("Failed to fetch tables: "))
    );
    assert!(editor.tables().is_empty());
}

#[tokio::test]
async fn dataset_selector_is_filled() {
    let ctx = TestContext::new();
    let mut editor = ctx.editor();

    editor.load_datasets().await.expect("load");

    assert_eq!(editor.datasets().len(), 1);
    assert_eq!(editor.datasets()[0].dataset_name, SALES);
}
