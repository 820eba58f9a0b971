//! Upload tracker behavior against the in-memory service.

use std::time::Duration;

use intake_core::api::UploadFile;
use intake_core::upload::{MAX_FILE_SIZE_BYTES, MAX_FILES_PER_BATCH, RejectionReason, UploadStatus};
use intake_test_utils::{
    ApiCall, TestContext, UploadDir, assert_all_uploads_terminal, assert_call_count,
    assert_upload_status, init_test_logging, sample_upload,
};

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn every_upload_ends_in_a_terminal_state() {
    init_test_logging();
    let ctx = TestContext::new();
    ctx.api.inject_failure_for("upload_file", "broken");
    let tracker = ctx.tracker().with_concurrency(3);

    let files = vec![
        sample_upload("orders_1.csv"),
        sample_upload("orders_2.csv"),
        sample_upload("broken.csv"),
        sample_upload("orders_3.csv"),
        sample_upload("notes.txt"),
    ];
    let admission = tracker.submit(files).await;
    assert_eq!(admission.accepted.len(), 5);

    let items = tracker.snapshot();
    assert_all_uploads_terminal(&items);
    assert_upload_status(&items, "broken.csv", UploadStatus::Error);
    assert_upload_status(&items, "notes.txt", UploadStatus::Success);

    let summary = tracker.summary();
    assert_eq!(summary.succeeded, 4);
    assert_eq!(summary.failed, 1);
    assert!(summary.is_settled());

    let broken = items
        .iter()
        .find(|i| i.file().name() == "broken.csv")
        .expect("broken item");
    assert!(broken.error().is_some_and(|e| e.contains("Injected failure")));
    assert_ne!(broken.progress(), 100);

    let errors = ctx.notifier.errors();
    assert_eq!(errors, vec!["Failed to upload broken.csv".to_string()]);
    assert!(
        ctx.notifier
            .successes()
            .contains(&"Successfully uploaded orders_2.csv".to_string())
    );
}

#[tokio::test]
async fn match_is_shown_before_the_upload_resolves() {
    let ctx = TestContext::new();
    ctx.api.hold_uploads();
    let tracker = ctx.tracker();
    let ids = tracker.enqueue(vec![sample_upload("orders_2024.csv")]).accepted;
    let id = ids[0];

    let observe = async {
        loop {
            let item = tracker.item(id).expect("item present");
            if let Some(label) = item.match_label() {
                assert_eq!(label, "Matched dataset: sales");
                assert_eq!(item.status(), UploadStatus::Uploading);
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_call_count(&ctx.api, "upload_file", 0);
        ctx.api.release_uploads();
    };

    let (summary, ()) = tokio::time::timeout(WAIT, async {
        tokio::join!(tracker.process(&ids), observe)
    })
    .await
    .expect("upload should finish");

    assert_eq!(summary.succeeded, 1);
    let item = tracker.item(id).expect("item present");
    assert_eq!(item.status(), UploadStatus::Success);
    assert_eq!(item.progress(), 100);
    assert_eq!(
        item.to_string(),
        format!(
            "orders_2024.csv ({:.2} MB) success - Matched dataset: sales",
            item.file().size_mb()
        )
    );
}

#[tokio::test]
async fn removing_an_item_leaves_siblings_alone() {
    let ctx = TestContext::new();
    ctx.api.hold_uploads();
    let tracker = ctx.tracker().with_concurrency(3);
    let ids = tracker
        .enqueue(vec![
            sample_upload("orders_a.csv"),
            sample_upload("orders_b.csv"),
            sample_upload("orders_c.csv"),
        ])
        .accepted;

    let observe = async {
        loop {
            let summary = tracker.summary();
            if summary.uploading == 3 {
                break;
            }
            tokio::task::yield_now().await;
        }
        let removed = tracker.remove(ids[1]).expect("removed item");
        assert!(removed.is_cancelled());
        assert_eq!(tracker.item(ids[0]).expect("a").status(), UploadStatus::Uploading);
        assert_eq!(tracker.item(ids[2]).expect("c").status(), UploadStatus::Uploading);
        ctx.api.release_uploads();
    };

    tokio::time::timeout(WAIT, async { tokio::join!(tracker.process(&ids), observe) })
        .await
        .expect("uploads should finish");

    let items = tracker.snapshot();
    assert_eq!(items.len(), 2);
    assert_all_uploads_terminal(&items);
    assert_upload_status(&items, "orders_a.csv", UploadStatus::Success);
    assert_upload_status(&items, "orders_c.csv", UploadStatus::Success);

    assert_call_count(&ctx.api, "upload_file", 2);
    assert!(
        ctx.notifier
            .messages()
            .iter()
            .all(|m| !m.contains("orders_b.csv"))
    );
}

#[tokio::test]
async fn removing_a_pending_item_skips_it() {
    let ctx = TestContext::new();
    let tracker = ctx.tracker();
    let ids = tracker
        .enqueue(vec![sample_upload("orders_a.csv"), sample_upload("orders_b.csv")])
        .accepted;

    tracker.remove(ids[0]);
    let summary = tracker.process(&ids).await;

    assert_eq!(summary.total, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(ctx.api.calls_to("find_match").len(), 1);
}

#[tokio::test]
async fn oversized_batch_is_refused_whole() {
    let ctx = TestContext::new();
    let tracker = ctx.tracker();
    let files: Vec<UploadFile> = (0..=MAX_FILES_PER_BATCH)
        .map(|i| sample_upload(&format!("orders_{i}.csv")))
        .collect();

    let admission = tracker.submit(files).await;

    assert!(admission.accepted.is_empty());
    assert_eq!(admission.rejected.len(), MAX_FILES_PER_BATCH + 1);
    assert!(tracker.snapshot().is_empty());
    assert!(ctx.api.calls().is_empty());
}

#[tokio::test]
async fn oversized_file_is_refused_alone() {
    let ctx = TestContext::new();
    let dir = UploadDir::new();
    let big = dir.sparse("orders_big.csv", MAX_FILE_SIZE_BYTES + 1);
    let small = dir.write("orders_small.csv", "order_id,amount\n1,2.00\n");
    let files = vec![
        UploadFile::from_path(&big).await.expect("big file"),
        UploadFile::from_path(&small).await.expect("small file"),
    ];

    let tracker = ctx.tracker();
    let admission = tracker.submit(files).await;

    assert_eq!(admission.accepted.len(), 1);
    assert_eq!(admission.rejected.len(), 1);
    assert_eq!(admission.rejected[0].file_name, "orders_big.csv");
    assert!(matches!(
        admission.rejected[0].reason,
        RejectionReason::FileTooLarge { .. }
    ));

    let items = tracker.snapshot();
    assert_eq!(items.len(), 1);
    assert_upload_status(&items, "orders_small.csv", UploadStatus::Success);
}

#[tokio::test]
async fn metadata_is_sent_with_every_upload() {
    let ctx = TestContext::new();
    let tracker = ctx
        .tracker()
        .with_metadata(Some("q3 backfill".to_string()));

    tracker
        .submit(vec![sample_upload("orders_1.csv"), sample_upload("orders_2.csv")])
        .await;

    let uploads = ctx.api.calls_to("upload_file");
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
}

#[tokio::test]
async fn failed_match_lookup_does_not_block_upload() {
    let ctx = TestContext::new();
    ctx.api.inject_failure("find_match");
    let tracker = ctx.tracker();

    tracker.submit(vec![sample_upload("orders_1.csv")]).await;

    let items = tracker.snapshot();
    assert_upload_status(&items, "orders_1.csv", UploadStatus::Success);
    assert!(items[0].matched().is_none());
    assert_eq!(
        ctx.notifier.successes(),
        vec!["Successfully uploaded orders_1.csv".to_string()]
    );
}

#[tokio::test]
async fn clear_finished_keeps_unstarted_items() {
    let ctx = TestContext::new();
    let tracker = ctx.tracker();
    tracker.submit(vec![sample_upload("orders_1.csv")]).await;
    tracker.enqueue(vec![sample_upload("orders_2.csv")]);

    assert_eq!(tracker.clear_finished(), 1);
    let items = tracker.snapshot();
    assert_eq!(items.len(), 1);
    assert_upload_status(&items, "orders_2.csv", UploadStatus::Pending);
}
