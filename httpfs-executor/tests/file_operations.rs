//! Integration tests: tagged operations against a temporary sandbox.

use std::sync::Arc;

use httpfs_core::OperationKind;
use httpfs_executor::{drain, ExecutorError, FileBackend, LocalFsBackend, Operation, Outcome};
use tokio::io::AsyncReadExt;

async fn execute(path: &std::path::Path, operation: Operation<'_>) -> Result<Outcome, ExecutorError> {
    LocalFsBackend::new().execute(path, operation).await
}

async fn contents(path: &std::path::Path) -> Vec<u8> {
    let reader = match execute(path, Operation::Read).await {
        Ok(Outcome::Contents(reader)) => reader,
        other => panic!("expected contents, got {other:?}"),
    };
    let mut reader = reader;
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        panic!("read failed: {e}");
    }
    buf
}

#[tokio::test]
async fn put_then_get_round_trips_the_body() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tenantA/notes.txt");

    let mut body: &[u8] = b"hello";
    let outcome = execute(&path, Operation::TruncateWrite(&mut body)).await;
    assert!(matches!(outcome, Ok(Outcome::Written(5))), "got {outcome:?}");
    assert_eq!(contents(&path).await, b"hello");

    // Same body again is observably identical to a single write.
    let mut body: &[u8] = b"hello";
    let outcome = execute(&path, Operation::TruncateWrite(&mut body)).await;
    assert!(matches!(outcome, Ok(Outcome::Written(5))));
    assert_eq!(contents(&path).await, b"hello");
}

#[tokio::test]
async fn delete_then_read_reports_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("x.bin");

    let mut body: &[u8] = &[0u8, 1, 2];
    assert!(execute(&path, Operation::AppendWrite(&mut body)).await.is_ok());
    assert!(matches!(execute(&path, Operation::Delete).await, Ok(Outcome::Deleted)));

    match execute(&path, Operation::Read).await {
        Err(e) => assert!(e.is_not_found(), "expected NotFound, got {e}"),
        Ok(other) => panic!("read after delete must fail, got {other:?}"),
    }
    match execute(&path, Operation::Delete).await {
        Err(e) => assert!(e.is_not_found(), "expected NotFound, got {e}"),
        Ok(other) => panic!("second delete must fail, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_appends_all_land() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = Arc::new(dir.path().join("shared.log"));
    let backend = Arc::new(LocalFsBackend::new());

    let tasks: Vec<_> = (0..16u8)
        .map(|i| {
            let path = Arc::clone(&path);
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                let chunk = [b'a' + i];
                let mut body: &[u8] = &chunk;
                backend
                    .execute(&path, Operation::AppendWrite(&mut body))
                    .await
                    .map(|_| ())
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("task panicked").expect("append failed");
    }

    let mut written = contents(&path).await;
    written.sort_unstable();
    let expected: Vec<u8> = (0..16u8).map(|i| b'a' + i).collect();
    assert_eq!(written, expected, "every append must land exactly once");
}

#[tokio::test]
async fn operation_kind_follows_the_tag() {
    let mut body: &[u8] = b"";
    assert_eq!(Operation::Read.kind(), OperationKind::Read);
    assert_eq!(Operation::Delete.kind(), OperationKind::Delete);
    assert_eq!(Operation::AppendWrite(&mut body).kind(), OperationKind::AppendWrite);
    assert_eq!(Operation::TruncateWrite(&mut body).kind(), OperationKind::TruncateWrite);
}

#[tokio::test]
async fn drain_consumes_the_rest_of_the_source() {
    let mut body: &[u8] = b"leftover bytes";
    let drained = drain(&mut body).await.expect("drain failed");
    assert_eq!(drained, 14);
    assert!(body.is_empty());
}
