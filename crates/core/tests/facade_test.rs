//! Integration tests for the storage facade over the in-memory and local backends.

use bytes::Bytes;
use gcs_easy_core::storage::{
    BackendProvider, ClientConfig, DownloadPayload, DownloadRequest, GetRequest, ListRequest,
    StorageClient, StorageError, UploadRequest,
};

/// Client over a fresh in-memory store with `b1` as default bucket.
fn memory_client() -> StorageClient {
    let config = ClientConfig::new()
        .with_default_bucket("b1")
        .with_backend(BackendProvider::Memory);
    StorageClient::new(config).expect("Failed to create memory client")
}

#[tokio::test]
async fn test_upload_then_download_text_scenario() {
    let client = memory_client();

    let uploaded = client
        .upload(UploadRequest::new("x.txt").with_data("hello"))
        .await
        .expect("Failed to upload");

    assert_eq!(uploaded.bucket, "b1");
    assert_eq!(uploaded.key, "x.txt");
    assert!(uploaded.media_link.is_some());
    assert!(uploaded.etag.is_some());

    let downloaded = client
        .download(DownloadRequest::new("x.txt"))
        .await
        .expect("Failed to download");

    assert_eq!(downloaded.bucket, "b1");
    assert_eq!(downloaded.key, "x.txt");
    assert_eq!(
        downloaded.payload,
        DownloadPayload::Data(Bytes::from_static(b"hello"))
    );
}

#[tokio::test]
async fn test_binary_round_trip() {
    let client = memory_client();
    let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

    client
        .upload(
            UploadRequest::new("blobs/data.bin")
                .with_data(payload.clone())
                .with_content_type("application/octet-stream"),
        )
        .await
        .expect("Failed to upload");

    let buffer = client
        .get_buffer(GetRequest::new("blobs/data.bin"))
        .await
        .expect("Failed to read buffer");
    assert_eq!(buffer.as_ref(), payload.as_slice());
}

#[tokio::test]
async fn test_download_to_nested_path_creates_directories() {
    let client = memory_client();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let destination = dir.path().join("a").join("b").join("c").join("report.txt");

    client
        .upload(UploadRequest::new("reports/report.txt").with_data("quarterly numbers"))
        .await
        .expect("Failed to upload");

    let in_memory = client
        .download(DownloadRequest::new("reports/report.txt"))
        .await
        .expect("Failed to download");
    assert!(in_memory.data().is_some());
    assert!(in_memory.file_path().is_none());

    let on_disk = client
        .download(DownloadRequest::new("reports/report.txt").with_destination(&destination))
        .await
        .expect("Failed to download to disk");

    assert_eq!(on_disk.file_path(), Some(destination.as_path()));
    assert!(on_disk.data().is_none());
    let written = std::fs::read(&destination).expect("Failed to read downloaded file");
    assert_eq!(written, b"quarterly numbers");

    // Directory creation is idempotent.
    client
        .download(DownloadRequest::new("reports/report.txt").with_destination(&destination))
        .await
        .expect("Failed to download twice");
}

#[tokio::test]
async fn test_upload_from_file() {
    let client = memory_client();
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let source = dir.path().join("invoice.pdf");
    std::fs::write(&source, b"%PDF-1.7").expect("Failed to write source file");

    let result = client
        .upload(
            UploadRequest::new("invoices/invoice.pdf")
                .with_file(&source)
                .with_content_type("application/pdf"),
        )
        .await
        .expect("Failed to upload file");
    assert_eq!(result.key, "invoices/invoice.pdf");

    let meta = client
        .get_metadata(GetRequest::new("invoices/invoice.pdf"))
        .await
        .expect("Failed to read metadata");
    assert_eq!(meta.metadata.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(meta.metadata.size, Some(8));
}

#[tokio::test]
async fn test_upload_from_missing_file_is_io_error() {
    let client = memory_client();
    let err = client
        .upload(UploadRequest::new("k").with_file("/definitely/not/here.bin"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Io { .. }));
}

#[tokio::test]
async fn test_get_metadata_is_stable() {
    let client = memory_client();
    client
        .upload(UploadRequest::new("stable.txt").with_data("same"))
        .await
        .expect("Failed to upload");

    let first = client
        .get_metadata(GetRequest::new("stable.txt"))
        .await
        .expect("Failed to read metadata");
    let second = client
        .get_metadata(GetRequest::new("stable.txt"))
        .await
        .expect("Failed to read metadata");

    assert!(first.metadata.etag.is_some());
    assert_eq!(first.metadata.etag, second.metadata.etag);
}

#[tokio::test]
async fn test_list_prefix_returns_exactly_matching_objects() {
    let client = memory_client();
    for key in ["folder/a.txt", "folder/b.txt", "folder/c.txt", "elsewhere/d.txt"] {
        client
            .upload(UploadRequest::new(key).with_data(key))
            .await
            .expect("Failed to upload");
    }

    let listed = client
        .list(ListRequest::new().with_prefix("folder/"))
        .await
        .expect("Failed to list");

    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|o| !o.name.is_empty()));
    assert!(listed.iter().all(|o| o.name.starts_with("folder/")));
    assert!(listed.iter().all(|o| o.etag.is_some() && o.size.is_some()));

    let nothing = client
        .list(ListRequest::new().with_prefix("does-not-exist/"))
        .await
        .expect("Empty listing should not fail");
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn test_list_with_delimiter_and_single_page() {
    let client = memory_client();
    for key in ["docs/1.md", "docs/2.md", "docs/3.md", "docs/archive/old.md"] {
        client
            .upload(UploadRequest::new(key).with_data("x"))
            .await
            .expect("Failed to upload");
    }

    let leaves = client
        .list(ListRequest::new().with_prefix("docs/").with_delimiter("/"))
        .await
        .expect("Failed to list");
    let names: Vec<&str> = leaves.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["docs/1.md", "docs/2.md", "docs/3.md"]);

    let first_page = client
        .list(
            ListRequest::new()
                .with_prefix("docs/")
                .with_page_size(2)
                .with_auto_paginate(false),
        )
        .await
        .expect("Failed to list first page");
    assert_eq!(first_page.len(), 2);
}

#[tokio::test]
async fn test_make_public_is_visible_in_metadata() {
    let client = memory_client();

    client
        .upload(
            UploadRequest::new("public/logo.png")
                .with_data(vec![0x89, b'P', b'N', b'G'])
                .with_make_public(true),
        )
        .await
        .expect("Failed to upload");
    client
        .upload(UploadRequest::new("private/notes.txt").with_data("secret"))
        .await
        .expect("Failed to upload");

    let public = client
        .get_metadata(GetRequest::new("public/logo.png"))
        .await
        .expect("Failed to read metadata");
    assert_eq!(public.metadata.public_read, Some(true));

    let private = client
        .get_metadata(GetRequest::new("private/notes.txt"))
        .await
        .expect("Failed to read metadata");
    assert_eq!(private.metadata.public_read, Some(false));
}

#[tokio::test]
async fn test_user_metadata_stays_separate_from_backend_fields() {
    let client = memory_client();
    client
        .upload(
            UploadRequest::new("tagged.json")
                .with_data("{}")
                .with_content_type("application/json")
                .with_metadata("etag", "user-value")
                .with_metadata("owner", "ana"),
        )
        .await
        .expect("Failed to upload");

    let meta = client
        .get_metadata(GetRequest::new("tagged.json"))
        .await
        .expect("Failed to read metadata")
        .metadata;

    assert_eq!(meta.user_metadata.get("etag"), Some("user-value"));
    assert_eq!(meta.user_metadata.get("owner"), Some("ana"));
    assert_ne!(meta.etag.as_deref(), Some("user-value"));
    assert_eq!(meta.content_type.as_deref(), Some("application/json"));
}

#[tokio::test]
async fn test_gzip_upload_downloads_original_bytes() {
    let client = memory_client();
    let text = "line of log output\n".repeat(200);

    client
        .upload(UploadRequest::new("logs/app.log").with_data(text.clone()).with_gzip(true))
        .await
        .expect("Failed to upload");

    let meta = client
        .get_metadata(GetRequest::new("logs/app.log"))
        .await
        .expect("Failed to read metadata");
    assert_eq!(meta.metadata.content_encoding.as_deref(), Some("gzip"));

    let buffer = client
        .get_buffer(GetRequest::new("logs/app.log"))
        .await
        .expect("Failed to read buffer");
    assert_eq!(buffer, text.as_bytes());
}

#[tokio::test]
async fn test_missing_object_is_not_found_everywhere() {
    let client = memory_client();

    let err = client
        .download(DownloadRequest::new("missing.txt"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .get_buffer(GetRequest::new("missing.txt"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = client
        .get_metadata(GetRequest::new("missing.txt"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_local_fs_backend_round_trip() {
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let config = ClientConfig::new()
        .with_default_bucket("b1")
        .with_backend(BackendProvider::LocalFs {
            root: root.path().to_path_buf(),
        });
    let client = StorageClient::new(config).expect("Failed to create local client");

    for key in ["folder/a.txt", "folder/b.txt", "folder/nested/c.txt"] {
        client
            .upload(UploadRequest::new(key).with_data("local"))
            .await
            .expect("Failed to upload");
    }

    let buffer = client
        .get_buffer(GetRequest::new("folder/a.txt"))
        .await
        .expect("Failed to read buffer");
    assert_eq!(buffer, "local");

    let everything = client
        .list(ListRequest::new().with_prefix("folder/"))
        .await
        .expect("Failed to list");
    let names: Vec<&str> = everything.iter().map(|o| o.name.as_str()).collect();
    assert_eq!(names, vec!["folder/a.txt", "folder/b.txt", "folder/nested/c.txt"]);

    let leaves = client
        .list(ListRequest::new().with_prefix("folder/").with_delimiter("/"))
        .await
        .expect("Failed to list leaves");
    assert_eq!(leaves.len(), 2);
}
