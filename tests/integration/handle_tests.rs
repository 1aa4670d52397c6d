use crate::common::fixtures::{docs_tree, drive_fs, A_TXT};
use crate::common::mock_remote_store::DownloadBehavior;
use anyhow::Result;
use onedrive_pathfs::fs::{FsErrorKind, ReadHandle};
use std::io::SeekFrom;
use std::time::Duration;

/// Upper bound for tests that must not hang
const TEST_DEADLINE: Duration = Duration::from_secs(5);

async fn read_to_end(handle: &mut ReadHandle, buf_size: usize) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    let mut buf = vec![0u8; buf_size];
    loop {
        let n = handle.read(&mut buf).await?;
        if n == 0 {
            return Ok(content);
        }
        content.extend_from_slice(&buf[..n]);
    }
}

#[tokio::test]
async fn test_read_streams_whole_content() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    assert_eq!(store.get_call_count("open_download_stream"), 0);

    assert_eq!(read_to_end(&mut handle, 3).await?, A_TXT);
    assert!(!handle.is_streaming());
    assert_eq!(handle.position(), 10);
    assert_eq!(store.get_call_count("open_download_stream"), 1);

    handle.close()?;
    Ok(())
}

#[tokio::test]
async fn test_reads_after_eof_return_zero_without_reopening() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    assert_eq!(read_to_end(&mut handle, 16).await?, A_TXT);

    let mut buf = [0u8; 16];
    assert_eq!(handle.read(&mut buf).await?, 0);
    assert_eq!(handle.read(&mut buf).await?, 0);
    assert!(!handle.is_streaming());
    assert_eq!(handle.position(), 10);
    assert_eq!(store.get_call_count("open_download_stream"), 1);

    // A rewind still starts a fresh download
    handle.seek(SeekFrom::Start(0))?;
    assert_eq!(read_to_end(&mut handle, 16).await?, A_TXT);
    assert_eq!(store.get_call_count("open_download_stream"), 2);
    Ok(())
}

#[tokio::test]
async fn test_stalled_stream_times_out() -> Result<()> {
    let store = docs_tree();
    store.set_download_behavior("F", DownloadBehavior::StallImmediately);
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    let mut buf = [0u8; 16];
    let err = tokio::time::timeout(TEST_DEADLINE, handle.read(&mut buf))
        .await?
        .unwrap_err();

    assert_eq!(err.kind(), FsErrorKind::Timeout);
    Ok(())
}

#[tokio::test]
async fn test_stall_after_data_times_out_instead_of_eof() -> Result<()> {
    let store = docs_tree();
    store.set_download_behavior("F", DownloadBehavior::StallAfterFirstChunk);
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    let mut buf = [0u8; 16];
    let first = tokio::time::timeout(TEST_DEADLINE, handle.read(&mut buf)).await??;
    assert_eq!(&buf[..first], &A_TXT[..first]);

    let err = tokio::time::timeout(TEST_DEADLINE, handle.read(&mut buf))
        .await?
        .unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::Timeout);
    Ok(())
}

#[tokio::test]
async fn test_stalled_open_times_out() -> Result<()> {
    let store = docs_tree();
    store.set_download_behavior("F", DownloadBehavior::StallOnOpen);
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    let mut buf = [0u8; 16];
    let err = tokio::time::timeout(TEST_DEADLINE, handle.read(&mut buf))
        .await?
        .unwrap_err();

    assert_eq!(err.kind(), FsErrorKind::Timeout);
    assert!(!handle.is_streaming());
    Ok(())
}

#[tokio::test]
async fn test_download_failure_is_passed_through() -> Result<()> {
    let store = docs_tree();
    store.make_operation_fail("open_download_stream");
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    let mut buf = [0u8; 16];
    let err = handle.read(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::TransientStore);
    Ok(())
}

#[tokio::test]
async fn test_seek_to_start_reopens_stream() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    let mut buf = [0u8; 3];
    handle.read(&mut buf).await?;

    assert_eq!(handle.seek(SeekFrom::Start(0))?, 0);
    assert!(!handle.is_streaming());
    assert_eq!(handle.position(), 0);

    assert_eq!(read_to_end(&mut handle, 4).await?, A_TXT);
    assert_eq!(store.get_call_count("open_download_stream"), 2);
    Ok(())
}

#[tokio::test]
async fn test_seek_to_end_reports_size_without_reading() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    assert_eq!(handle.seek(SeekFrom::End(0))?, 10);

    let mut buf = [0u8; 4];
    assert_eq!(handle.read(&mut buf).await?, 0);
    assert_eq!(store.get_call_count("open_download_stream"), 0);

    handle.seek(SeekFrom::Start(0))?;
    assert_eq!(read_to_end(&mut handle, 4).await?, A_TXT);
    Ok(())
}

#[tokio::test]
async fn test_arbitrary_seek_is_unsupported() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    for pos in [SeekFrom::Start(5), SeekFrom::Current(0), SeekFrom::End(-1)] {
        let err = handle.seek(pos).unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::Unsupported, "{:?}", pos);
    }
    Ok(())
}

#[tokio::test]
async fn test_close_is_idempotent() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    handle.close()?;
    handle.close()?;
    assert!(handle.is_closed());

    let mut buf = [0u8; 4];
    let err = handle.read(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::HandleClosed);
    assert_eq!(store.get_call_count("open_download_stream"), 0);
    Ok(())
}

#[tokio::test]
async fn test_reading_a_folder_is_unsupported() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs").await?;
    let mut buf = [0u8; 4];
    let err = handle.read(&mut buf).await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::Unsupported);
    Ok(())
}

#[tokio::test]
async fn test_read_directory_in_batches() -> Result<()> {
    let store = docs_tree();
    store.add_file("B", "D", "b.txt", b"b");
    store.add_file("C", "D", "c.txt", b"c");
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs").await?;
    let first = handle.read_directory(2).await?;
    let second = handle.read_directory(2).await?;
    let rest = handle.read_directory(2).await?;

    let names: Vec<&str> = first.iter().chain(second.iter()).map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
    assert!(rest.is_empty());

    let mut handle = fs.open_for_read("/").await?;
    let all = handle.read_directory(0).await?;
    assert_eq!(all.len(), 1);
    assert!(all[0].is_container);
    Ok(())
}

#[tokio::test]
async fn test_read_directory_warms_lookups() -> Result<()> {
    let store = docs_tree();
    store.add_file("B", "D", "b.txt", b"b");
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs").await?;
    handle.read_directory(0).await?;
    let queries = store.get_call_count("list_children");

    assert_eq!(fs.stat("/docs/b.txt").await?.size, 1);
    assert_eq!(store.get_call_count("list_children"), queries);
    Ok(())
}

#[tokio::test]
async fn test_read_directory_on_file_fails() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_read("/docs/a.txt").await?;
    let err = handle.read_directory(0).await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::NotAContainer);
    Ok(())
}

#[tokio::test]
async fn test_read_handle_stat() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let handle = fs.open_for_read("/docs/a.txt").await?;
    let metadata = handle.stat();
    assert_eq!(metadata.name, "a.txt");
    assert_eq!(metadata.size, 10);
    assert_eq!(metadata.content_type(), "application/octet-stream");
    assert_eq!(handle.path(), "/docs/a.txt");
    Ok(())
}

#[tokio::test]
async fn test_write_handle_rejects_read_and_seek() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_create("/docs/new.txt");
    let mut buf = [0u8; 4];
    assert_eq!(handle.read(&mut buf).unwrap_err().kind(), FsErrorKind::Unsupported);
    assert_eq!(
        handle.seek(SeekFrom::Start(0)).unwrap_err().kind(),
        FsErrorKind::Unsupported
    );
    Ok(())
}
