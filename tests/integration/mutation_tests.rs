use crate::common::fixtures::{docs_tree, drive_fs};
use crate::common::mock_remote_store::{CreateCall, MockRemoteStore};
use anyhow::Result;
use onedrive_pathfs::fs::{FsErrorKind, OpenHandle, OpenOptions};
use onedrive_pathfs::onedrive_service::onedrive_models::ROOT_ID;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn test_remove_file_invalidates_path_and_listing() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let object = fs.resolver().resolve("/docs/a.txt", false).await?;
    assert_eq!(object.id, "F");
    assert_eq!(object.size, 10);
    assert_eq!(fs.list_children("/docs").await?.len(), 1);
    store.reset_call_counters();

    fs.remove_recursive("/docs/a.txt").await?;
    assert_eq!(store.deleted(), vec!["F".to_string()]);
    assert_eq!(store.get_call_count("delete"), 1);

    assert!(fs.cache().cached_lookup("/docs/a.txt", false).is_none());
    assert!(fs.cache().cached_lookup("/docs", true).is_none());
    assert!(fs.cache().cached_listing("D").is_none());

    let children = fs.list_children("/docs").await?;
    assert!(children.is_empty());
    // Fresh folder lookup plus fresh listing
    assert_eq!(store.get_call_count("list_children"), 2);

    let err = fs.resolver().resolve("/docs/a.txt", false).await.unwrap_err();
    assert!(err.is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_remove_folder_at_root() -> Result<()> {
    let store = docs_tree();
    store.add_folder("K", ROOT_ID, "keep");
    let fs = drive_fs(&store);

    assert_eq!(fs.list_children("/").await?.len(), 2);
    fs.remove_recursive("/docs").await?;

    let names: Vec<String> = fs
        .list_children("/")
        .await?
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["keep"]);
    assert!(fs.stat("/docs").await.unwrap_err().is_not_found());
    Ok(())
}

#[tokio::test]
async fn test_remove_folder_drops_cached_descendants() -> Result<()> {
    let store = docs_tree();
    store.add_folder("S", "D", "sub");
    store.add_file("N", "S", "n.txt", b"nested");
    let fs = drive_fs(&store);

    fs.stat("/docs/a.txt").await?;
    fs.stat("/docs/sub/n.txt").await?;
    fs.remove_recursive("/docs").await?;

    assert!(fs.cache().cached_lookup("/docs/a.txt", false).is_none());
    assert!(fs.cache().cached_lookup("/docs/sub/n.txt", false).is_none());
    assert!(fs.stat("/docs/a.txt").await.unwrap_err().is_not_found());
    assert!(fs.stat("/docs/sub/n.txt").await.unwrap_err().is_not_found());

    // A new folder of the same name starts out empty
    fs.make_container("/docs").await?;
    let mut handle = fs.open_for_create("/docs/a.txt");
    handle.write(b"fresh")?;
    let created = handle.close().await?;
    assert_eq!(fs.stat("/docs/a.txt").await?.size, 5);
    assert_eq!(store.content_of(&created.id), Some(b"fresh".to_vec()));
    Ok(())
}

#[tokio::test]
async fn test_remove_missing_path_fails_without_mutation() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let err = fs.remove_recursive("/docs/nope.txt").await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::NotFound);
    assert_eq!(store.mutation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_remove_root_is_unsupported() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let err = fs.remove_recursive("/").await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::Unsupported);
    assert_eq!(store.mutation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_create_buffers_until_close() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_create("/docs/new.txt");
    assert_eq!(handle.write(b"hello")?, 5);
    assert_eq!(handle.write(b" world")?, 6);

    let pending = handle.stat();
    assert_eq!(pending.name, "new.txt");
    assert_eq!(pending.size, 11);
    assert_eq!(store.mutation_count(), 0);

    let created = handle.close().await?;
    assert!(handle.is_closed());
    assert_eq!(
        store.created(),
        vec![CreateCall {
            parent_id: "D".to_string(),
            name: "new.txt".to_string(),
            is_container: false,
            content: Some(b"hello world".to_vec()),
        }]
    );
    assert_eq!(store.content_of(&created.id), Some(b"hello world".to_vec()));

    let resolved = fs.resolver().resolve("/docs/new.txt", false).await?;
    assert_eq!(resolved.id, created.id);
    assert_eq!(resolved.size, 11);
    Ok(())
}

#[tokio::test]
async fn test_created_file_shows_up_in_cached_listing() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    assert_eq!(fs.list_children("/docs").await?.len(), 1);

    let mut handle = fs.open_for_create("/docs/new.txt");
    handle.write(b"x")?;
    handle.close().await?;

    let names: Vec<String> = fs
        .list_children("/docs")
        .await?
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["a.txt", "new.txt"]);
    Ok(())
}

#[tokio::test]
async fn test_close_over_existing_object_does_not_mutate() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_create("/docs/a.txt");
    handle.write(b"replacement")?;
    let err = handle.close().await.unwrap_err();

    assert_eq!(err.kind(), FsErrorKind::AlreadyExists);
    assert_eq!(store.mutation_count(), 0);
    assert_eq!(store.content_of("F"), Some(b"0123456789".to_vec()));
    Ok(())
}

#[tokio::test]
async fn test_close_with_invalid_parent() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    for path in ["/missing/x.txt", "/docs/a.txt/x.txt"] {
        let mut handle = fs.open_for_create(path);
        handle.write(b"data")?;
        let err = handle.close().await.unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::InvalidParent, "{}", path);
    }
    assert_eq!(store.mutation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_write_handle_single_close() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let mut handle = fs.open_for_create("/docs/once.txt");
    handle.close().await?;

    assert_eq!(handle.write(b"late").unwrap_err().kind(), FsErrorKind::HandleClosed);
    assert_eq!(handle.close().await.unwrap_err().kind(), FsErrorKind::HandleClosed);
    assert_eq!(store.get_call_count("create_object"), 1);

    // A failed close is terminal too
    let mut handle = fs.open_for_create("/docs/a.txt");
    assert_err!(handle.close().await);
    assert_eq!(handle.close().await.unwrap_err().kind(), FsErrorKind::HandleClosed);
    Ok(())
}

#[tokio::test]
async fn test_store_failure_on_create_is_passed_through() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);
    store.make_operation_fail("create_object");

    let mut handle = fs.open_for_create("/docs/new.txt");
    handle.write(b"data")?;
    let err = handle.close().await.unwrap_err();

    assert_eq!(err.kind(), FsErrorKind::TransientStore);
    assert!(err.to_string().contains("Mock create_object failure"));
    // No retry
    assert_eq!(store.get_call_count("create_object"), 1);
    Ok(())
}

#[tokio::test]
async fn test_make_container() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let created = fs.make_container("/docs/sub").await?;
    assert!(created.is_container);
    assert_eq!(
        store.created(),
        vec![CreateCall {
            parent_id: "D".to_string(),
            name: "sub".to_string(),
            is_container: true,
            content: None,
        }]
    );

    assert!(fs.stat("/docs/sub").await?.is_container);
    assert!(fs.list_children("/docs/sub").await?.is_empty());

    let mut handle = fs.open_for_create("/docs/sub/inner.txt");
    handle.write(b"in")?;
    assert_ok!(handle.close().await);
    Ok(())
}

#[tokio::test]
async fn test_make_container_failures() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    for path in ["/docs", "/DOCS", "/docs/a.txt", "/Docs/A.txt", "/"] {
        let err = fs.make_container(path).await.unwrap_err();
        assert_eq!(err.kind(), FsErrorKind::AlreadyExists, "{}", path);
    }

    let err = fs.make_container("/missing/sub").await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::InvalidParent);

    assert_eq!(store.mutation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_open_modes() -> Result<()> {
    let store = docs_tree();
    let fs = drive_fs(&store);

    let read = fs.open("/docs/a.txt", &OpenOptions::read_only()).await?;
    assert!(matches!(read, OpenHandle::Read(_)));

    let write = fs.open("/docs/b.txt", &OpenOptions::create_truncate()).await?;
    assert!(matches!(write, OpenHandle::Write(_)));

    let unsupported = [
        OpenOptions {
            append: true,
            ..OpenOptions::create_truncate()
        },
        OpenOptions {
            read: true,
            ..OpenOptions::create_truncate()
        },
        OpenOptions {
            write: true,
            ..OpenOptions::default()
        },
        OpenOptions {
            write: true,
            create: true,
            ..OpenOptions::default()
        },
    ];
    for options in unsupported {
        let err = match fs.open("/docs/a.txt", &options).await {
            Ok(_) => panic!("{:?} should be rejected", options),
            Err(e) => e,
        };
        assert_eq!(err.kind(), FsErrorKind::Unsupported);
    }

    let missing = match fs.open("/docs/nope", &OpenOptions::read_only()).await {
        Ok(_) => panic!("opened a missing path"),
        Err(e) => e,
    };
    assert!(missing.is_not_found());
    assert_eq!(store.mutation_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_rename_is_unsupported() -> Result<()> {
    let store = MockRemoteStore::new();
    let fs = drive_fs(&store);

    let err = fs.rename("/a", "/b").await.unwrap_err();
    assert_eq!(err.kind(), FsErrorKind::Unsupported);
    Ok(())
}
