//! Async shim tests.

use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use veneer::shim::tokio::fs;
use veneer::{Builder, Result};

#[tokio::test]
async fn async_round_trip() -> Result {
    let handle = Builder::new().build();
    let _guard = handle.enter();

    fs::create_dir_all("/data").await?;
    fs::write("/data/file.txt", b"hello async").await?;
    assert_eq!(fs::read("/data/file.txt").await?, b"hello async");
    assert_eq!(fs::read_to_string("/data/file.txt").await?, "hello async");
    Ok(())
}

#[tokio::test]
async fn async_file_reads_and_writes() -> Result {
    let handle = Builder::new().build();
    let _guard = handle.enter();

    let mut file = fs::File::create("/f.bin").await?;
    file.write_all(b"0123456789").await?;
    file.flush().await?;
    drop(file);

    let mut file = fs::File::open("/f.bin").await?;
    let mut buf = [0u8; 4];
    file.read_exact(&mut buf).await?;
    assert_eq!(&buf, b"0123");

    file.seek(std::io::SeekFrom::End(-2)).await?;
    let mut rest = Vec::new();
    file.read_to_end(&mut rest).await?;
    assert_eq!(rest, b"89");
    Ok(())
}

#[tokio::test]
async fn async_metadata_and_listing() -> Result {
    let handle = Builder::new().build();
    let _guard = handle.enter();

    handle.create_file("/d/a.txt", b"abc")?;
    let meta = fs::metadata("/d/a.txt").await?;
    assert!(meta.is_file());
    assert_eq!(meta.len(), 3);

    let names: Vec<_> = fs::read_dir("/d")
        .await?
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, ["a.txt"]);
    Ok(())
}

#[tokio::test]
async fn async_rename_and_removal() -> Result {
    let handle = Builder::new().build();
    let _guard = handle.enter();

    fs::write("/old.txt", b"payload").await?;
    fs::rename("/old.txt", "/new.txt").await?;
    assert!(!fs::try_exists("/old.txt").await?);
    assert_eq!(fs::read("/new.txt").await?, b"payload");

    fs::remove_file("/new.txt").await?;
    assert!(!fs::try_exists("/new.txt").await?);
    Ok(())
}

#[tokio::test]
async fn async_symlink_metadata_and_canonicalize() -> Result {
    let handle = Builder::new().build();
    let _guard = handle.enter();

    handle.create_file("/real/target.txt", b"x")?;
    handle.create_symlink("/lnk", "/real/target.txt")?;

    assert!(fs::symlink_metadata("/lnk").await?.is_symlink());
    assert_eq!(
        fs::canonicalize("/lnk").await?.to_string_lossy(),
        "/real/target.txt"
    );
    assert_eq!(
        fs::read_link("/lnk").await?.to_string_lossy(),
        "/real/target.txt"
    );
    Ok(())
}

#[tokio::test]
async fn async_file_set_len_and_sync() -> Result {
    let handle = Builder::new().build();
    let _guard = handle.enter();

    let mut file = fs::File::create("/f").await?;
    file.write_all(b"abcdef").await?;
    file.sync_all().await?;
    file.set_len(3).await?;
    assert_eq!(file.metadata().await?.len(), 3);
    drop(file);

    assert_eq!(fs::read("/f").await?, b"abc");
    Ok(())
}
