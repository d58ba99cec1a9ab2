//! Mount point, device-id and disk-budget tests.

use std::io::Write;
use veneer::shim::std::fs::{create_dir, hard_link, read, rename, write, OpenOptions};
use veneer::{Builder, Result};

#[test]
fn full_disk_rejects_the_whole_write() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::set_disk_usage(100, "/")?;
    create_dir("/foo")?;

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .open("/foo/bar.txt")?;
    let err = file.write_all(&[b'a'; 200]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::StorageFull);
    drop(file);

    // The file exists but no bytes were persisted.
    assert_eq!(read("/foo/bar.txt")?, b"");
    assert_eq!(veneer::get_disk_usage("/")?.used, 0);
    Ok(())
}

#[test]
fn writes_within_budget_accumulate() -> Result {
    let mut builder = Builder::new();
    builder.total_size(10);
    let fs = builder.build();
    let _guard = fs.enter();

    write("/a", b"12345")?;
    write("/b", b"1234")?;
    let usage = veneer::get_disk_usage("/")?;
    assert_eq!(usage.total, 10);
    assert_eq!(usage.used, 9);
    assert_eq!(usage.free, 1);

    let err = write("/c", b"12").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::StorageFull);

    // Shrinking releases budget for new data.
    veneer::shim::std::fs::remove_file("/b")?;
    write("/c", b"12")?;
    assert_eq!(veneer::get_disk_usage("/")?.used, 7);
    Ok(())
}

#[test]
fn cross_mount_rename_fails() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::add_mount_point("/mnt", None)?;
    fs.create_file("/mnt/a", b"x")?;

    let err = rename("/mnt/a", "/other").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::CrossesDevices);
    Ok(())
}

#[test]
fn cross_mount_hard_link_fails() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::add_mount_point("/mnt", None)?;
    fs.create_file("/a", b"x")?;

    let err = hard_link("/a", "/mnt/b").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::CrossesDevices);
    Ok(())
}

#[test]
fn mounts_get_their_own_device_id() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::add_mount_point("/mnt", None)?;
    let root_dev = fs.stat("/")?.dev;
    let mnt_dev = fs.stat("/mnt")?.dev;
    assert_ne!(root_dev, mnt_dev);

    // Files inherit the device of their mount.
    fs.create_file("/mnt/f", b"")?;
    assert_eq!(fs.stat("/mnt/f")?.dev, mnt_dev);
    fs.create_file("/g", b"")?;
    assert_eq!(fs.stat("/g")?.dev, root_dev);
    Ok(())
}

#[test]
fn mount_budgets_are_independent() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::add_mount_point("/small", Some(4))?;
    write("/unbounded.bin", vec![0u8; 1000])?;

    write("/small/ok", b"1234")?;
    let err = write("/small/over", b"1").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::StorageFull);

    assert_eq!(veneer::get_disk_usage("/small")?.used, 4);
    assert_eq!(veneer::get_disk_usage("/")?.used, 1000);
    Ok(())
}

#[test]
fn set_disk_usage_cannot_undercut_used_bytes() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    write("/f", b"123456")?;
    let err = veneer::set_disk_usage(3, "/").unwrap_err();
    assert_eq!(err.kind(), veneer::Fault::NoSpace);
    veneer::set_disk_usage(6, "/")?;
    Ok(())
}

#[test]
fn change_disk_usage_adjusts_the_counter() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::set_disk_usage(100, "/")?;
    veneer::change_disk_usage(60, "/")?;
    assert_eq!(veneer::get_disk_usage("/")?.used, 60);

    let err = veneer::change_disk_usage(50, "/").unwrap_err();
    assert_eq!(err.kind(), veneer::Fault::NoSpace);

    veneer::change_disk_usage(-60, "/")?;
    assert_eq!(veneer::get_disk_usage("/")?.used, 0);
    let _ = fs;
    Ok(())
}

#[test]
fn unbounded_mounts_report_the_default_total() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    let usage = veneer::get_disk_usage("/")?;
    assert_eq!(usage.total, 1024 * 1024 * 1024 * 1024);
    let _ = fs;
    Ok(())
}

#[test]
fn phantom_files_consume_budget() -> Result {
    let mut builder = Builder::new();
    builder.total_size(1000);
    let fs = builder.build();
    let _guard = fs.enter();

    fs.create_file_with_size("/reserved.bin", 900)?;
    assert_eq!(veneer::get_disk_usage("/")?.used, 900);

    let err = write("/over.txt", vec![b'x'; 200]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::StorageFull);
    write("/fits.txt", vec![b'x'; 100])?;
    Ok(())
}

#[test]
fn truncate_adjusts_the_budget_both_ways() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    write("/f", b"12345678")?;
    assert_eq!(veneer::get_disk_usage("/")?.used, 8);

    let file = OpenOptions::new().write(true).open("/f")?;
    file.set_len(3)?;
    assert_eq!(veneer::get_disk_usage("/")?.used, 3);
    file.set_len(10)?;
    assert_eq!(veneer::get_disk_usage("/")?.used, 10);
    Ok(())
}
