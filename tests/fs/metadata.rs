//! Stat fields, timestamps and umask behavior.

use std::time::Duration;
use veneer::shim::std::fs::{metadata, read, set_permissions, symlink_metadata, write, File};
use veneer::{Builder, Os, Result};

#[test]
fn stat_reports_identity_and_size() -> Result {
    let fs = Builder::new().uid(1234).gid(5678).build();
    let _guard = fs.enter();

    fs.create_file("/f", b"123456")?;
    let stat = fs.stat("/f")?;
    assert_eq!(stat.size, 6);
    assert_eq!(stat.uid, 1234);
    assert_eq!(stat.gid, 5678);
    assert_eq!(stat.nlink, 1);
    assert!(stat.is_file());
    assert!(stat.ino > 0);
    Ok(())
}

#[test]
fn inode_numbers_are_unique_and_stable() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/a", b"")?;
    fs.create_file("/b", b"")?;
    let a = fs.stat("/a")?.ino;
    let b = fs.stat("/b")?.ino;
    assert_ne!(a, b);
    assert_eq!(fs.stat("/a")?.ino, a);
    Ok(())
}

#[test]
fn creation_sets_all_timestamps_equal() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"x")?;
    let stat = fs.stat("/f")?;
    assert_eq!(stat.crtime, stat.mtime);
    assert_eq!(stat.crtime, stat.ctime);
    assert_eq!(stat.crtime, stat.atime);
    assert!(stat.crtime > Duration::ZERO);
    Ok(())
}

#[test]
fn writes_update_mtime_and_ctime() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"x")?;
    veneer::utime("/f", Some((Duration::from_secs(1), Duration::from_secs(1))))?;

    write("/f", b"fresh")?;
    let stat = fs.stat("/f")?;
    assert!(stat.mtime > Duration::from_secs(1));
    assert!(stat.ctime >= stat.mtime);
    Ok(())
}

#[test]
fn chmod_updates_only_ctime() -> Result {
    let fs = Builder::new().uid(1000).build();
    let _guard = fs.enter();

    fs.create_file("/f", b"x")?;
    veneer::utime("/f", Some((Duration::from_secs(5), Duration::from_secs(7))))?;

    let perms = metadata("/f")?.permissions();
    set_permissions("/f", perms)?;
    let stat = fs.stat("/f")?;
    assert_eq!(stat.atime, Duration::from_secs(5));
    assert_eq!(stat.mtime, Duration::from_secs(7));
    assert!(stat.ctime > Duration::from_secs(7));
    Ok(())
}

#[test]
fn reads_touch_atime_by_default() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"x")?;
    veneer::utime("/f", Some((Duration::from_secs(1), Duration::from_secs(1))))?;

    read("/f")?;
    let stat = fs.stat("/f")?;
    assert!(stat.atime > Duration::from_secs(1));
    assert_eq!(stat.mtime, Duration::from_secs(1));
    Ok(())
}

#[test]
fn noatime_instances_leave_atime_alone() -> Result {
    let mut builder = Builder::new();
    builder.track_atime(false);
    let fs = builder.build();
    let _guard = fs.enter();

    fs.create_file("/f", b"x")?;
    veneer::utime("/f", Some((Duration::from_secs(1), Duration::from_secs(1))))?;

    read("/f")?;
    assert_eq!(fs.stat("/f")?.atime, Duration::from_secs(1));
    Ok(())
}

#[test]
fn utime_has_nanosecond_precision() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"")?;
    let atime = Duration::new(1_000, 123_456_789);
    let mtime = Duration::new(2_000, 987_654_321);
    veneer::utime("/f", Some((atime, mtime)))?;

    let stat = fs.stat("/f")?;
    assert_eq!(stat.atime, atime);
    assert_eq!(stat.mtime, mtime);
    Ok(())
}

#[test]
fn default_mode_honors_umask() -> Result {
    let mut builder = Builder::new();
    builder.uid(1000).umask(0o027);
    let fs = builder.build();
    let _guard = fs.enter();

    write("/f", b"")?;
    assert_eq!(fs.stat("/f")?.perm(), 0o666 & !0o027);

    veneer::create_dir("/d")?;
    assert_eq!(fs.stat("/d")?.perm(), 0o777 & !0o027);
    Ok(())
}

#[test]
fn explicit_chmod_wins_over_umask() -> Result {
    let fs = Builder::new().uid(1000).build();
    let _guard = fs.enter();

    write("/f", b"")?;
    fs.chmod("/f", 0o617)?;
    assert_eq!(fs.stat("/f")?.perm(), 0o617);
    Ok(())
}

#[test]
fn symlink_metadata_reports_the_link() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/target", b"1234")?;
    fs.create_symlink("/lnk", "/target")?;

    let lmeta = symlink_metadata("/lnk")?;
    assert!(lmeta.is_symlink());
    assert_eq!(lmeta.len(), "/target".len() as u64);

    let meta = metadata("/lnk")?;
    assert!(meta.is_file());
    assert_eq!(meta.len(), 4);
    Ok(())
}

#[test]
fn directory_nlink_counts_subdirectories() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::create_dir("/d")?;
    assert_eq!(fs.stat("/d")?.nlink, 2);
    veneer::create_dir("/d/one")?;
    veneer::create_dir("/d/two")?;
    assert_eq!(fs.stat("/d")?.nlink, 4);
    veneer::shim::std::fs::remove_dir("/d/one")?;
    assert_eq!(fs.stat("/d")?.nlink, 3);
    Ok(())
}

#[test]
fn file_times_through_the_shim() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"x")?;
    let meta = metadata("/f")?;
    assert!(meta.modified()? >= std::time::UNIX_EPOCH);
    assert_eq!(meta.created()?, meta.modified()?);
    Ok(())
}

#[cfg(unix)]
#[test]
fn metadata_ext_exposes_the_full_stat() -> Result {
    use std::os::unix::fs::MetadataExt;

    let fs = Builder::new().uid(42).gid(43).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/f", b"abcde")?;
    let meta = metadata("/f")?;
    assert_eq!(meta.uid(), 42);
    assert_eq!(meta.gid(), 43);
    assert_eq!(meta.size(), 5);
    assert_eq!(meta.nlink(), 1);
    assert_eq!(meta.mode() & 0o170000, 0o100000);
    assert!(meta.ino() > 0);
    assert!(meta.dev() > 0);
    assert_eq!(meta.blocks(), 1);
    Ok(())
}

#[test]
fn fstat_works_without_a_path() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"0123")?;
    let file = File::open("/f")?;
    let meta = file.metadata()?;
    assert_eq!(meta.len(), 4);
    assert!(meta.is_file());
    Ok(())
}

#[test]
fn xattrs_on_the_linux_profile() -> Result {
    let fs = Builder::new().os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/f", b"")?;
    fs.setxattr("/f", "user.origin", b"test-suite")?;
    assert_eq!(
        fs.getxattr("/f", "user.origin")?.as_deref(),
        Some(b"test-suite".as_ref())
    );
    assert_eq!(fs.listxattr("/f")?, ["user.origin"]);
    fs.removexattr("/f", "user.origin")?;
    assert_eq!(fs.getxattr("/f", "user.origin")?, None);
    Ok(())
}
