//! Identity and permission-check tests.

use veneer::shim::std::fs::{read, read_dir, remove_file, write, File, OpenOptions};
use veneer::{Builder, Fault, Os, Result};

#[test]
fn unreadable_file_refuses_open() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file_with("/secret", b"classified", 0o200, None)?;
    let err = File::open("/secret").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);

    // Write access still works through the owner write bit.
    let file = OpenOptions::new().write(true).open("/secret")?;
    drop(file);
    Ok(())
}

#[test]
fn group_and_other_tiers_apply() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file_with("/shared", b"x", 0o640, None)?;
    fs.set_uid(0);
    fs.chown("/shared", Some(2000), Some(1000))?;
    fs.set_uid(1000);

    // Same group: read allowed, write denied.
    assert!(read("/shared").is_ok());
    let err = OpenOptions::new().write(true).open("/shared").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);

    // Neither owner nor group: nothing allowed.
    fs.set_gid(3000);
    let err = File::open("/shared").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    Ok(())
}

#[test]
fn traversal_requires_the_execute_bit() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/locked/inner.txt", b"x")?;
    fs.chmod("/locked", 0o600)?;

    let err = read("/locked/inner.txt").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);

    fs.chmod("/locked", 0o700)?;
    assert_eq!(read("/locked/inner.txt")?, b"x");
    Ok(())
}

#[test]
fn listing_requires_the_read_bit() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/d/f", b"")?;
    fs.chmod("/d", 0o300)?;
    let err = read_dir("/d").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    Ok(())
}

#[test]
fn creation_requires_a_writable_parent() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    veneer::create_dir("/ro")?;
    fs.chmod("/ro", 0o555)?;
    let err = write("/ro/new.txt", b"x").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    Ok(())
}

#[test]
fn root_bypasses_mode_checks_when_allowed() -> Result {
    let fs = Builder::new().uid(0).gid(0).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file_with("/f", b"top secret", 0o000, None)?;
    assert_eq!(read("/f")?, b"top secret");
    Ok(())
}

#[test]
fn root_override_is_switchable() -> Result {
    let mut builder = Builder::new();
    builder.uid(0).gid(0).os(Os::Linux).allow_root_user(false);
    let fs = builder.build();
    let _guard = fs.enter();

    fs.create_file_with("/f", b"x", 0o000, None)?;
    let err = File::open("/f").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);
    Ok(())
}

#[test]
fn sticky_directory_protects_other_users_files() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    veneer::create_dir("/shared")?;
    fs.chmod("/shared", 0o1777)?;

    fs.set_uid(2000);
    write("/shared/mine.txt", b"")?;

    // A third user cannot delete someone else's entry.
    fs.set_uid(3000);
    let err = remove_file("/shared/mine.txt").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::PermissionDenied);

    // The entry owner can.
    fs.set_uid(2000);
    remove_file("/shared/mine.txt")?;
    Ok(())
}

#[test]
fn chmod_is_owner_only() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/f", b"")?;
    fs.set_uid(2000);
    let err = fs.chmod("/f", 0o777).unwrap_err();
    assert_eq!(err.kind(), Fault::NotPermitted);
    assert_eq!(err.errno(), 1);
    Ok(())
}

#[test]
fn chown_rules_for_non_root() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/f", b"")?;
    // Giving the file away requires root.
    let err = fs.chown("/f", Some(2000), None).unwrap_err();
    assert_eq!(err.kind(), Fault::NotPermitted);

    // Changing the group to one of the caller's own groups is fine.
    fs.chown("/f", None, Some(1000))?;

    // Root can reassign freely.
    fs.set_uid(0);
    fs.chown("/f", Some(4000), Some(4000))?;
    assert_eq!(fs.stat("/f")?.uid, 4000);
    Ok(())
}

#[test]
fn access_probes_the_effective_identity() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file_with("/f", b"", 0o640, None)?;
    assert!(veneer::access("/f", 4)?);
    assert!(veneer::access("/f", 6)?);
    assert!(!veneer::access("/f", 1)?);
    assert!(veneer::access("/f", 0)?);
    assert!(!veneer::access("/missing", 0)?);

    fs.set_uid(2000);
    fs.set_gid(3000);
    assert!(!veneer::access("/f", 4)?);
    Ok(())
}

#[test]
fn reset_ids_restores_the_host_identity() -> Result {
    let fs = Builder::new().uid(4242).build();
    let _guard = fs.enter();

    fs.create_file("/f", b"")?;
    assert_eq!(fs.stat("/f")?.uid, 4242);
    fs.reset_ids();
    fs.create_file("/g", b"")?;
    assert_ne!(fs.stat("/g")?.uid, 4242);
    Ok(())
}

#[test]
fn windows_chmod_clamps_to_the_readonly_bit() -> Result {
    let fs = Builder::new().os(Os::Windows).uid(1000).build();
    let _guard = fs.enter();

    fs.create_file("C:\\f.txt", b"")?;
    fs.chmod("C:\\f.txt", 0o000)?;
    // Readability is preserved; only writability toggles.
    assert_eq!(fs.stat("C:\\f.txt")?.perm(), 0o444);

    fs.chmod("C:\\f.txt", 0o200)?;
    assert_eq!(fs.stat("C:\\f.txt")?.perm(), 0o666);
    Ok(())
}

#[test]
fn windows_unix_mode_allows_full_posix_chmod() -> Result {
    let mut builder = Builder::new();
    builder.os(Os::Windows).uid(1000).windows_unix_mode(true);
    let fs = builder.build();
    let _guard = fs.enter();

    fs.create_file("C:\\f.txt", b"")?;
    fs.chmod("C:\\f.txt", 0o123)?;
    assert_eq!(fs.stat("C:\\f.txt")?.perm(), 0o123);
    Ok(())
}
