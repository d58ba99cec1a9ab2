//! Directory operation tests.

use veneer::shim::std::fs::{
    create_dir, create_dir_all, read, read_dir, remove_dir, remove_dir_all, remove_file, rename,
    write, DirBuilder,
};
use veneer::{Builder, Result};

fn listdir(path: &str) -> Vec<String> {
    read_dir(path)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn mkdir_requires_existing_parent() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    let err = create_dir("/a/b").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotFound);

    create_dir("/a")?;
    create_dir("/a/b")?;
    assert!(veneer::shim::std::fs::exists("/a/b"));
    Ok(())
}

#[test]
fn mkdir_refuses_existing() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    create_dir("/a")?;
    let err = create_dir("/a").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    Ok(())
}

#[test]
fn create_dir_all_builds_the_chain() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    create_dir_all("/x/y/z")?;
    assert!(veneer::shim::std::fs::metadata("/x/y/z")?.is_dir());
    // Existing prefixes are fine.
    create_dir_all("/x/y/z")?;
    Ok(())
}

#[test]
fn rmdir_only_removes_empty_directories() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    create_dir_all("/d/sub")?;
    let err = remove_dir("/d").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::DirectoryNotEmpty);

    remove_dir("/d/sub")?;
    remove_dir("/d")?;
    assert!(!veneer::shim::std::fs::exists("/d"));
    Ok(())
}

#[test]
fn remove_dir_all_clears_the_tree() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/top/a/one.txt", b"1")?;
    fs.create_file("/top/two.txt", b"2")?;
    fs.create_symlink("/top/link", "/elsewhere")?;

    remove_dir_all("/top")?;
    assert!(!veneer::shim::std::fs::exists("/top"));
    Ok(())
}

#[test]
fn listing_keeps_insertion_order() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::create_dir("/d")?;
    write("/d/banana", b"")?;
    write("/d/apple", b"")?;
    write("/d/cherry", b"")?;

    assert_eq!(listdir("/d"), ["banana", "apple", "cherry"]);
    Ok(())
}

#[test]
fn shuffled_listing_is_seed_deterministic() -> Result {
    let build = |seed| {
        let mut b = Builder::new();
        b.shuffle_listdir_results(true).rng_seed(seed);
        b.build()
    };

    let names = |fs: &veneer::FsHandle| {
        let _guard = fs.enter();
        veneer::create_dir("/d").unwrap();
        for name in ["a", "b", "c", "d", "e", "f"] {
            write(format!("/d/{name}"), b"").unwrap();
        }
        listdir("/d")
    };

    let first = names(&build(7));
    let second = names(&build(7));
    assert_eq!(first, second);

    let mut sorted = first.clone();
    sorted.sort();
    assert_eq!(sorted, ["a", "b", "c", "d", "e", "f"]);
    Ok(())
}

#[test]
fn rename_moves_between_directories() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/src/f.txt", b"payload")?;
    veneer::create_dir("/dst")?;

    let ino = fs.stat("/src/f.txt")?.ino;
    rename("/src/f.txt", "/dst/g.txt")?;

    assert!(!veneer::shim::std::fs::exists("/src/f.txt"));
    assert_eq!(read("/dst/g.txt")?, b"payload");
    assert_eq!(fs.stat("/dst/g.txt")?.ino, ino);
    Ok(())
}

#[test]
fn rename_replaces_files_on_posix() -> Result {
    let fs = Builder::new().os(veneer::Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/a", b"new")?;
    fs.create_file("/b", b"old")?;
    rename("/a", "/b")?;
    assert_eq!(read("/b")?, b"new");
    assert!(!veneer::shim::std::fs::exists("/a"));
    Ok(())
}

#[test]
fn rename_type_mismatches_fail() -> Result {
    let fs = Builder::new().os(veneer::Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/file", b"")?;
    veneer::create_dir("/dir")?;

    let err = rename("/file", "/dir").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::IsADirectory);

    let err = rename("/dir", "/file").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::NotADirectory);
    Ok(())
}

#[test]
fn rename_onto_populated_directory_fails() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::create_dir("/src")?;
    fs.create_file("/dst/keeper.txt", b"")?;

    let err = rename("/src", "/dst").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::DirectoryNotEmpty);
    Ok(())
}

#[test]
fn rename_into_own_subtree_fails() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::create_dir("/outer/inner")?;
    let err = rename("/outer", "/outer/inner/again").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    Ok(())
}

#[test]
fn rename_empty_directory_over_empty_directory() -> Result {
    let fs = Builder::new().os(veneer::Os::Linux).build();
    let _guard = fs.enter();

    veneer::create_dir("/src")?;
    veneer::create_dir("/dst")?;
    rename("/src", "/dst")?;
    assert!(!veneer::shim::std::fs::exists("/src"));
    assert!(veneer::shim::std::fs::metadata("/dst")?.is_dir());
    Ok(())
}

#[test]
fn dir_builder_recursive_with_mode() -> Result {
    let fs = Builder::new().uid(1000).build();
    let _guard = fs.enter();

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o750);
    }
    builder.create("/deep/nested/dir")?;
    assert!(veneer::shim::std::fs::metadata("/deep/nested/dir")?.is_dir());
    #[cfg(unix)]
    assert_eq!(fs.stat("/deep/nested/dir")?.perm(), 0o750 & !0o22);
    Ok(())
}

#[test]
fn unlink_refuses_directories() -> Result {
    let fs = Builder::new().os(veneer::Os::Linux).build();
    let _guard = fs.enter();

    veneer::create_dir("/d")?;
    let err = remove_file("/d").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::IsADirectory);
    Ok(())
}

#[test]
fn scandir_entries_expose_type_and_path() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/d/file", b"")?;
    veneer::create_dir("/d/sub")?;
    fs.create_symlink("/d/lnk", "/d/file")?;

    for entry in read_dir("/d")? {
        let entry = entry?;
        let ft = entry.file_type()?;
        match entry.file_name().to_string_lossy().as_ref() {
            "file" => assert!(ft.is_file()),
            "sub" => assert!(ft.is_dir()),
            "lnk" => assert!(ft.is_symlink()),
            other => panic!("unexpected entry {other}"),
        }
        assert!(entry.path().to_string_lossy().starts_with("/d/"));
    }
    Ok(())
}
