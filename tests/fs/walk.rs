//! Tree traversal and glob tests.

use veneer::glob::glob;
use veneer::walk::walk;
use veneer::{Builder, Result};

fn sample_tree(fs: &veneer::FsHandle) {
    fs.create_file("/tree/three.txt", b"3").unwrap();
    fs.create_file("/tree/a/one.txt", b"1").unwrap();
    fs.create_file("/tree/a/b/two.txt", b"2").unwrap();
}

#[test]
fn topdown_walk_visits_parents_first() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();
    sample_tree(&fs);

    let visited: Vec<_> = walk("/tree")
        .map(|e| e.unwrap().dir.to_string_lossy().into_owned())
        .collect();
    assert_eq!(visited, ["/tree", "/tree/a", "/tree/a/b"]);
    Ok(())
}

#[test]
fn bottom_up_walk_visits_children_first() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();
    sample_tree(&fs);

    let visited: Vec<_> = walk("/tree")
        .bottom_up()
        .map(|e| e.unwrap().dir.to_string_lossy().into_owned())
        .collect();
    assert_eq!(visited, ["/tree/a/b", "/tree/a", "/tree"]);
    Ok(())
}

#[test]
fn walk_separates_dirs_from_files() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();
    sample_tree(&fs);

    let top = walk("/tree").next().unwrap()?;
    assert_eq!(top.files, ["three.txt"]);
    assert_eq!(top.dirs, ["a"]);
    Ok(())
}

#[test]
fn walk_lists_symlinked_dirs_without_descending() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/elsewhere/hidden.txt", b"")?;
    fs.create_dir("/tree")?;
    fs.create_symlink("/tree/portal", "/elsewhere")?;

    let entries: Vec<_> = walk("/tree").map(|e| e.unwrap()).collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].dirs, ["portal"]);

    let followed: Vec<_> = walk("/tree")
        .followlinks(true)
        .map(|e| e.unwrap())
        .collect();
    assert_eq!(followed.len(), 2);
    assert_eq!(followed[1].files, ["hidden.txt"]);
    Ok(())
}

#[test]
fn walk_surfaces_unreadable_directories_as_errors() -> Result {
    let fs = Builder::new().uid(1000).gid(1000).os(veneer::Os::Linux).build();
    let _guard = fs.enter();

    fs.create_file("/tree/locked/f.txt", b"")?;
    fs.chmod("/tree/locked", 0o000)?;

    let results: Vec<_> = walk("/tree").collect();
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    Ok(())
}

#[test]
fn glob_matches_by_extension() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/logs/app.log", b"")?;
    fs.create_file("/logs/app.txt", b"")?;
    fs.create_file("/logs/db.log", b"")?;

    let mut hits = glob("/logs/*.log");
    hits.sort();
    assert_eq!(hits, ["/logs/app.log", "/logs/db.log"]);
    Ok(())
}

#[test]
fn glob_question_mark_and_sets() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    for name in ["a1", "a2", "b1", "ab1"] {
        fs.create_file(format!("/d/{name}"), b"")?;
    }

    let mut hits = glob("/d/a?");
    hits.sort();
    assert_eq!(hits, ["/d/a1", "/d/a2"]);

    let mut hits = glob("/d/[ab]1");
    hits.sort();
    assert_eq!(hits, ["/d/a1", "/d/b1"]);
    Ok(())
}

#[test]
fn recursive_glob_spans_directories() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/src/main.rs", b"")?;
    fs.create_file("/src/util/helpers.rs", b"")?;
    fs.create_file("/src/util/notes.md", b"")?;

    let mut hits = glob("/src/**/*.rs");
    hits.sort();
    assert_eq!(hits, ["/src/main.rs", "/src/util/helpers.rs"]);
    Ok(())
}

#[test]
fn glob_hides_dotfiles_from_wildcards() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/d/.hidden", b"")?;
    fs.create_file("/d/shown", b"")?;

    assert_eq!(glob("/d/*"), ["/d/shown"]);
    assert_eq!(glob("/d/.h*"), ["/d/.hidden"]);
    Ok(())
}

#[test]
fn glob_literal_components_pass_through() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/a/b/c.txt", b"")?;
    assert_eq!(glob("/a/b/c.txt"), ["/a/b/c.txt"]);
    assert!(glob("/a/b/missing.txt").is_empty());
    Ok(())
}

#[test]
fn glob_relative_patterns_use_the_fake_cwd() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/work/x.dat", b"")?;
    fs.set_cwd("/work")?;
    assert_eq!(glob("*.dat"), ["/work/x.dat"]);
    Ok(())
}

#[test]
fn glob_folds_case_on_insensitive_profiles() -> Result {
    let fs = Builder::new().os(veneer::Os::Windows).build();
    let _guard = fs.enter();

    fs.create_file("C:\\Docs\\Report.TXT", b"")?;
    assert_eq!(glob("C:/Docs/*.txt"), ["C:\\Docs\\Report.TXT"]);
    Ok(())
}
