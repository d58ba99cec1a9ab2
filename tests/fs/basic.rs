//! Basic file operation tests.

use std::io::{Read, Seek, SeekFrom, Write};
use veneer::shim::std::fs::{copy, read, read_to_string, write, File, OpenOptions};
use veneer::{Builder, Encoding, Newline, Os, Result};

#[test]
fn file_round_trip() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/test/file.txt", b"hello")?;
    assert_eq!(fs.stat("/test/file.txt")?.size, 5);

    let mut file = File::open("/test/file.txt")?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    assert_eq!(contents, "hello");

    let names: Vec<_> = veneer::shim::std::fs::read_dir("/test")?
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(names, ["file.txt"]);
    Ok(())
}

#[test]
fn write_then_read_convenience() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    veneer::create_dir("/data")?;
    write("/data/file.txt", b"hello world")?;
    assert_eq!(read("/data/file.txt")?, b"hello world");
    assert_eq!(read_to_string("/data/file.txt")?, "hello world");
    Ok(())
}

#[test]
fn cursor_advances_and_seeks() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"0123456789")?;
    let mut file = File::open("/f")?;

    let mut buf = [0u8; 4];
    file.read_exact(&mut buf)?;
    assert_eq!(&buf, b"0123");
    file.read_exact(&mut buf)?;
    assert_eq!(&buf, b"4567");

    assert_eq!(file.seek(SeekFrom::Start(2))?, 2);
    file.read_exact(&mut buf)?;
    assert_eq!(&buf, b"2345");

    assert_eq!(file.seek(SeekFrom::End(-3))?, 7);
    let mut rest = Vec::new();
    file.read_to_end(&mut rest)?;
    assert_eq!(rest, b"789");
    Ok(())
}

#[test]
fn read_past_end_is_empty() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"abc")?;
    let mut file = File::open("/f")?;
    file.seek(SeekFrom::Start(100))?;
    let mut buf = [0u8; 8];
    assert_eq!(file.read(&mut buf)?, 0);
    Ok(())
}

#[test]
fn overwrite_extends_past_end_with_zeros() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"abc")?;
    let mut file = OpenOptions::new().write(true).open("/f")?;
    file.seek(SeekFrom::Start(5))?;
    file.write_all(b"xy")?;
    drop(file);

    assert_eq!(read("/f")?, b"abc\0\0xy");
    Ok(())
}

#[test]
fn append_ignores_seeks() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/log", b"one")?;
    let mut file = OpenOptions::new().append(true).open("/log")?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(b"-two")?;
    file.seek(SeekFrom::Start(1))?;
    file.write_all(b"-three")?;
    drop(file);

    assert_eq!(read("/log")?, b"one-two-three");
    Ok(())
}

#[test]
fn truncate_on_open_discards_contents() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"long contents")?;
    let file = OpenOptions::new().write(true).truncate(true).open("/f")?;
    drop(file);
    assert_eq!(read("/f")?, b"");
    Ok(())
}

#[test]
fn set_len_truncates_and_extends() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"0123456789")?;
    let file = OpenOptions::new().write(true).open("/f")?;
    file.set_len(4)?;
    assert_eq!(file.metadata()?.len(), 4);
    file.set_len(8)?;
    drop(file);
    assert_eq!(read("/f")?, b"0123\0\0\0\0");
    Ok(())
}

#[test]
fn create_new_refuses_existing() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"x")?;
    let err = File::create_new("/f").unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists);
    Ok(())
}

#[test]
fn copy_carries_contents_and_permissions() -> Result {
    let fs = Builder::new().uid(1000).build();
    let _guard = fs.enter();

    fs.create_file_with("/src.txt", b"copy me", 0o640, None)?;
    let bytes = copy("/src.txt", "/dst.txt")?;
    assert_eq!(bytes, 7);
    assert_eq!(read("/dst.txt")?, b"copy me");
    assert_eq!(fs.stat("/dst.txt")?.perm(), 0o640);
    Ok(())
}

#[test]
fn try_clone_shares_the_cursor() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"abcdef")?;
    let mut first = File::open("/f")?;
    let mut second = first.try_clone()?;

    let mut buf = [0u8; 3];
    first.read_exact(&mut buf)?;
    assert_eq!(&buf, b"abc");
    second.read_exact(&mut buf)?;
    assert_eq!(&buf, b"def");
    Ok(())
}

#[test]
fn dev_null_swallows_writes() -> Result {
    let fs = Builder::new().os(Os::Linux).build();
    let _guard = fs.enter();

    let mut sink = OpenOptions::new().write(true).open("/dev/null")?;
    sink.write_all(b"discarded")?;
    drop(sink);

    assert_eq!(read("/dev/null")?, b"");
    Ok(())
}

#[test]
fn text_mode_translates_newlines_on_windows() -> Result {
    let fs = Builder::new().os(Os::Windows).build();
    let _guard = fs.enter();

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .text(Encoding::Utf8)
        .open("C:\\out.txt")?;
    file.write_text("a\nb\n")?;
    drop(file);

    // The stored bytes carry the platform terminator.
    assert_eq!(read("C:\\out.txt")?, b"a\r\nb\r\n");

    // Universal newlines fold it back on read.
    let mut file = OpenOptions::new()
        .read(true)
        .text(Encoding::Utf8)
        .open("C:\\out.txt")?;
    assert_eq!(file.read_text()?, "a\nb\n");
    Ok(())
}

#[test]
fn text_mode_fixed_newline_policies() -> Result {
    let fs = Builder::new().os(Os::Linux).build();
    let _guard = fs.enter();

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .text(Encoding::Utf8)
        .newline(Newline::CrLf)
        .open("/crlf.txt")?;
    file.write_text("x\ny")?;
    drop(file);
    assert_eq!(read("/crlf.txt")?, b"x\r\ny");

    let mut file = OpenOptions::new()
        .read(true)
        .text(Encoding::Utf8)
        .newline(Newline::Raw)
        .open("/crlf.txt")?;
    assert_eq!(file.read_text()?, "x\r\ny");
    Ok(())
}

#[test]
fn latin1_encoding_round_trip() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .text(Encoding::Latin1)
        .open("/cafe.txt")?;
    file.write_text("café")?;
    drop(file);

    // One byte per character in Latin-1.
    assert_eq!(read("/cafe.txt")?, vec![b'c', b'a', b'f', 0xe9]);

    let mut file = OpenOptions::new()
        .read(true)
        .text(Encoding::Latin1)
        .open("/cafe.txt")?;
    assert_eq!(file.read_text()?, "café");
    Ok(())
}

#[test]
fn phantom_size_file_rejects_io() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file_with_size("/huge.bin", 10_000_000)?;
    assert_eq!(fs.stat("/huge.bin")?.size, 10_000_000);

    let mut file = File::open("/huge.bin")?;
    let mut buf = [0u8; 16];
    let err = file.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    Ok(())
}

#[test]
fn truncate_by_path() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_file("/f", b"0123456789")?;
    veneer::truncate("/f", 4)?;
    assert_eq!(read("/f")?, b"0123");
    veneer::truncate("/f", 6)?;
    assert_eq!(read("/f")?, b"0123\0\0");
    Ok(())
}

#[test]
fn path_helpers_follow_the_profile() -> Result {
    let fs = Builder::new().os(Os::Windows).build();
    assert_eq!(fs.join("C:\\a", "b"), "C:\\a\\b");
    assert_eq!(fs.normpath("C:/x/./y/../z"), "C:\\x\\z");
    assert_eq!(
        fs.commonpath(&["C:\\logs\\app", "c:\\logs\\db"]),
        Some("C:\\logs".to_string())
    );

    let fs = Builder::new().os(Os::Linux).build();
    assert_eq!(fs.join("/a", "b"), "/a/b");
    assert_eq!(fs.commonpath(&["/a/b", "/a/c"]), Some("/a".to_string()));
    Ok(())
}

#[test]
fn relative_paths_resolve_against_the_fake_cwd() -> Result {
    let fs = Builder::new().build();
    let _guard = fs.enter();

    fs.create_dir("/work/project")?;
    fs.set_cwd("/work/project")?;
    write("notes.txt", b"relative")?;
    assert_eq!(read("/work/project/notes.txt")?, b"relative");
    assert_eq!(veneer::cwd(), "/work/project");
    Ok(())
}
