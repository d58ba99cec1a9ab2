//! Open-file objects and the descriptor table.
//!
//! Descriptors are small integers allocated lowest-free, with 0/1/2
//! pre-reserved for the standard streams. `dup` maps a new descriptor onto
//! the same open-file object, sharing its cursor.

use crate::node::{Encoding, NodeId};
use indexmap::IndexMap;

/// Newline translation policy for text-mode opens.
///
/// `Universal` mirrors the host default: `\r\n` and `\r` read as `\n`, and
/// written `\n` becomes the profile's line separator. The fixed variants
/// write the named terminator and leave reads untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    #[default]
    Universal,
    /// No translation in either direction.
    Raw,
    Lf,
    Cr,
    CrLf,
}

/// Text-mode parameters attached to an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TextMode {
    pub encoding: Encoding,
    pub newline: Newline,
}

/// One open-file object, possibly shared by several descriptors.
#[derive(Debug, Clone)]
pub(crate) struct OpenFile {
    pub node: NodeId,
    /// Cursor offset in bytes.
    pub pos: u64,
    pub readable: bool,
    pub writable: bool,
    /// Append mode forces the cursor to EOF before every write.
    pub append: bool,
    pub text: Option<TextMode>,
    /// Set by writes, cleared by flush; flush settles timestamps.
    pub pending_write: bool,
    refs: u32,
}

impl OpenFile {
    pub(crate) fn new(
        node: NodeId,
        readable: bool,
        writable: bool,
        append: bool,
        text: Option<TextMode>,
    ) -> OpenFile {
        OpenFile {
            node,
            pos: 0,
            readable,
            writable,
            append,
            text,
            pending_write: false,
            refs: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// Standard streams; never handed out.
    Reserved,
    Free,
    Open(u64),
}

/// The descriptor table of one filesystem instance.
#[derive(Debug, Clone)]
pub(crate) struct FdTable {
    slots: Vec<Slot>,
    objects: IndexMap<u64, OpenFile>,
    next_obj: u64,
}

impl FdTable {
    pub(crate) fn new() -> FdTable {
        FdTable {
            slots: vec![Slot::Reserved; 3],
            objects: IndexMap::new(),
            next_obj: 0,
        }
    }

    /// Register an open-file object under the smallest unused descriptor.
    pub(crate) fn alloc(&mut self, file: OpenFile) -> i32 {
        let obj = self.next_obj;
        self.next_obj += 1;
        self.objects.insert(obj, file);

        for (fd, slot) in self.slots.iter_mut().enumerate() {
            if *slot == Slot::Free {
                *slot = Slot::Open(obj);
                return fd as i32;
            }
        }
        self.slots.push(Slot::Open(obj));
        (self.slots.len() - 1) as i32
    }

    fn obj_id(&self, fd: i32) -> Option<u64> {
        if fd < 0 {
            return None;
        }
        match self.slots.get(fd as usize) {
            Some(Slot::Open(obj)) => Some(*obj),
            _ => None,
        }
    }

    pub(crate) fn get(&self, fd: i32) -> Option<&OpenFile> {
        self.obj_id(fd).and_then(|obj| self.objects.get(&obj))
    }

    pub(crate) fn get_mut(&mut self, fd: i32) -> Option<&mut OpenFile> {
        let obj = self.obj_id(fd)?;
        self.objects.get_mut(&obj)
    }

    /// Duplicate a descriptor onto the same open-file object.
    pub(crate) fn dup(&mut self, fd: i32) -> Option<i32> {
        let obj = self.obj_id(fd)?;
        self.objects.get_mut(&obj)?.refs += 1;
        for (new_fd, slot) in self.slots.iter_mut().enumerate() {
            if *slot == Slot::Free {
                *slot = Slot::Open(obj);
                return Some(new_fd as i32);
            }
        }
        self.slots.push(Slot::Open(obj));
        Some((self.slots.len() - 1) as i32)
    }

    /// Release a descriptor. Returns the target node and whether this was
    /// the last descriptor on the shared object.
    pub(crate) fn close(&mut self, fd: i32) -> Option<(NodeId, bool)> {
        let obj = self.obj_id(fd)?;
        self.slots[fd as usize] = Slot::Free;
        let file = self.objects.get_mut(&obj)?;
        file.refs -= 1;
        let node = file.node;
        let last = file.refs == 0;
        if last {
            self.objects.swap_remove(&obj);
        }
        Some((node, last))
    }
}

/// Decode bytes under a text encoding; `None` marks undecodable input.
pub(crate) fn decode_text(encoding: Encoding, bytes: &[u8]) -> Option<String> {
    match encoding {
        Encoding::Utf8 => String::from_utf8(bytes.to_vec()).ok(),
        Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Encode text under a text encoding; `None` marks unencodable characters.
pub(crate) fn encode_text(encoding: Encoding, text: &str) -> Option<Vec<u8>> {
    match encoding {
        Encoding::Utf8 => Some(text.as_bytes().to_vec()),
        Encoding::Latin1 => text
            .chars()
            .map(|c| {
                let v = c as u32;
                (v <= 0xff).then_some(v as u8)
            })
            .collect(),
    }
}

/// Apply the read-side newline translation.
pub(crate) fn translate_read(newline: Newline, text: &str) -> String {
    match newline {
        Newline::Universal => text.replace("\r\n", "\n").replace('\r', "\n"),
        _ => text.to_string(),
    }
}

/// Apply the write-side newline translation.
pub(crate) fn translate_write(newline: Newline, windows: bool, text: &str) -> String {
    match newline {
        Newline::Universal => {
            if windows {
                text.replace('\n', "\r\n")
            } else {
                text.to_string()
            }
        }
        Newline::Raw | Newline::Lf => text.to_string(),
        Newline::Cr => text.replace('\n', "\r"),
        Newline::CrLf => text.replace('\n', "\r\n"),
    }
}
