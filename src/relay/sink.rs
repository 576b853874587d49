//! Best-effort side channels for received device bytes.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    Overwrite,
    Append,
}

/// Raw capture of device output, no framing.
#[derive(Debug)]
pub struct SessionLog {
    path: PathBuf,
    file: File,
}

impl SessionLog {
    pub fn open(path: impl Into<PathBuf>, mode: LogMode) -> io::Result<Self> {
        let path = path.into();
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            LogMode::Overwrite => options.write(true).truncate(true),
            LogMode::Append => options.append(true),
        };
        let file = options.open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes)
    }
}

/// `[xx]` per byte, two lowercase hex digits, CRLF after the chunk.
pub fn hex_trace(bytes: &[u8]) -> Vec<u8> {
    let mut out = String::with_capacity(bytes.len() * 4 + 2);
    for byte in bytes {
        out.push_str(&format!("[{:02x}]", byte));
    }
    out.push_str("\r\n");
    out.into_bytes()
}
