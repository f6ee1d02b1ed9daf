use crate::error::EmbexError;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Source file loaded fully into memory.
#[derive(Debug, Clone)]
pub struct Container {
    path: PathBuf,
    contents: Bytes,
}

impl Container {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read(path)
            .map_err(|err| EmbexError::ContainerRead(path.to_path_buf(), err))?;
        log::debug!("Loaded container {:?} ({} bytes)", path, contents.len());
        Ok(Self::from_bytes(path, contents))
    }
    pub fn from_bytes(path: &Path, contents: impl Into<Bytes>) -> Self {
        Self {
            path: path.to_path_buf(),
            contents: contents.into(),
        }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn len(&self) -> usize {
        self.contents.len()
    }
    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }
    pub fn bytes(&self) -> &[u8] {
        &self.contents
    }
    /// File stem used as the prefix of every sub-file name
    pub fn base_name(&self) -> String {
        base_name(&self.path)
    }
    pub fn slice(&self, range: CandidateRange) -> Result<Bytes, EmbexError> {
        if range.end() > self.len() {
            return Err(EmbexError::RangeOutOfBounds {
                start: range.start,
                length: range.length,
                len: self.len(),
            });
        }
        Ok(self.contents.slice(range.start..range.end()))
    }
}

pub(crate) fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| String::from("container"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateRange {
    pub start: usize,
    pub length: usize,
}

impl CandidateRange {
    /// Returns `None` for empty ranges or ranges running past `buf_len`
    pub fn new(start: usize, length: usize, buf_len: usize) -> Option<Self> {
        if length == 0 {
            return None;
        }
        match start.checked_add(length) {
            Some(end) if end <= buf_len => Some(Self { start, length }),
            _ => None,
        }
    }
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}
