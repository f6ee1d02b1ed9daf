use scroll::{Pread, LE};
use serde::{Deserialize, Deserializer};

/// Every index `i >= start` where `haystack[i..i + pattern.len()] == pattern`
pub fn find_all<'a>(
    haystack: &'a [u8],
    pattern: &'a [u8],
    start: usize,
) -> Matches<'a> {
    Matches {
        haystack,
        pattern,
        pos: start,
        ignore_ascii_case: false,
        alignment: 1,
    }
}

/// Lazy ascending sequence of pattern positions. Plain byte-for-byte
/// comparison at every candidate offset.
#[derive(Debug, Clone)]
pub struct Matches<'a> {
    haystack: &'a [u8],
    pattern: &'a [u8],
    pos: usize,
    ignore_ascii_case: bool,
    alignment: usize,
}

impl<'a> Matches<'a> {
    pub fn ignore_ascii_case(mut self, ignore: bool) -> Self {
        self.ignore_ascii_case = ignore;
        self
    }
    /// Only report matches starting at a multiple of `alignment`
    pub fn aligned(mut self, alignment: usize) -> Self {
        self.alignment = alignment.max(1);
        self
    }
    fn is_match_at(&self, i: usize) -> bool {
        let window = &self.haystack[i..i + self.pattern.len()];
        if self.ignore_ascii_case {
            window.eq_ignore_ascii_case(self.pattern)
        } else {
            window == self.pattern
        }
    }
}

impl<'a> Iterator for Matches<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.pattern.is_empty() {
            return None;
        }
        let last = self.haystack.len().checked_sub(self.pattern.len())?;
        while self.pos <= last {
            let rem = self.pos % self.alignment;
            if rem != 0 {
                self.pos = self.pos.checked_add(self.alignment - rem)?;
                continue;
            }
            let i = self.pos;
            self.pos += 1;
            if self.is_match_at(i) {
                return Some(i);
            }
        }
        None
    }
}

/// Signature of one embedded sub-file kind, followed by a little-endian
/// `u32` size field at `size_offset` bytes from the match start.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MagicPattern {
    #[serde(rename = "magic", deserialize_with = "from_hex")]
    pub signature: Vec<u8>,
    #[serde(rename = "size_offset")]
    pub size_field_offset: usize,
    #[serde(default)]
    pub ignore_ascii_case: bool,
    #[serde(default = "default_alignment")]
    pub alignment: usize,
}

fn default_alignment() -> usize {
    1
}

fn from_hex<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let compact = s.split_whitespace().collect::<String>();
    hex::decode(compact).map_err(serde::de::Error::custom)
}

impl MagicPattern {
    pub fn new(signature: &[u8], size_field_offset: usize) -> Self {
        Self {
            signature: signature.to_vec(),
            size_field_offset,
            ignore_ascii_case: false,
            alignment: 1,
        }
    }
    pub fn find_all<'a>(
        &'a self,
        haystack: &'a [u8],
        start: usize,
    ) -> Matches<'a> {
        find_all(haystack, &self.signature, start)
            .ignore_ascii_case(self.ignore_ascii_case)
            .aligned(self.alignment)
    }
    /// Size field belonging to the match at `match_index`, `None` when the
    /// four bytes would run past the end of `buf`
    pub fn read_size(&self, buf: &[u8], match_index: usize) -> Option<u32> {
        let off = match_index.checked_add(self.size_field_offset)?;
        buf.pread_with::<u32>(off, LE).ok()
    }
}
