use super::sized_match;
use crate::{container::CandidateRange, scan::MagicPattern};

/// All non-overlapping instances of a single magic, in buffer order.
#[derive(Debug, Clone)]
pub struct RepeatingMagicScan<'a> {
    magic: &'a MagicPattern,
    buf: &'a [u8],
    cursor: usize,
    done: bool,
}

impl<'a> RepeatingMagicScan<'a> {
    pub fn new(magic: &'a MagicPattern, buf: &'a [u8]) -> Self {
        Self {
            magic,
            buf,
            cursor: 0,
            done: false,
        }
    }
}

impl<'a> Iterator for RepeatingMagicScan<'a> {
    type Item = CandidateRange;

    fn next(&mut self) -> Option<CandidateRange> {
        while !self.done {
            let next = self.magic.find_all(self.buf, self.cursor).next();
            let match_index = match next {
                Some(i) => i,
                None => {
                    self.done = true;
                    break;
                }
            };
            match sized_match(self.magic, self.buf, match_index) {
                Ok(range) => {
                    log::debug!(
                        "Magic match at {:#X}, size {:#X}",
                        range.start,
                        range.length
                    );
                    self.cursor = range.end();
                    return Some(range);
                }
                Err(reason) => {
                    log::debug!(
                        "Rejected magic match at {:#X}: {}",
                        match_index,
                        reason
                    );
                    self.cursor = match_index + 1;
                }
            }
        }
        None
    }
}
