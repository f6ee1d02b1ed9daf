use super::sized_match;
use crate::{container::CandidateRange, scan::MagicPattern};

/// Containers holding at most one instance of each of two sub-resource
/// kinds. Each magic is searched independently from the start of the buffer
/// and retired after its first valid match.
#[derive(Debug, Clone)]
pub struct DualMagicScan<'a> {
    magics: [&'a MagicPattern; 2],
    buf: &'a [u8],
    cursors: [usize; 2],
    found: [bool; 2],
    exhausted: [bool; 2],
}

impl<'a> DualMagicScan<'a> {
    pub fn new(
        first: &'a MagicPattern,
        second: &'a MagicPattern,
        buf: &'a [u8],
    ) -> Self {
        Self {
            magics: [first, second],
            buf,
            cursors: [0; 2],
            found: [false; 2],
            exhausted: [false; 2],
        }
    }
    fn is_finished(&self) -> bool {
        (0..2).all(|slot| self.found[slot] || self.exhausted[slot])
    }
    fn scan_slot(&mut self, slot: usize) -> Option<CandidateRange> {
        let magic = self.magics[slot];
        while let Some(match_index) =
            magic.find_all(self.buf, self.cursors[slot]).next()
        {
            match sized_match(magic, self.buf, match_index) {
                Ok(range) => {
                    self.cursors[slot] = range.end();
                    self.found[slot] = true;
                    return Some(range);
                }
                Err(reason) => {
                    log::debug!(
                        "Rejected magic {} match at {:#X}: {}",
                        slot,
                        match_index,
                        reason
                    );
                    self.cursors[slot] = match_index + 1;
                }
            }
        }
        self.exhausted[slot] = true;
        None
    }
}

impl<'a> Iterator for DualMagicScan<'a> {
    /// Index of the matching magic paired with its range
    type Item = (usize, CandidateRange);

    fn next(&mut self) -> Option<Self::Item> {
        for slot in 0..2 {
            if self.is_finished() {
                return None;
            }
            if self.found[slot] || self.exhausted[slot] {
                continue;
            }
            if let Some(range) = self.scan_slot(slot) {
                log::debug!(
                    "Magic {} match at {:#X}, size {:#X}",
                    slot,
                    range.start,
                    range.length
                );
                return Some((slot, range));
            }
        }
        None
    }
}
