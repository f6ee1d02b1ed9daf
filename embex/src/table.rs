use crate::container::CandidateRange;
use scroll::{Pread, LE};

pub const RECORD_SIZE: usize = 8;

/// One `(offset, size)` entry of an offset table
#[derive(Debug, Pread, Copy, Clone, PartialEq, Eq)]
pub struct OffsetRecord {
    pub offset: u32,
    pub size: u32,
}

impl OffsetRecord {
    pub fn is_sentinel(&self) -> bool {
        self.offset == 0 && self.size == 0
    }
    /// Byte range described by this record, if it is extractable from a
    /// buffer of `buf_len` bytes
    pub fn range(&self, buf_len: usize) -> Option<CandidateRange> {
        if self.offset == 0 {
            return None;
        }
        CandidateRange::new(self.offset as usize, self.size as usize, buf_len)
    }
}

/// Records read at `stride` byte steps starting at `start_offset`. Ends at
/// the first sentinel or once fewer than `stride` bytes remain.
pub fn read_records(
    buf: &[u8],
    start_offset: usize,
    stride: usize,
) -> Records<'_> {
    Records {
        buf,
        pos: start_offset,
        stride: stride.max(RECORD_SIZE),
        index: 0,
        done: false,
    }
}

#[derive(Debug, Clone)]
pub struct Records<'a> {
    buf: &'a [u8],
    pos: usize,
    stride: usize,
    index: usize,
    done: bool,
}

impl<'a> Iterator for Records<'a> {
    /// Table position paired with the record
    type Item = (usize, OffsetRecord);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let end = self.pos.checked_add(self.stride);
        if end.map_or(true, |end| end > self.buf.len()) {
            self.done = true;
            return None;
        }
        let record = match self.buf.pread_with::<OffsetRecord>(self.pos, LE) {
            Ok(record) => record,
            Err(_) => {
                self.done = true;
                return None;
            }
        };
        if record.is_sentinel() {
            log::debug!("Offset table sentinel at {:#X}", self.pos);
            self.done = true;
            return None;
        }
        let index = self.index;
        self.pos += self.stride;
        self.index += 1;
        Some((index, record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(records: &[(u32, u32)]) -> Vec<u8> {
        records
            .iter()
            .flat_map(|(offset, size)| {
                offset
                    .to_le_bytes()
                    .iter()
                    .chain(size.to_le_bytes().iter())
                    .copied()
                    .collect::<Vec<u8>>()
            })
            .collect()
    }

    #[test]
    fn stops_at_sentinel() {
        let mut buf =
            table(&[(0x40, 4), (0x44, 8), (0x4C, 2), (0, 0), (0x50, 1)]);
        buf.resize(0x60, 0xAA);
        let records = read_records(&buf, 0, 8).collect::<Vec<_>>();
        assert_eq!(records.len(), 3);
        assert_eq!(records[2], (2, OffsetRecord { offset: 0x4C, size: 2 }));
    }

    #[test]
    fn stops_when_buffer_exhausted() {
        let mut buf = table(&[(1, 1), (2, 2)]);
        buf.extend_from_slice(&[9, 9, 9, 9]);
        assert_eq!(read_records(&buf, 0, 8).count(), 2);
        assert_eq!(read_records(&buf, 100, 8).count(), 0);
    }

    #[test]
    fn wide_stride_skips_padding() {
        let mut buf = vec![0xFF; 4];
        buf.extend(table(&[(3, 1)]));
        buf.extend_from_slice(&[0xEE; 4]);
        buf.extend(table(&[(5, 1)]));
        buf.extend_from_slice(&[0xEE; 4]);
        let records = read_records(&buf, 4, 12)
            .map(|(_, r)| r)
            .collect::<Vec<_>>();
        assert_eq!(
            records,
            vec![
                OffsetRecord { offset: 3, size: 1 },
                OffsetRecord { offset: 5, size: 1 }
            ]
        );
    }

    #[test]
    fn record_validity() {
        let len = 100;
        assert!(OffsetRecord { offset: 0, size: 10 }.range(len).is_none());
        assert!(OffsetRecord { offset: 10, size: 0 }.range(len).is_none());
        assert!(OffsetRecord { offset: 90, size: 11 }.range(len).is_none());
        assert_eq!(
            OffsetRecord { offset: 90, size: 10 }.range(len),
            Some(CandidateRange { start: 90, length: 10 })
        );
    }
}
