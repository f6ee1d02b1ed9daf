use crate::{
    container::CandidateRange,
    table::{self, OffsetRecord, Records},
};

/// Offset table record that does not describe an extractable range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidRecord {
    pub index: usize,
    pub record: OffsetRecord,
}

/// Table-indexed containers: one range per valid record, in table order.
#[derive(Debug, Clone)]
pub struct OffsetTableScan<'a> {
    records: Records<'a>,
    buf_len: usize,
}

impl<'a> OffsetTableScan<'a> {
    pub fn new(buf: &'a [u8], table_start: usize, stride: usize) -> Self {
        Self {
            records: table::read_records(buf, table_start, stride),
            buf_len: buf.len(),
        }
    }
}

impl<'a> Iterator for OffsetTableScan<'a> {
    type Item = Result<CandidateRange, InvalidRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let (index, record) = self.records.next()?;
        Some(match record.range(self.buf_len) {
            Some(range) => Ok(range),
            None => {
                log::debug!(
                    "Skipping invalid table record {}: {:X?}",
                    index,
                    record
                );
                Err(InvalidRecord { index, record })
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(records: &[(u32, u32)], len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        for (i, (offset, size)) in records.iter().enumerate() {
            buf[i * 8..i * 8 + 4].copy_from_slice(&offset.to_le_bytes());
            buf[i * 8 + 4..i * 8 + 8].copy_from_slice(&size.to_le_bytes());
        }
        buf
    }

    #[test]
    fn valid_records_in_table_order() {
        let buf = container(
            &[(0x40, 0x10), (0x20, 0x20), (0, 0), (0x50, 8)],
            0x60,
        );
        let ranges = OffsetTableScan::new(&buf, 0, 8)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(
            ranges,
            vec![
                CandidateRange { start: 0x40, length: 0x10 },
                CandidateRange { start: 0x20, length: 0x20 }
            ]
        );
    }

    #[test]
    fn invalid_record_does_not_truncate_table() {
        let buf = container(
            &[(0x40, 0x10), (0x50, 0x100), (0, 4), (0x20, 8)],
            0x60,
        );
        let items = OffsetTableScan::new(&buf, 0, 8).collect::<Vec<_>>();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0], Ok(CandidateRange { start: 0x40, length: 0x10 }));
        assert_eq!(
            items[1],
            Err(InvalidRecord {
                index: 1,
                record: OffsetRecord { offset: 0x50, size: 0x100 }
            })
        );
        assert!(items[2].is_err());
        assert_eq!(items[3], Ok(CandidateRange { start: 0x20, length: 8 }));
    }

    #[test]
    fn table_start_offset_is_honoured() {
        let mut buf = vec![0xFFu8; 4];
        buf.extend(container(&[(0x10, 4), (0, 0)], 0x20));
        let ranges = OffsetTableScan::new(&buf, 4, 8).collect::<Vec<_>>();
        assert_eq!(ranges, vec![Ok(CandidateRange { start: 0x10, length: 4 })]);
    }
}
