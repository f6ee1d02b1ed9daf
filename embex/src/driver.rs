use crate::{
    container::{CandidateRange, Container},
    model::{
        dual_magic::DualMagicScan, offset_table::OffsetTableScan,
        repeating_magic::RepeatingMagicScan,
    },
    scan::MagicPattern,
    table::RECORD_SIZE,
    writer::SubFileName,
};
use serde::Deserialize;
use std::fmt;

/// Per-format policy turning a container's bytes into candidate ranges
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Driver {
    DualMagic(DualMagic),
    RepeatingMagic(RepeatingMagic),
    OffsetTable(OffsetTable),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DualMagic {
    pub magics: [NamedMagic; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NamedMagic {
    pub pattern: MagicPattern,
    /// Fixed file name suffix of this sub-resource kind
    pub name: String,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RepeatingMagic {
    pub pattern: MagicPattern,
    pub extension: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OffsetTable {
    pub table_start: usize,
    #[serde(default = "default_stride")]
    pub stride: usize,
    pub extension: String,
}

fn default_stride() -> usize {
    RECORD_SIZE
}

/// One item of a driver scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scanned<'a> {
    Found {
        range: CandidateRange,
        name: SubFileName<'a>,
    },
    /// Entry that was located but cannot be extracted
    Invalid { index: usize, reason: String },
}

impl Driver {
    pub fn scan<'a>(&'a self, container: &'a Container) -> Candidates<'a> {
        let buf = container.bytes();
        match self {
            Self::DualMagic(dual) => Candidates::Dual(
                dual,
                DualMagicScan::new(
                    &dual.magics[0].pattern,
                    &dual.magics[1].pattern,
                    buf,
                ),
            ),
            Self::RepeatingMagic(rep) => Candidates::Repeating(
                &rep.extension,
                RepeatingMagicScan::new(&rep.pattern, buf),
            ),
            Self::OffsetTable(table) => Candidates::Table(
                &table.extension,
                OffsetTableScan::new(buf, table.table_start, table.stride),
            ),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::DualMagic(dual) => {
                for named in dual.magics.iter() {
                    validate_pattern(&named.pattern)?;
                    validate_extension(&named.extension)?;
                    if named.name.is_empty() {
                        return Err(String::from("sub-resource name is empty"));
                    }
                }
                if dual.magics[0].name == dual.magics[1].name
                    && dual.magics[0].extension == dual.magics[1].extension
                {
                    return Err(format!(
                        "both magics write to the same name: {}",
                        dual.magics[0].name
                    ));
                }
                Ok(())
            }
            Self::RepeatingMagic(rep) => {
                validate_pattern(&rep.pattern)?;
                validate_extension(&rep.extension)
            }
            Self::OffsetTable(table) => {
                if table.stride < RECORD_SIZE {
                    return Err(format!(
                        "stride {} is smaller than a {} byte record",
                        table.stride, RECORD_SIZE
                    ));
                }
                validate_extension(&table.extension)
            }
        }
    }
}

fn validate_pattern(pattern: &MagicPattern) -> Result<(), String> {
    if pattern.signature.is_empty() {
        return Err(String::from("magic is empty"));
    }
    if pattern.alignment == 0 {
        return Err(String::from("alignment must be at least 1"));
    }
    Ok(())
}

fn validate_extension(extension: &str) -> Result<(), String> {
    if extension.is_empty() || extension.contains(&['/', '\\', '.'][..]) {
        return Err(format!("invalid output extension {:?}", extension));
    }
    Ok(())
}

impl fmt::Display for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DualMagic(dual) => write!(
                f,
                "dual magic {} [{:X?}] / {} [{:X?}]",
                dual.magics[0].name,
                dual.magics[0].pattern.signature,
                dual.magics[1].name,
                dual.magics[1].pattern.signature
            ),
            Self::RepeatingMagic(rep) => {
                write!(
                    f,
                    "repeating magic [{:X?}] -> .{}",
                    rep.pattern.signature, rep.extension
                )
            }
            Self::OffsetTable(table) => write!(
                f,
                "offset table at {:#X}, stride {} -> .{}",
                table.table_start, table.stride, table.extension
            ),
        }
    }
}

/// Lazy scan result of a [`Driver`]
#[derive(Debug, Clone)]
pub enum Candidates<'a> {
    Dual(&'a DualMagic, DualMagicScan<'a>),
    Repeating(&'a str, RepeatingMagicScan<'a>),
    Table(&'a str, OffsetTableScan<'a>),
}

impl<'a> Iterator for Candidates<'a> {
    type Item = Scanned<'a>;

    fn next(&mut self) -> Option<Scanned<'a>> {
        match self {
            Self::Dual(dual, scan) => {
                let dual: &'a DualMagic = *dual;
                scan.next().map(|(slot, range)| {
                    let named = &dual.magics[slot];
                    Scanned::Found {
                        range,
                        name: SubFileName::Named {
                            name: &named.name,
                            extension: &named.extension,
                        },
                    }
                })
            }
            Self::Repeating(extension, scan) => {
                let extension: &'a str = *extension;
                scan.next().map(|range| Scanned::Found {
                    range,
                    name: SubFileName::Numbered { extension },
                })
            }
            Self::Table(extension, scan) => {
                let extension: &'a str = *extension;
                scan.next().map(|item| match item {
                    Ok(range) => Scanned::Found {
                        range,
                        name: SubFileName::Numbered { extension },
                    },
                    Err(invalid) => Scanned::Invalid {
                        index: invalid.index,
                        reason: format!(
                            "invalid table record (offset {:#X}, size {:#X})",
                            invalid.record.offset, invalid.record.size
                        ),
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn deserializes_every_model() {
        let drivers: Vec<Driver> = serde_json::from_str(
            r#"[
                {"type": "dual_magic", "magics": [
                    {"pattern": {"magic": "54455830", "size_offset": 4},
                     "name": "tex", "extension": "tex"},
                    {"pattern": {"magic": "534E4430", "size_offset": 4},
                     "name": "snd", "extension": "snd"}
                ]},
                {"type": "repeating_magic",
                 "pattern": {"magic": "0011223344556677", "size_offset": 8},
                 "extension": "bin"},
                {"type": "offset_table", "table_start": 16, "extension": "dat"}
            ]"#,
        )
        .unwrap();
        assert_eq!(drivers.len(), 3);
        assert!(drivers.iter().all(|d| d.validate().is_ok()));
        match &drivers[2] {
            Driver::OffsetTable(table) => assert_eq!(table.stride, 8),
            other => panic!("unexpected driver {:?}", other),
        }
    }

    #[test]
    fn dual_magic_needs_exactly_two_entries() {
        let res = serde_json::from_str::<Driver>(
            r#"{"type": "dual_magic", "magics": [
                {"pattern": {"magic": "AA", "size_offset": 1},
                 "name": "a", "extension": "a"}
            ]}"#,
        );
        assert!(res.is_err());
    }

    #[test]
    fn rejects_bad_configuration() {
        let table = Driver::OffsetTable(OffsetTable {
            table_start: 0,
            stride: 4,
            extension: String::from("bin"),
        });
        assert!(table.validate().is_err());
        let rep = Driver::RepeatingMagic(RepeatingMagic {
            pattern: MagicPattern::new(&[], 0),
            extension: String::from("bin"),
        });
        assert!(rep.validate().is_err());
        let rep = Driver::RepeatingMagic(RepeatingMagic {
            pattern: MagicPattern::new(b"AB", 2),
            extension: String::from("../x"),
        });
        assert!(rep.validate().is_err());
    }

    #[test]
    fn table_scan_reports_invalid_records() {
        let mut buf = vec![0u8; 32];
        buf[0..4].copy_from_slice(&16u32.to_le_bytes());
        buf[4..8].copy_from_slice(&4u32.to_le_bytes());
        buf[8..12].copy_from_slice(&30u32.to_le_bytes());
        buf[12..16].copy_from_slice(&4u32.to_le_bytes());
        let container = Container::from_bytes(Path::new("t.pak"), buf);
        let driver = Driver::OffsetTable(OffsetTable {
            table_start: 0,
            stride: 8,
            extension: String::from("bin"),
        });
        let items = driver.scan(&container).collect::<Vec<_>>();
        assert_eq!(
            items[0],
            Scanned::Found {
                range: CandidateRange { start: 16, length: 4 },
                name: SubFileName::Numbered { extension: "bin" }
            }
        );
        match &items[1] {
            Scanned::Invalid { index, .. } => assert_eq!(*index, 1),
            other => panic!("unexpected item {:?}", other),
        }
        assert_eq!(items.len(), 2);
    }
}
