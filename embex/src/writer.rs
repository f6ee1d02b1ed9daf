use crate::{
    container::{CandidateRange, Container},
    error::EmbexError,
};
use std::{
    fs::{File, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf},
};

/// Naming convention of a recovered sub-file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubFileName<'a> {
    /// `{base}_{index}.{extension}`
    Numbered { extension: &'a str },
    /// `{base}_{name}.{extension}`
    Named { name: &'a str, extension: &'a str },
}

impl<'a> SubFileName<'a> {
    pub fn file_name(&self, base_name: &str, index: usize) -> String {
        match self {
            Self::Numbered { extension } => {
                format!("{}_{}.{}", base_name, index, extension)
            }
            Self::Named { name, extension } => {
                format!("{}_{}.{}", base_name, name, extension)
            }
        }
    }
}

/// Writes `range` of `container` to `output_dir/file_name`, or to the first
/// free `_1`, `_2`, ... sibling when that name is taken.
pub fn write(
    container: &Container,
    range: CandidateRange,
    output_dir: &Path,
    file_name: &str,
) -> anyhow::Result<PathBuf> {
    let contents = container.slice(range)?;
    std::fs::create_dir_all(output_dir)
        .map_err(|err| {
            EmbexError::SubFileWrite(output_dir.to_path_buf(), err)
        })?;

    let (path, mut file) = create_free(&output_dir.join(file_name))?;
    let written = file.write_all(&contents).and_then(|_| file.flush());
    drop(file);
    if let Err(err) = written {
        // leave nothing half-written behind
        let _ = std::fs::remove_file(&path);
        return Err(EmbexError::SubFileWrite(path, err).into());
    }
    log::info!(
        "Extracted {:#X}+{:#X} of {:?} to {:?}",
        range.start,
        range.length,
        container.path(),
        path
    );
    Ok(path)
}

fn create_free(path: &Path) -> Result<(PathBuf, File), EmbexError> {
    let mut n = 0;
    loop {
        let candidate = suffixed(path, n);
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => return Ok((candidate, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => n += 1,
            Err(err) => return Err(EmbexError::SubFileWrite(candidate, err)),
        }
    }
}

fn suffixed(path: &Path, n: usize) -> PathBuf {
    if n == 0 {
        return path.to_path_buf();
    }
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file_name = match path.extension() {
        Some(ext) => format!("{}_{}.{}", stem, n, ext.to_string_lossy()),
        None => format!("{}_{}", stem, n),
    };
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container() -> Container {
        Container::from_bytes(
            Path::new("in/archive.pak"),
            (0u8..=255).collect::<Vec<u8>>(),
        )
    }

    #[test]
    fn numbered_and_named_file_names() {
        assert_eq!(
            SubFileName::Numbered { extension: "bin" }.file_name("archive", 3),
            "archive_3.bin"
        );
        assert_eq!(
            SubFileName::Named {
                name: "tex",
                extension: "dds"
            }
            .file_name("archive", 1),
            "archive_tex.dds"
        );
    }

    #[test]
    fn writes_exact_range() {
        let dir = tempfile::tempdir().unwrap();
        let range = CandidateRange::new(16, 8, 256).unwrap();
        let path =
            write(&container(), range, dir.path(), "archive_1.bin").unwrap();
        assert_eq!(path, dir.path().join("archive_1.bin"));
        assert_eq!(
            std::fs::read(path).unwrap(),
            (16u8..24).collect::<Vec<u8>>()
        );
    }

    #[test]
    fn collisions_take_lowest_free_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let range = CandidateRange::new(0, 4, 256).unwrap();
        let c = container();
        let first = write(&c, range, dir.path(), "a.bin").unwrap();
        let second = write(&c, range, dir.path(), "a.bin").unwrap();
        let third = write(&c, range, dir.path(), "a.bin").unwrap();
        assert_eq!(first, dir.path().join("a.bin"));
        assert_eq!(second, dir.path().join("a_1.bin"));
        assert_eq!(third, dir.path().join("a_2.bin"));

        std::fs::remove_file(&second).unwrap();
        let refilled = write(&c, range, dir.path(), "a.bin").unwrap();
        assert_eq!(refilled, second);
        let next = write(&c, range, dir.path(), "a.bin").unwrap();
        assert_eq!(next, dir.path().join("a_3.bin"));
    }

    #[test]
    fn creates_missing_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested").join("archive");
        let range = CandidateRange::new(0, 1, 256).unwrap();
        let path = write(&container(), range, &out, "x.bin").unwrap();
        assert!(path.starts_with(&out));
    }

    #[test]
    fn out_of_bounds_range_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let range = CandidateRange {
            start: 250,
            length: 10,
        };
        assert!(write(&container(), range, dir.path(), "x.bin").is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
