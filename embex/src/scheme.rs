use crate::{container, driver::Driver, error::EmbexError};
use anyhow::Context;
use serde::Deserialize;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

/// One container format: which files to pick up and how to carve them
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Scheme {
    pub name: String,
    /// Container file extensions, without the leading dot
    pub extensions: Vec<String>,
    #[serde(default)]
    pub recursive: bool,
    #[serde(default)]
    pub layout: OutputLayout,
    pub model: Driver,
}

/// Where sub-files of a container end up, relative to the container itself
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// Directory named after the container's file stem
    PerContainer,
    /// Shared directory next to the container
    Fixed(String),
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self::PerContainer
    }
}

impl OutputLayout {
    pub fn output_dir(&self, container_path: &Path) -> PathBuf {
        let parent = container_path.parent().unwrap_or_else(|| Path::new(""));
        match self {
            Self::PerContainer => {
                parent.join(container::base_name(container_path))
            }
            Self::Fixed(name) => parent.join(name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SchemeFile {
    schemes: Vec<Scheme>,
}

impl Scheme {
    pub fn validate(&self) -> Result<(), EmbexError> {
        let invalid = |reason: String| {
            EmbexError::InvalidScheme(self.name.clone(), reason)
        };
        if self.name.is_empty() {
            return Err(invalid(String::from("name is empty")));
        }
        if self.extensions.is_empty() {
            return Err(invalid(String::from("no input extensions")));
        }
        if let Some(ext) = self.extensions.iter().find(|ext| ext.is_empty()) {
            return Err(invalid(format!("invalid input extension {:?}", ext)));
        }
        if let OutputLayout::Fixed(dir) = &self.layout {
            if dir.is_empty() || dir.contains(&['/', '\\'][..]) || dir == ".."
            {
                return Err(invalid(format!(
                    "invalid output directory {:?}",
                    dir
                )));
            }
        }
        self.model.validate().map_err(invalid)
    }

    /// Case-insensitive match against the configured extensions
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|wanted| {
                        wanted.trim_start_matches('.').eq_ignore_ascii_case(ext)
                    })
            })
            .unwrap_or(false)
    }
}

pub fn parse(json: &str) -> anyhow::Result<Vec<Scheme>> {
    let file = serde_json::from_str::<SchemeFile>(json)
        .context("Malformed scheme file")?;
    let mut names = HashSet::new();
    for scheme in file.schemes.iter() {
        scheme.validate()?;
        if !names.insert(scheme.name.as_str()) {
            return Err(EmbexError::InvalidScheme(
                scheme.name.clone(),
                String::from("duplicate scheme name"),
            )
            .into());
        }
    }
    Ok(file.schemes)
}

pub fn load(path: &Path) -> anyhow::Result<Vec<Scheme>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Could not read scheme file {:?}", path))?;
    let schemes = parse(&json)
        .with_context(|| format!("In scheme file {:?}", path))?;
    log::debug!("Loaded {} schemes from {:?}", schemes.len(), path);
    Ok(schemes)
}

pub fn find<'a>(
    schemes: &'a [Scheme],
    name: &str,
) -> Result<&'a Scheme, EmbexError> {
    schemes
        .iter()
        .find(|scheme| scheme.name == name)
        .ok_or_else(|| EmbexError::UnknownScheme(name.to_string()))
}
