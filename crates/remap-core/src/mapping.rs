//! Mapping table: user-declared renamings for classes, fields and methods.
//!
//! Line grammar (whitespace separated):
//!
//! ```text
//! CL: <fromClass> <toClass>
//! FD: <fromOwner>/<fromField> <toOwner>/<toField>
//! MD: <fromOwner>/<fromMethod> <fromDesc> <toOwner>/<toMethod> <toDesc>
//! ```
//!
//! Owner and member are split at the last `/`, so owners keep their package.
//! Only the source owner and the target *member* name matter; the target
//! owner and descriptor of `FD:`/`MD:` lines follow from the class mapping
//! and the descriptor remapping.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("mappings file doesn't exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to read mappings file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renamings declared for one original class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMapping {
    pub mapped_name: String,
    /// Original field name -> mapped field name.
    pub fields: HashMap<String, String>,
    /// (original method name, original descriptor) -> mapped method name.
    pub methods: HashMap<(String, String), String>,
}

impl ClassMapping {
    pub fn new(mapped_name: impl Into<String>) -> Self {
        Self {
            mapped_name: mapped_name.into(),
            fields: HashMap::new(),
            methods: HashMap::new(),
        }
    }
}

/// One parsed mapping line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingLine {
    Class {
        from: String,
        to: String,
    },
    Field {
        owner: String,
        name: String,
        to_owner: String,
        to_name: String,
    },
    Method {
        owner: String,
        name: String,
        descriptor: String,
        to_owner: String,
        to_name: String,
        to_descriptor: String,
    },
}

impl MappingLine {
    /// Parse a line. Returns `None` for blank lines, unknown prefixes and
    /// lines missing tokens or an owner separator.
    pub fn parse(line: &str) -> Option<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["CL:", from, to, ..] => Some(Self::Class {
                from: from.to_string(),
                to: to.to_string(),
            }),
            ["FD:", from, to, ..] => {
                let (owner, name) = split_member(from)?;
                let (to_owner, to_name) = split_member(to)?;
                Some(Self::Field {
                    owner,
                    name,
                    to_owner,
                    to_name,
                })
            }
            ["MD:", from, descriptor, to, to_descriptor, ..] => {
                let (owner, name) = split_member(from)?;
                let (to_owner, to_name) = split_member(to)?;
                Some(Self::Method {
                    owner,
                    name,
                    descriptor: descriptor.to_string(),
                    to_owner,
                    to_name,
                    to_descriptor: to_descriptor.to_string(),
                })
            }
            _ => None,
        }
    }
}

fn split_member(qualified: &str) -> Option<(String, String)> {
    qualified
        .rsplit_once('/')
        .map(|(owner, member)| (owner.to_string(), member.to_string()))
}

/// All class mappings plus the optional default package.
///
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    classes: HashMap<String, ClassMapping>,
    default_package: Option<String>,
}

impl MappingTable {
    pub fn new(default_package: Option<String>) -> Self {
        Self {
            classes: HashMap::new(),
            default_package,
        }
    }

    pub fn default_package(&self) -> Option<&str> {
        self.default_package.as_deref()
    }

    pub fn class(&self, name: &str) -> Option<&ClassMapping> {
        self.classes.get(name)
    }

    /// Number of classes with a mapping.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Insert or replace the mapping for `from`. A replaced mapping loses its
    /// field and method entries.
    pub fn add_class_mapping(&mut self, from: &str, to: &str) {
        self.classes.insert(from.to_string(), ClassMapping::new(to));
    }

    /// Returns `false` (and drops the entry) when `owner` has no class mapping.
    pub fn add_field_mapping(&mut self, owner: &str, name: &str, to_name: &str) -> bool {
        match self.classes.get_mut(owner) {
            Some(mapping) => {
                mapping.fields.insert(name.to_string(), to_name.to_string());
                true
            }
            None => {
                warn!(%owner, %name, "dropping field mapping: owner has no class mapping");
                false
            }
        }
    }

    /// Returns `false` (and drops the entry) when `owner` has no class mapping.
    pub fn add_method_mapping(
        &mut self,
        owner: &str,
        name: &str,
        descriptor: &str,
        to_name: &str,
    ) -> bool {
        match self.classes.get_mut(owner) {
            Some(mapping) => {
                mapping.methods.insert(
                    (name.to_string(), descriptor.to_string()),
                    to_name.to_string(),
                );
                true
            }
            None => {
                warn!(%owner, %name, %descriptor, "dropping method mapping: owner has no class mapping");
                false
            }
        }
    }

    /// Apply a parsed line; same return convention as the `add_*` operations.
    pub fn apply(&mut self, line: &MappingLine) -> bool {
        match line {
            MappingLine::Class { from, to } => {
                self.add_class_mapping(from, to);
                true
            }
            MappingLine::Field {
                owner,
                name,
                to_name,
                ..
            } => self.add_field_mapping(owner, name, to_name),
            MappingLine::Method {
                owner,
                name,
                descriptor,
                to_name,
                ..
            } => self.add_method_mapping(owner, name, descriptor, to_name),
        }
    }

    /// Parse and apply one line. Unrecognised lines are ignored.
    pub fn read_mapping_line(&mut self, line: &str) -> bool {
        match MappingLine::parse(line) {
            Some(parsed) => self.apply(&parsed),
            None => {
                if !line.trim().is_empty() {
                    debug!(%line, "ignoring mapping line");
                }
                false
            }
        }
    }

    /// Read every line of a mapping file; returns how many lines took effect.
    pub fn read_mapping_file(&mut self, path: &Path) -> Result<usize, MappingError> {
        let bytes = std::fs::read(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                MappingError::NotFound {
                    path: path.to_path_buf(),
                }
            } else {
                MappingError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        // stray non-UTF-8 bytes only damage the line they sit on
        let contents = String::from_utf8_lossy(&bytes);
        let applied = contents
            .lines()
            .filter(|line| self.read_mapping_line(line))
            .count();
        debug!(path = %path.display(), applied, "read mappings file");
        Ok(applied)
    }
}
