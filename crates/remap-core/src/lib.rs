//! Identifier remapping engine for JVM class archives.
//!
//! This crate provides:
//! - `MappingTable`: declared class, field and method renamings
//! - `HierarchyGraph`: superclass/interface relations scanned from archives
//! - `NameResolver`: inheritance-aware lookups, usable as a `Remapper`
//! - `normalize_visibility`: force declared members public
//! - `run`: the archive pipeline (delta reconstruction, renaming, copying)

pub mod archive;
pub mod config;
pub mod hierarchy;
pub mod mapping;
pub mod pipeline;
pub mod resolver;
pub mod visibility;

pub use archive::{ArchiveEntry, ArchiveReader, ArchiveWriter, CLASS_SUFFIX};
pub use config::{PatchDescriptor, RemapConfig};
pub use hierarchy::{HierarchyGraph, HierarchyNode};
pub use mapping::{ClassMapping, MappingError, MappingLine, MappingTable};
pub use pipeline::{run, RunSummary};
pub use resolver::NameResolver;
pub use visibility::{normalize_visibility, to_public};
