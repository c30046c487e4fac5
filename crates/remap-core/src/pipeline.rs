//! The archive pipeline.
//!
//! 1. Open every reference and input archive once.
//! 2. Scan class headers (references first, then inputs) into the hierarchy.
//! 3. Stream every input entry in order: reconstruct deltas, rename classes,
//!    copy everything else.
//!
//! The output is assembled in a uniquely named temp file next to the
//! destination and persisted onto the output path only after the last entry
//! was written. A failed run drops the temp file and leaves every existing
//! file, the output included, untouched.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use remap_classfile::{apply_rename, ClassFile};
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::archive::{ArchiveEntry, ArchiveReader, ArchiveWriter, CLASS_SUFFIX};
use crate::config::{PatchDescriptor, RemapConfig};
use crate::hierarchy::HierarchyGraph;
use crate::mapping::MappingTable;
use crate::resolver::NameResolver;
use crate::visibility::normalize_visibility;

/// Appended to every delta before patching so a missing EOF command is tolerated.
const PATCH_EOF_MARKER: u8 = 0;

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Class entries rewritten.
    pub classes: usize,
    /// Class entries whose output name differs from their input name.
    pub renamed: usize,
    /// Non-class entries copied verbatim (directories included).
    pub copied: usize,
    /// Entries reconstructed from a delta.
    pub patched: usize,
}

/// Run the whole conversion described by `config`.
pub fn run(config: &RemapConfig, table: &MappingTable) -> Result<RunSummary> {
    let mut inputs = open_all(&config.inputs)?;
    let mut references = open_all(&config.references)?;

    let mut hierarchy = HierarchyGraph::new();
    for archive in references.iter_mut().chain(inputs.iter_mut()) {
        info!(path = %archive.path().display(), "reading hierarchy");
        hierarchy.scan_archive(archive)?;
    }
    let resolver = NameResolver::new(table, &hierarchy);

    let staging = staging_file(&config.output)?;
    let handle = staging
        .as_file()
        .try_clone()
        .context("failed to open staging file")?;
    let mut pipeline = Pipeline {
        config,
        resolver,
        inputs: &mut inputs,
        references: &mut references,
        summary: RunSummary::default(),
    };
    // on error `staging` is dropped here, which deletes the temp file
    let summary = pipeline.write_output(handle)?;
    staging
        .persist(&config.output)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to write {}", config.output.display()))?;

    info!(
        classes = summary.classes,
        renamed = summary.renamed,
        copied = summary.copied,
        patched = summary.patched,
        "conversion finished"
    );
    Ok(summary)
}

fn open_all(paths: &[PathBuf]) -> Result<Vec<ArchiveReader>> {
    paths.iter().map(|path| ArchiveReader::open(path)).collect()
}

/// Fresh temp file in the output's directory, so persisting it is a rename.
fn staging_file(output: &Path) -> Result<NamedTempFile> {
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    tempfile::Builder::new()
        .prefix(".jar-remapper-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("failed to create staging file in {}", dir.display()))
}

struct Pipeline<'r> {
    config: &'r RemapConfig,
    resolver: NameResolver<'r>,
    inputs: &'r mut Vec<ArchiveReader>,
    references: &'r mut Vec<ArchiveReader>,
    summary: RunSummary,
}

impl Pipeline<'_> {
    fn write_output(&mut self, staging: File) -> Result<RunSummary> {
        let config = self.config;
        let mut writer = ArchiveWriter::from_file(staging);

        for input in 0..self.inputs.len() {
            info!(path = %self.inputs[input].path().display(), "processing input file");
            for index in 0..self.inputs[input].len() {
                let entry = self.inputs[input].entry(index)?;
                let entry = match &config.patch {
                    Some(patch) if !entry.is_dir => self.reconstruct(patch, entry)?,
                    _ => entry,
                };
                self.write_entry(&mut writer, entry).with_context(|| {
                    format!("while processing {}", self.inputs[input].path().display())
                })?;
            }
        }

        writer.finish()?;
        Ok(self.summary)
    }

    /// Replace a delta entry by the file it reconstructs. Entries that are not
    /// deltas, or whose original cannot be found, pass through unchanged.
    fn reconstruct(&mut self, patch: &PatchDescriptor, entry: ArchiveEntry) -> Result<ArchiveEntry> {
        let Some(original_name) = patch.original_name(&entry.name) else {
            return Ok(entry);
        };

        let Some(original) = self.find_original(original_name)? else {
            debug!(entry = %entry.name, original = %original_name, "patching: no original found");
            return Ok(entry);
        };

        let mut delta = entry.data;
        delta.push(PATCH_EOF_MARKER);
        let data = remap_gdiff::patch(&original, &delta)
            .with_context(|| format!("failed to apply delta {}", entry.name))?;
        debug!(entry = %entry.name, original = %original_name, "patching");

        self.summary.patched += 1;
        Ok(ArchiveEntry {
            name: original_name.to_string(),
            data,
            is_dir: false,
        })
    }

    /// First archive holding `name`: inputs in order, then references.
    fn find_original(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        for archive in self.inputs.iter_mut().chain(self.references.iter_mut()) {
            if let Some(data) = archive.read_by_name(name)? {
                return Ok(Some(data));
            }
        }
        Ok(None)
    }

    fn write_entry(&mut self, writer: &mut ArchiveWriter, entry: ArchiveEntry) -> Result<()> {
        if entry.is_dir {
            debug!(entry = %entry.name, "copying directory");
            writer.add_directory(&entry.name)?;
            self.summary.copied += 1;
            return Ok(());
        }

        if !entry.is_class() {
            debug!(entry = %entry.name, "copying");
            writer.write_file(&entry.name, &entry.data)?;
            self.summary.copied += 1;
            return Ok(());
        }

        let (name, data) = self
            .remap_class(&entry.data)
            .with_context(|| format!("failed to remap {}", entry.name))?;
        if name != entry.name {
            debug!(entry = %entry.name, to = %name, "processing");
            self.summary.renamed += 1;
        } else {
            debug!(entry = %entry.name, "processing");
        }
        writer.write_file(&name, &data)?;
        self.summary.classes += 1;
        Ok(())
    }

    /// Rewrite one class; returns its output entry name and bytes.
    fn remap_class(&self, data: &[u8]) -> Result<(String, Vec<u8>)> {
        let class = ClassFile::parse(data)?;
        let mut renamed = apply_rename(&class, &self.resolver)?;
        if self.config.force_public {
            normalize_visibility(&mut renamed)?;
        }
        let name = format!("{}{}", renamed.name()?, CLASS_SUFFIX);
        Ok((name, renamed.to_bytes()?))
    }
}
