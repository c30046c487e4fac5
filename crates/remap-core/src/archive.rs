//! Zip archive access for the pipeline.

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use zip::result::ZipError;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const CLASS_SUFFIX: &str = ".class";

/// One archive member, read fully into memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
    pub is_dir: bool,
}

impl ArchiveEntry {
    pub fn is_class(&self) -> bool {
        !self.is_dir && self.name.ends_with(CLASS_SUFFIX)
    }
}

/// An open input or reference archive.
pub struct ArchiveReader {
    path: PathBuf,
    archive: ZipArchive<BufReader<File>>,
}

impl ArchiveReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open archive {}", path.display()))?;
        let archive = ZipArchive::new(BufReader::new(file))
            .with_context(|| format!("failed to read archive {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            archive,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Read the entry at `index` (archive order).
    pub fn entry(&mut self, index: usize) -> Result<ArchiveEntry> {
        let mut file = self.archive.by_index(index).with_context(|| {
            format!("failed to read entry #{} of {}", index, self.path.display())
        })?;
        let name = file.name().to_string();
        let is_dir = file.is_dir();
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .with_context(|| format!("failed to read {} from {}", name, self.path.display()))?;
        Ok(ArchiveEntry { name, data, is_dir })
    }

    /// Contents of the entry called `name`, if present.
    pub fn read_by_name(&mut self, name: &str) -> Result<Option<Vec<u8>>> {
        let mut file = match self.archive.by_name(name) {
            Ok(file) => file,
            Err(ZipError::FileNotFound) => return Ok(None),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("failed to look up {} in {}", name, self.path.display())
                })
            }
        };
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .with_context(|| format!("failed to read {} from {}", name, self.path.display()))?;
        Ok(Some(data))
    }
}

/// The output archive. Entries are appended in call order.
pub struct ArchiveWriter {
    writer: ZipWriter<File>,
    options: FileOptions,
}

impl ArchiveWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create archive {}", path.display()))?;
        Ok(Self::from_file(file))
    }

    /// Write into an already open (empty) file.
    pub fn from_file(file: File) -> Self {
        Self {
            writer: ZipWriter::new(file),
            options: FileOptions::default().compression_method(CompressionMethod::Deflated),
        }
    }

    pub fn write_file(&mut self, name: &str, data: &[u8]) -> Result<()> {
        self.writer
            .start_file(name, self.options)
            .with_context(|| format!("failed to start entry {}", name))?;
        self.writer
            .write_all(data)
            .with_context(|| format!("failed to write entry {}", name))?;
        Ok(())
    }

    pub fn add_directory(&mut self, name: &str) -> Result<()> {
        self.writer
            .add_directory(name, self.options)
            .with_context(|| format!("failed to add directory {}", name))?;
        Ok(())
    }

    /// Write the central directory and close the file.
    pub fn finish(mut self) -> Result<()> {
        let mut file = self
            .writer
            .finish()
            .context("failed to finalize archive")?;
        file.flush().context("failed to flush archive")?;
        Ok(())
    }
}
