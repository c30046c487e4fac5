//! Superclass / interface relationships scanned from archives.

use std::collections::HashMap;

use anyhow::{Context, Result};
use remap_classfile::ClassHeader;
use tracing::debug;

use crate::archive::ArchiveReader;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchyNode {
    /// Absent for root types.
    pub super_name: Option<String>,
    /// Declaration order.
    pub interfaces: Vec<String>,
}

/// Class name -> structural header. Populated by the scan phase, read-only
/// during resolution.
#[derive(Debug, Clone, Default)]
pub struct HierarchyGraph {
    nodes: HashMap<String, HierarchyNode>,
}

impl HierarchyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one class header. A later header for the same name replaces the
    /// earlier one.
    pub fn on_class_header(
        &mut self,
        name: impl Into<String>,
        super_name: Option<String>,
        interfaces: Vec<String>,
    ) {
        self.nodes.insert(
            name.into(),
            HierarchyNode {
                super_name,
                interfaces,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&HierarchyNode> {
        self.nodes.get(name)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Record the header of every class entry in `archive`; returns how many
    /// classes were seen.
    pub fn scan_archive(&mut self, archive: &mut ArchiveReader) -> Result<usize> {
        let mut classes = 0;
        for index in 0..archive.len() {
            let entry = archive.entry(index)?;
            if !entry.is_class() {
                continue;
            }
            let header = ClassHeader::parse(&entry.data).with_context(|| {
                format!(
                    "failed to parse class header of {} in {}",
                    entry.name,
                    archive.path().display()
                )
            })?;
            self.on_class_header(header.name, header.super_name, header.interfaces);
            classes += 1;
        }
        debug!(archive = %archive.path().display(), classes, "scanned hierarchy");
        Ok(classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_header_wins() {
        let mut graph = HierarchyGraph::new();
        graph.on_class_header("a/B", Some("a/Base".into()), vec!["a/I".into()]);
        graph.on_class_header("a/B", Some("a/Other".into()), vec![]);

        assert_eq!(graph.len(), 1);
        let node = graph.get("a/B").unwrap();
        assert_eq!(node.super_name.as_deref(), Some("a/Other"));
        assert!(node.interfaces.is_empty());
        assert!(graph.get("a/Base").is_none());
    }
}
