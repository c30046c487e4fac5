//! Inheritance-aware name resolution.
//!
//! Every lookup falls back to the input name. Field lookups walk the
//! superclass chain only; method lookups try the superclass chain first and
//! then each interface in declaration order, and the first hit wins.
//! Each call threads a visited set so cyclic hierarchies terminate.

use std::collections::HashSet;

use remap_classfile::Remapper;
use tracing::trace;

use crate::hierarchy::HierarchyGraph;
use crate::mapping::MappingTable;

#[derive(Debug, Clone, Copy)]
pub struct NameResolver<'a> {
    table: &'a MappingTable,
    hierarchy: &'a HierarchyGraph,
}

impl<'a> NameResolver<'a> {
    pub fn new(table: &'a MappingTable, hierarchy: &'a HierarchyGraph) -> Self {
        Self { table, hierarchy }
    }

    /// Mapped class name, then the default package for names without one.
    pub fn resolve_class(&self, name: &str) -> String {
        let mapped = self
            .table
            .class(name)
            .map(|mapping| mapping.mapped_name.as_str())
            .unwrap_or(name);
        match self.table.default_package() {
            Some(package) if !mapped.contains('/') => format!("{}/{}", package, mapped),
            _ => mapped.to_string(),
        }
    }

    pub fn resolve_field(&self, owner: &str, name: &str) -> String {
        let mut visited = HashSet::new();
        match self.find_field(owner, name, &mut visited) {
            Some(mapped) => mapped.to_string(),
            None => name.to_string(),
        }
    }

    pub fn resolve_method(&self, owner: &str, name: &str, descriptor: &str) -> String {
        let mut visited = HashSet::new();
        match self.find_method(owner, name, descriptor, &mut visited) {
            Some(mapped) => mapped.to_string(),
            None => name.to_string(),
        }
    }

    fn find_field<'s>(
        &'s self,
        owner: &'s str,
        name: &str,
        visited: &mut HashSet<&'s str>,
    ) -> Option<&'a str> {
        let mut current = owner;
        loop {
            if !visited.insert(current) {
                trace!(%owner, %name, revisited = %current, "hierarchy cycle");
                return None;
            }
            if let Some(mapped) = self
                .table
                .class(current)
                .and_then(|mapping| mapping.fields.get(name))
            {
                return Some(mapped.as_str());
            }
            current = self.hierarchy.get(current)?.super_name.as_deref()?;
        }
    }

    fn find_method<'s>(
        &'s self,
        owner: &'s str,
        name: &str,
        descriptor: &str,
        visited: &mut HashSet<&'s str>,
    ) -> Option<&'a str> {
        if !visited.insert(owner) {
            return None;
        }
        if let Some(mapped) = self.table.class(owner).and_then(|mapping| {
            mapping
                .methods
                .get(&(name.to_string(), descriptor.to_string()))
        }) {
            return Some(mapped.as_str());
        }

        let node = self.hierarchy.get(owner)?;
        if let Some(super_name) = node.super_name.as_deref() {
            if let Some(mapped) = self.find_method(super_name, name, descriptor, visited) {
                return Some(mapped);
            }
        }
        node.interfaces
            .iter()
            .find_map(|interface| self.find_method(interface, name, descriptor, visited))
    }
}

impl Remapper for NameResolver<'_> {
    fn map_class(&self, internal_name: &str) -> String {
        self.resolve_class(internal_name)
    }

    fn map_field_name(&self, owner: &str, name: &str, _descriptor: &str) -> String {
        self.resolve_field(owner, name)
    }

    fn map_method_name(&self, owner: &str, name: &str, descriptor: &str) -> String {
        self.resolve_method(owner, name, descriptor)
    }
}
