//! Run configuration handed over by the command line.

use std::path::PathBuf;

/// Marks archive entries that are GDiff deltas against an original file:
/// `<prefix><original name><postfix>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub prefix: String,
    pub postfix: String,
}

impl PatchDescriptor {
    pub fn new(prefix: impl Into<String>, postfix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            postfix: postfix.into(),
        }
    }

    pub fn matches(&self, entry_name: &str) -> bool {
        entry_name.starts_with(&self.prefix) && entry_name.ends_with(&self.postfix)
    }

    /// Name of the file the delta applies to, or `None` if `entry_name` is
    /// not a delta. Prefix and postfix may not overlap.
    pub fn original_name<'n>(&self, entry_name: &'n str) -> Option<&'n str> {
        if !self.matches(entry_name) || entry_name.len() < self.prefix.len() + self.postfix.len() {
            return None;
        }
        Some(&entry_name[self.prefix.len()..entry_name.len() - self.postfix.len()])
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemapConfig {
    /// Processed in order; every entry ends up in the output.
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    /// Only contribute hierarchy and patch sources.
    pub references: Vec<PathBuf>,
    pub force_public: bool,
    pub patch: Option<PatchDescriptor>,
}

impl RemapConfig {
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            inputs,
            output: output.into(),
            references: Vec::new(),
            force_public: false,
            patch: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_name() {
        let patch = PatchDescriptor::new("patched_", ".bin");
        assert!(patch.matches("patched_a/B.class.bin"));
        assert_eq!(patch.original_name("patched_a/B.class.bin"), Some("a/B.class"));
        assert_eq!(patch.original_name("a/B.class"), None);
        // prefix and postfix overlap
        assert_eq!(PatchDescriptor::new("ab", "bc").original_name("abc"), None);
    }

    #[test]
    fn test_empty_descriptor_matches_everything() {
        let patch = PatchDescriptor::new("", "");
        assert_eq!(patch.original_name("a/B.class"), Some("a/B.class"));
    }
}
