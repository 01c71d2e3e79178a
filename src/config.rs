//! Per-session archive options.

use serde::{Deserialize, Serialize};

/// Options shared by the writer and the reader of one archive.
///
/// Both sides of a session must agree on `use_versions`: it changes what is on
/// the wire. `cut_all_pointers` only affects writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Write and read the per-type version tags emitted through
    /// [`OutputArchive::write_version`](crate::OutputArchive::write_version).
    pub use_versions: bool,
    /// Write every reference field as the null reference.
    pub cut_all_pointers: bool,
}

impl ArchiveConfig {
    /// Returns a copy with version tags enabled or disabled.
    pub fn with_versions(mut self, enabled: bool) -> Self {
        self.use_versions = enabled;
        self
    }

    /// Returns a copy that cuts (or keeps) every reference field.
    pub fn with_cut_all_pointers(mut self, enabled: bool) -> Self {
        self.cut_all_pointers = enabled;
        self
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            use_versions: true,
            cut_all_pointers: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_write_versions_and_keep_pointers() {
        let config = ArchiveConfig::default();
        assert!(config.use_versions);
        assert!(!config.cut_all_pointers);

        let tuned = config.with_versions(false).with_cut_all_pointers(true);
        assert!(!tuned.use_versions);
        assert!(tuned.cut_all_pointers);
    }
}
