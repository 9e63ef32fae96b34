use super::file::{DiffHunk, FileDiff};
use super::header::HunkHeader;

/// How a path changed in the working tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeStatus {
    Addition,
    Deletion,
    Modification,
    Rename { previous_path_bytes: Vec<u8> },
    Submodule,
}

/// A changed path as reported by the VCS
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeChange {
    pub path: String,
    /// Raw path as stored by git; may differ from `path` for non-UTF-8 names
    pub path_bytes: Vec<u8>,
    pub status: ChangeStatus,
}

impl TreeChange {
    pub fn new(path: impl Into<String>, status: ChangeStatus) -> Self {
        let path = path.into();
        Self {
            path_bytes: path.as_bytes().to_vec(),
            path,
            status,
        }
    }

    pub fn previous_path_bytes(&self) -> Option<&[u8]> {
        match &self.status {
            ChangeStatus::Rename {
                previous_path_bytes,
            } => Some(previous_path_bytes),
            _ => None,
        }
    }

    pub fn is_submodule(&self) -> bool {
        self.status == ChangeStatus::Submodule
    }
}

/// The diff of one tree change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifiedDiff {
    Patch { hunks: Vec<DiffHunk> },
    Binary,
    TooLarge,
}

impl UnifiedDiff {
    /// Hunks of a patch; other diffs have none
    pub fn hunks(&self) -> &[DiffHunk] {
        match self {
            UnifiedDiff::Patch { hunks } => hunks,
            UnifiedDiff::Binary | UnifiedDiff::TooLarge => &[],
        }
    }

    /// The hunk whose header equals `header` exactly
    pub fn find_hunk(&self, header: &HunkHeader) -> Option<&DiffHunk> {
        self.hunks().iter().find(|hunk| hunk.header == *header)
    }
}

impl From<&FileDiff> for UnifiedDiff {
    /// A file section without hunks (binary content or mode-only change)
    /// has nothing to select lines from.
    fn from(file: &FileDiff) -> Self {
        if file.hunks.is_empty() {
            UnifiedDiff::Binary
        } else {
            UnifiedDiff::Patch {
                hunks: file.hunks.clone(),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn rename_carries_previous_path() {
        let change = TreeChange::new(
            "new.txt",
            ChangeStatus::Rename {
                previous_path_bytes: b"old.txt".to_vec(),
            },
        );
        assert_eq!(change.path_bytes, b"new.txt".to_vec());
        assert_eq!(change.previous_path_bytes(), Some(&b"old.txt"[..]));
        assert_eq!(
            TreeChange::new("a", ChangeStatus::Modification).previous_path_bytes(),
            None
        );
    }

    #[test]
    fn hunkless_file_is_binary() {
        let file = FileDiff {
            path: "logo.png".to_string(),
            hunks: vec![],
        };
        assert_eq!(UnifiedDiff::from(&file), UnifiedDiff::Binary);
        assert!(UnifiedDiff::Binary.find_hunk(&HunkHeader::default()).is_none());
    }

    #[test]
    fn patch_finds_exact_header_only() {
        let hunk = DiffHunk::parse("@@ -1 +1 @@\n-a\n+b\n").unwrap();
        let diff = UnifiedDiff::Patch {
            hunks: vec![hunk.clone()],
        };
        assert_eq!(diff.find_hunk(&HunkHeader::new(1, 1, 1, 1)), Some(&hunk));
        assert_eq!(diff.find_hunk(&HunkHeader::new(1, 1, 1, 2)), None);
    }
}
