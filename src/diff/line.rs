use super::HunkError;
use std::fmt;

/// Address of one line in a hunk.
///
/// Removed lines only have an old line number, added lines only a new one,
/// and context lines carry both. Two ids are the same line when both
/// coordinates match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId {
    pub old_line: Option<u32>,
    pub new_line: Option<u32>,
}

impl LineId {
    /// A removed line at `old_line` in the old version
    pub const fn removed(old_line: u32) -> Self {
        Self {
            old_line: Some(old_line),
            new_line: None,
        }
    }

    /// An added line at `new_line` in the new version
    pub const fn added(new_line: u32) -> Self {
        Self {
            old_line: None,
            new_line: Some(new_line),
        }
    }

    /// An unchanged line present in both versions
    pub const fn context(old_line: u32, new_line: u32) -> Self {
        Self {
            old_line: Some(old_line),
            new_line: Some(new_line),
        }
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.old_line, self.new_line) {
            (Some(old), None) => write!(f, "-{}", old),
            (None, Some(new)) => write!(f, "+{}", new),
            (Some(old), Some(new)) => write!(f, " {}:{}", old, new),
            (None, None) => write!(f, "?"),
        }
    }
}

/// What a diff line does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineKind {
    Added,
    Removed,
    Context,
}

impl LineKind {
    /// The groupable kind of this line, `None` for context
    pub const fn delta(self) -> Option<DeltaKind> {
        match self {
            LineKind::Added => Some(DeltaKind::Added),
            LineKind::Removed => Some(DeltaKind::Removed),
            LineKind::Context => None,
        }
    }
}

/// Kind of a changed line; only these can be selected into a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeltaKind {
    Added,
    Removed,
}

impl fmt::Display for DeltaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeltaKind::Added => write!(f, "added"),
            DeltaKind::Removed => write!(f, "removed"),
        }
    }
}

/// Classify a line by which coordinates it carries.
///
/// A line with both coordinates is [`LineKind::Context`], which is not an
/// error but can never be part of a group.
///
/// # Errors
///
/// Returns [`HunkError::InvalidLineId`] when neither coordinate is set.
pub fn classify_line(line: &LineId) -> Result<LineKind, HunkError> {
    match (line.old_line, line.new_line) {
        (None, None) => Err(HunkError::InvalidLineId),
        (Some(_), None) => Ok(LineKind::Removed),
        (None, Some(_)) => Ok(LineKind::Added),
        (Some(_), Some(_)) => Ok(LineKind::Context),
    }
}
