use crate::diff::{DiffHunk, HunkError, HunkHeader, LineId, ParsedDiff, StackId, TreeChange};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// State of a checkbox that may stand for many children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    #[default]
    Unchecked,
    Checked,
    Indeterminate,
}

impl CheckStatus {
    /// Fold child statuses into the status of their container.
    ///
    /// All checked is checked, all unchecked is unchecked, anything else is
    /// indeterminate. A container without children is unchecked.
    pub fn aggregate(children: impl IntoIterator<Item = CheckStatus>) -> CheckStatus {
        let mut children = children.into_iter();
        let Some(first) = children.next() else {
            return CheckStatus::Unchecked;
        };
        if first == CheckStatus::Indeterminate || children.any(|status| status != first) {
            CheckStatus::Indeterminate
        } else {
            first
        }
    }
}

impl FromIterator<CheckStatus> for CheckStatus {
    fn from_iter<I: IntoIterator<Item = CheckStatus>>(iter: I) -> Self {
        CheckStatus::aggregate(iter)
    }
}

/// Which part of a hunk is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HunkSelection {
    /// Every line of the hunk
    All,
    /// A non-empty proper subset of the hunk's changed lines
    Lines(BTreeSet<LineId>),
}

impl HunkSelection {
    /// Union of two selections of the same hunk; `All` absorbs anything
    pub fn merge(self, other: HunkSelection) -> HunkSelection {
        match (self, other) {
            (HunkSelection::Lines(mut lines), HunkSelection::Lines(more)) => {
                lines.extend(more);
                HunkSelection::Lines(lines)
            }
            _ => HunkSelection::All,
        }
    }
}

/// Identity of a hunk assigned to a stack (or unassigned)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HunkKey {
    pub stack_id: Option<StackId>,
    pub path: String,
    pub header: HunkHeader,
}

impl HunkKey {
    pub fn new(stack_id: Option<StackId>, path: impl Into<String>, header: HunkHeader) -> Self {
        Self {
            stack_id,
            path: path.into(),
            header,
        }
    }
}

impl fmt::Display for HunkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stack_id {
            Some(stack) => write!(f, "{}::{}::{}", stack, self.path, self.header),
            None => write!(f, "unassigned::{}::{}", self.path, self.header),
        }
    }
}

/// A live hunk of the working tree and the stack that owns it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkAssignment {
    pub stack_id: Option<StackId>,
    pub path: String,
    pub header: HunkHeader,
    /// Changed lines of the hunk in diff order
    pub lines: Vec<LineId>,
}

impl HunkAssignment {
    /// Assign `hunk` of `path` to `stack_id`, enumerating its changed lines.
    ///
    /// # Errors
    ///
    /// Returns [`HunkError::MalformedDiff`] if the hunk text cannot be parsed.
    pub fn from_hunk(
        stack_id: Option<StackId>,
        path: impl Into<String>,
        hunk: &DiffHunk,
    ) -> Result<Self, HunkError> {
        let parsed = ParsedDiff::parse(&hunk.diff)?;
        Ok(Self {
            stack_id,
            path: path.into(),
            header: hunk.header,
            lines: parsed.changed_lines().map(|line| line.id).collect(),
        })
    }

    pub fn key(&self) -> HunkKey {
        HunkKey::new(self.stack_id.clone(), self.path.clone(), self.header)
    }

    /// True if `line` is one of this hunk's changed lines
    pub fn contains(&self, line: &LineId) -> bool {
        self.lines.contains(line)
    }
}

/// `path` lies below the folder `prefix`; git paths always use `/`
pub(crate) fn in_folder(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    prefix.is_empty()
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Everything the store knows, readable without mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub(crate) changes: BTreeMap<String, TreeChange>,
    pub(crate) assignments: BTreeMap<HunkKey, HunkAssignment>,
    pub(crate) selections: BTreeMap<HunkKey, HunkSelection>,
}

impl SelectionState {
    pub fn change(&self, path: &str) -> Option<&TreeChange> {
        self.changes.get(path)
    }

    pub fn assignment(&self, key: &HunkKey) -> Option<&HunkAssignment> {
        self.assignments.get(key)
    }

    /// Assignments of one stack (`None` for unassigned hunks), in key order
    pub fn assignments_for<'a>(
        &'a self,
        stack: Option<&'a StackId>,
    ) -> impl Iterator<Item = &'a HunkAssignment> + 'a {
        self.assignments
            .values()
            .filter(move |assignment| assignment.stack_id.as_ref() == stack)
    }

    /// Changes of the working tree touched by `stack`'s assignments
    pub fn changes_for(&self, stack: Option<&StackId>) -> Vec<&TreeChange> {
        let paths: BTreeSet<&str> = self
            .assignments_for(stack)
            .map(|assignment| assignment.path.as_str())
            .collect();
        paths.into_iter().filter_map(|path| self.change(path)).collect()
    }

    pub fn selection(&self, key: &HunkKey) -> Option<&HunkSelection> {
        self.selections.get(key)
    }

    pub fn hunk_status(&self, key: &HunkKey) -> CheckStatus {
        match self.selections.get(key) {
            None => CheckStatus::Unchecked,
            Some(HunkSelection::All) => CheckStatus::Checked,
            Some(HunkSelection::Lines(_)) => CheckStatus::Indeterminate,
        }
    }

    fn status_of<'a>(
        &'a self,
        assignments: impl Iterator<Item = &'a HunkAssignment>,
    ) -> CheckStatus {
        assignments
            .map(|assignment| self.hunk_status(&assignment.key()))
            .collect()
    }

    pub fn file_status(&self, stack: Option<&StackId>, path: &str) -> CheckStatus {
        self.status_of(
            self.assignments_for(stack)
                .filter(|assignment| assignment.path == path),
        )
    }

    /// Status of every file below `prefix` (`a/b` covers `a/b/c.txt`, not `a/bc.txt`)
    pub fn folder_status(&self, stack: Option<&StackId>, prefix: &str) -> CheckStatus {
        self.status_of(
            self.assignments_for(stack)
                .filter(|assignment| in_folder(&assignment.path, prefix)),
        )
    }

    pub fn stack_status(&self, stack: Option<&StackId>) -> CheckStatus {
        self.status_of(self.assignments_for(stack))
    }

    /// Selections to commit from `stack`.
    ///
    /// A named stack also commits the unassigned selections, which follow
    /// its own.
    pub fn selections_for<'a>(
        &'a self,
        stack: Option<&'a StackId>,
    ) -> Vec<(&'a HunkKey, &'a HunkSelection)> {
        let mut selections: Vec<_> = self.selections_of(stack).collect();
        if stack.is_some() {
            selections.extend(self.selections_of(None));
        }
        selections
    }

    fn selections_of<'a>(
        &'a self,
        owner: Option<&'a StackId>,
    ) -> impl Iterator<Item = (&'a HunkKey, &'a HunkSelection)> + 'a {
        self.selections
            .iter()
            .filter(move |(key, _)| key.stack_id.as_ref() == owner)
    }

    /// Paths with at least one selection to commit from `stack`, sorted
    pub fn selected_paths<'a>(&'a self, stack: Option<&'a StackId>) -> Vec<&'a str> {
        let paths: BTreeSet<&str> = self
            .selections_for(stack)
            .into_iter()
            .map(|(key, _)| key.path.as_str())
            .collect();
        paths.into_iter().collect()
    }
}
