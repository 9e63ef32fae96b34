//! Commit and discard payloads built from a selection snapshot.
//!
//! Diffs are fetched through [`DiffSource`] at build time, so every stored
//! header is matched against what the working tree looks like now.

use crate::diff::{
    Action, Diff, DiffHunk, HunkError, HunkHeader, StackId, TreeChange, UnifiedDiff,
    diff_to_hunk_headers, line_ids_to_hunk_headers, order_headers,
};
use crate::selection::{HunkSelection, SelectionError, SelectionState};
use error_set::error_set;
use std::collections::BTreeMap;
use tracing::{debug, warn};

error_set! {
    /// Errors while building worktree changes
    WorktreeError := {
        /// A selected path has no recorded tree change
        #[display("No tree change recorded for {path}")]
        UnknownChange { path: String },
        HunkError(HunkError),
        SelectionError(SelectionError),
        SourceError(SourceError),
    }

    /// Errors from the diff collaborator
    SourceError := {
        #[display("Failed to fetch diff for {path}: {message}")]
        FetchFailed { path: String, message: String },
    }
}

/// Where fresh diffs come from
pub trait DiffSource {
    /// The current diff of `change`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the diff cannot be produced.
    fn unified_diff(&self, change: &TreeChange) -> Result<UnifiedDiff, SourceError>;
}

impl DiffSource for Diff {
    fn unified_diff(&self, change: &TreeChange) -> Result<UnifiedDiff, SourceError> {
        self.file(&change.path)
            .map(UnifiedDiff::from)
            .ok_or_else(|| SourceError::FetchFailed {
                path: change.path.clone(),
                message: "path is not part of the diff".to_string(),
            })
    }
}

/// One file of a commit or discard request.
///
/// Empty `hunk_headers` stands for the whole file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorktreeChange {
    pub path_bytes: Vec<u8>,
    pub previous_path_bytes: Option<Vec<u8>>,
    pub hunk_headers: Vec<HunkHeader>,
}

impl WorktreeChange {
    fn new(change: &TreeChange, hunk_headers: Vec<HunkHeader>) -> Self {
        Self {
            path_bytes: change.path_bytes.clone(),
            previous_path_bytes: change.previous_path_bytes().map(<[u8]>::to_vec),
            hunk_headers,
        }
    }

    pub fn is_whole_file(&self) -> bool {
        self.hunk_headers.is_empty()
    }
}

/// Commit-anchored headers for the selected hunks of one file.
///
/// Returns an empty list when every hunk of the file is fully selected.
fn commit_headers(
    path: &str,
    diff: &UnifiedDiff,
    selected: &BTreeMap<HunkHeader, HunkSelection>,
) -> Result<Vec<HunkHeader>, WorktreeError> {
    let hunks: Vec<(&DiffHunk, &HunkSelection)> = selected
        .iter()
        .map(|(header, selection)| {
            diff.find_hunk(header)
                .map(|hunk| (hunk, selection))
                .ok_or_else(|| SelectionError::HunkNotFound {
                    path: path.to_string(),
                    header: *header,
                })
        })
        .collect::<Result<_, _>>()?;

    let complete = hunks
        .iter()
        .all(|(_, selection)| **selection == HunkSelection::All);
    if complete && hunks.len() == diff.hunks().len() {
        return Ok(Vec::new());
    }

    let mut headers = Vec::new();
    for (hunk, selection) in hunks {
        match selection {
            HunkSelection::All => headers.extend(diff_to_hunk_headers(&hunk.diff, Action::Commit)?),
            HunkSelection::Lines(lines) => {
                let lines: Vec<_> = lines.iter().copied().collect();
                headers.extend(line_ids_to_hunk_headers(&lines, &hunk.diff, Action::Commit)?);
            }
        }
    }
    order_headers(&mut headers);
    Ok(headers)
}

fn file_change(
    change: &TreeChange,
    source: &impl DiffSource,
    selected: &BTreeMap<HunkHeader, HunkSelection>,
) -> Result<WorktreeChange, WorktreeError> {
    if change.is_submodule() {
        return Ok(WorktreeChange::new(change, Vec::new()));
    }

    let diff = source.unified_diff(change)?;
    if !matches!(diff, UnifiedDiff::Patch { .. }) {
        debug!(path = %change.path, "committing non-patch change whole");
        return Ok(WorktreeChange::new(change, Vec::new()));
    }

    let headers = commit_headers(&change.path, &diff, selected)?;
    Ok(WorktreeChange::new(change, headers))
}

/// Build the commit request for `stack` from a selection snapshot.
///
/// A named stack also commits the unassigned selections; where both select
/// the same hunk their selections are merged. Files come out in path order.
///
/// # Errors
///
/// Fails as a whole if a path has no tree change, a diff cannot be
/// fetched, or a selected hunk is not in the fresh diff.
pub fn worktree_changes(
    snapshot: &SelectionState,
    stack: Option<&StackId>,
    source: &impl DiffSource,
) -> Result<Vec<WorktreeChange>, WorktreeError> {
    let mut by_path: BTreeMap<&str, BTreeMap<HunkHeader, HunkSelection>> = BTreeMap::new();
    for (key, selection) in snapshot.selections_for(stack) {
        let hunks = by_path.entry(key.path.as_str()).or_default();
        let merged = match hunks.remove(&key.header) {
            Some(existing) => existing.merge(selection.clone()),
            None => selection.clone(),
        };
        hunks.insert(key.header, merged);
    }

    let changes = by_path
        .iter()
        .map(|(path, selected)| {
            let change = snapshot
                .change(path)
                .ok_or_else(|| WorktreeError::UnknownChange {
                    path: path.to_string(),
                })?;
            file_change(change, source, selected)
        })
        .collect::<Result<Vec<_>, _>>()?;

    debug!(
        stack = stack.map(StackId::as_str).unwrap_or("unassigned"),
        files = changes.len(),
        "built worktree changes"
    );
    Ok(changes)
}

/// Build the request that discards `selection` of `hunk` from the working tree
///
/// # Errors
///
/// Returns [`WorktreeError::HunkError`] if the selected lines cannot be
/// turned into headers.
pub fn discard_change(
    change: &TreeChange,
    hunk: &DiffHunk,
    selection: &HunkSelection,
) -> Result<WorktreeChange, WorktreeError> {
    let headers = match selection {
        HunkSelection::All => vec![hunk.header],
        HunkSelection::Lines(lines) => {
            let lines: Vec<_> = lines.iter().copied().collect();
            let headers = line_ids_to_hunk_headers(&lines, &hunk.diff, Action::Discard)?;
            if headers.is_empty() {
                warn!(path = %change.path, header = %hunk.header, "selection matched no lines");
            }
            headers
        }
    };
    Ok(WorktreeChange::new(change, headers))
}

/// Build the request that commits `selection` of `hunk` on its own
///
/// # Errors
///
/// Returns [`WorktreeError::HunkError`] if the hunk cannot be parsed.
pub fn commit_change(
    change: &TreeChange,
    hunk: &DiffHunk,
    selection: &HunkSelection,
) -> Result<WorktreeChange, WorktreeError> {
    let mut headers = match selection {
        HunkSelection::All => diff_to_hunk_headers(&hunk.diff, Action::Commit)?,
        HunkSelection::Lines(lines) => {
            let lines: Vec<_> = lines.iter().copied().collect();
            line_ids_to_hunk_headers(&lines, &hunk.diff, Action::Commit)?
        }
    };
    order_headers(&mut headers);
    Ok(WorktreeChange::new(change, headers))
}
