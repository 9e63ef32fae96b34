//! User intents on hunks, applied to a [`SelectionStore`].
//!
//! [`dispatch`] is the single entry point: selection changes mutate the
//! store, everything else produces a request for whoever writes to the
//! repository.

use crate::diff::{DiffHunk, HunkHeader, LineId, StackId, TreeChange};
use crate::selection::{CheckStatus, HunkKey, HunkSelection, SelectionError, SelectionStore};
use crate::worktree::{DiffSource, WorktreeChange, WorktreeError, commit_change, discard_change};
use error_set::error_set;
use tracing::{debug, info};

error_set! {
    /// Errors from applying a change action
    ActionError := {
        SelectionError(SelectionError),
        WorktreeError(WorktreeError),
    }
}

/// Something the user did to a hunk or one of its lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeAction {
    /// A line checkbox was toggled
    LineSelectionChange {
        key: HunkKey,
        line: LineId,
        checked: bool,
    },
    /// Commit the hunk (or its checked lines) on its own
    HunkCommit { key: HunkKey },
    /// Throw away the hunk (or its checked lines)
    HunkDiscard { key: HunkKey },
    /// Reassign the hunk to another stack (`None` unassigns it)
    HunkMove { key: HunkKey, to: Option<StackId> },
}

/// Request to reassign a hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkMove {
    pub path: String,
    pub header: HunkHeader,
    pub from: Option<StackId>,
    pub to: Option<StackId>,
}

/// What [`dispatch`] produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The hunk's checkbox after the change
    Selected(CheckStatus),
    Commit(WorktreeChange),
    Discard(WorktreeChange),
    Move(HunkMove),
}

/// Apply `action` to `store`.
///
/// Commit and discard requests leave the store untouched; the next
/// [`SelectionStore::update`] after the writer ran prunes what vanished.
/// A hunk without a checked line is committed or discarded whole.
///
/// # Errors
///
/// Returns [`ActionError`] if the hunk is not assigned, its diff cannot be
/// fetched, or its current diff no longer has the hunk.
pub fn dispatch(
    store: &mut SelectionStore,
    source: &impl DiffSource,
    action: ChangeAction,
) -> Result<ActionOutcome, ActionError> {
    debug!(?action, "dispatching change action");
    match action {
        ChangeAction::LineSelectionChange { key, line, checked } => {
            if checked {
                store.check_line(&key, line)?;
            } else {
                store.uncheck_line(&key, line)?;
            }
            Ok(ActionOutcome::Selected(store.state().hunk_status(&key)))
        }
        ChangeAction::HunkCommit { key } => {
            let (change, hunk, selection) = locate(store, source, &key)?;
            Ok(ActionOutcome::Commit(commit_change(&change, &hunk, &selection)?))
        }
        ChangeAction::HunkDiscard { key } => {
            let (change, hunk, selection) = locate(store, source, &key)?;
            Ok(ActionOutcome::Discard(discard_change(&change, &hunk, &selection)?))
        }
        ChangeAction::HunkMove { key, to } => {
            if store.state().assignment(&key).is_none() {
                return Err(hunk_not_found(&key).into());
            }
            store.uncheck_hunk(&key);
            info!(
                %key,
                to = to.as_ref().map(StackId::as_str).unwrap_or("unassigned"),
                "moving hunk"
            );
            Ok(ActionOutcome::Move(HunkMove {
                path: key.path,
                header: key.header,
                from: key.stack_id,
                to,
            }))
        }
    }
}

fn hunk_not_found(key: &HunkKey) -> SelectionError {
    SelectionError::HunkNotFound {
        path: key.path.clone(),
        header: key.header,
    }
}

/// Tree change, fresh hunk and effective selection for `key`
fn locate(
    store: &SelectionStore,
    source: &impl DiffSource,
    key: &HunkKey,
) -> Result<(TreeChange, DiffHunk, HunkSelection), ActionError> {
    let state = store.state();
    if state.assignment(key).is_none() {
        return Err(hunk_not_found(key).into());
    }
    let change = state
        .change(&key.path)
        .ok_or_else(|| WorktreeError::UnknownChange {
            path: key.path.clone(),
        })?;
    let diff = source
        .unified_diff(change)
        .map_err(WorktreeError::from)?;
    let hunk = diff.find_hunk(&key.header).ok_or_else(|| hunk_not_found(key))?;
    let selection = state.selection(key).cloned().unwrap_or(HunkSelection::All);
    Ok((change.clone(), hunk.clone(), selection))
}
