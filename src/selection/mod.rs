//! Tri-state selection of hunks and lines across stacks.
//!
//! [`SelectionStore`] owns the live tree changes, the hunk assignments and
//! which of those hunks (or which of their lines) the user has checked.
//! Every mutation goes through the store; reads go through the borrowed
//! [`SelectionState`].

use crate::diff::HunkHeader;
use error_set::error_set;

pub mod state;
pub mod store;

pub use state::{CheckStatus, HunkAssignment, HunkKey, HunkSelection, SelectionState};
pub use store::SelectionStore;

error_set! {
    /// Errors from selection updates
    SelectionError := {
        /// No live assignment exists for the hunk
        #[display("Hunk {header} not found in {path}")]
        HunkNotFound { path: String, header: HunkHeader },
    }
}
