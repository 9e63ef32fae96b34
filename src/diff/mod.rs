//! Diff line model and hunk algebra.
//!
//! A hunk's text is parsed into addressable lines ([`LineId`]); a caller's
//! selection of those lines is grouped into runs ([`DeltaLineGroup`]) and
//! each run gets its own [`HunkHeader`], anchored for either a commit or a
//! discard. The same primitives answer which lines are already claimed by
//! another stack's commits ([`get_line_locks`]).

use error_set::error_set;

pub mod change;
pub mod file;
pub mod full;
pub mod group;
pub mod header;
pub mod hunk;
pub mod line;
pub mod lock;

pub use change::{ChangeStatus, TreeChange, UnifiedDiff};
pub use file::{DiffHunk, FileDiff};
pub use full::Diff;
pub use group::{
    Action, DeltaLineGroup, diff_to_hunk_headers, extract_all_groups, extract_line_groups,
    line_group_to_hunk_header, line_ids_to_hunk_headers,
};
pub use header::{HunkHeader, hunk_contains_hunk, hunk_contains_line, order_headers};
pub use hunk::{ContentSection, DiffLine, ParsedDiff, parse_diff};
pub use line::{DeltaKind, LineId, LineKind, classify_line};
pub use lock::{DependencyLock, HunkLock, LineLock, StackId, get_line_locks};

error_set! {
    /// Errors from the hunk algebra
    HunkError := {
        /// A line id carries neither an old nor a new line number
        #[display("Line id has neither an old nor a new line number")]
        InvalidLineId,
        /// A grouped line lacks the line number its kind requires
        #[display("{kind} line is missing its line number")]
        MissingLineNumber { kind: DeltaKind },
        /// A group with no lines reached header computation
        #[display("Cannot build a hunk header from an empty {kind} group")]
        EmptyGroup { kind: DeltaKind },
    } || DiffError

    /// Errors from reading diff text
    DiffError := {
        /// The `@@ -a,b +c,d @@` line could not be parsed
        #[display("Malformed hunk header '{header}'")]
        MalformedDiff { header: String },
        /// A file diff has no `+++ b/` or `--- a/` path
        #[display("Could not find file path in diff")]
        MissingPath,
    }
}
