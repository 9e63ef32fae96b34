//! Line-level partial commits.
//!
//! [`diff`] turns hunk text into addressable lines and recomputes hunk
//! headers for any subset of them. [`selection`] keeps the tri-state
//! checkbox state over stacks, files, hunks and lines. [`worktree`] and
//! [`action`] turn that state into commit and discard requests for an
//! external writer. [`LineSelector`] ties the pieces together for a single
//! `git diff` and backs the `git-partial` binary.

use error_set::error_set;
use std::fmt;

pub mod action;
pub mod diff;
pub mod parse;
pub mod selection;
pub mod worktree;

pub use action::{ActionError, ActionOutcome, ChangeAction, HunkMove, dispatch};
pub use diff::{
    Action, DeltaLineGroup, Diff, DiffError, HunkError, HunkHeader, HunkLock, LineId, LineLock,
    StackId,
};
pub use parse::ParseError;
pub use selection::{CheckStatus, SelectionError, SelectionStore};
pub use worktree::{DiffSource, WorktreeChange, WorktreeError, worktree_changes};

use diff::{
    FileDiff, ParsedDiff, extract_line_groups, get_line_locks, line_ids_to_hunk_headers,
    order_headers,
};

error_set! {
    /// Top-level error for git-partial operations
    GitPartialError := {
        #[display("No changes for {file} in the diff")]
        FileNotInDiff { file: String },
        #[display("None of the referenced lines are changed lines of {file}")]
        NoMatchingLines { file: String },
        #[display("Failed to read {path}: {message}")]
        ReadFailed { path: String, message: String },
        ParseError(ParseError),
        DiffError(DiffError),
        HunkError(HunkError),
        WorktreeError(WorktreeError),
    }
}

/// One run of selected lines inside its hunk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupReport {
    pub parent: HunkHeader,
    pub group: DeltaLineGroup,
}

impl fmt::Display for GroupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:", self.parent, self.group.kind)?;
        for line in &self.group.lines {
            write!(f, " {line}")?;
        }
        Ok(())
    }
}

/// Lock state of one hunk as seen by a stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockReport {
    pub header: HunkHeader,
    pub fully_locked: bool,
    pub lines: Vec<LineLock>,
}

impl fmt::Display for LockReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match (self.fully_locked, self.lines.is_empty()) {
            (true, _) => "fully locked",
            (false, true) => "unlocked",
            (false, false) => "partially locked",
        };
        write!(f, "{} {state}", self.header)?;
        for lock in &self.lines {
            write!(f, "\n  {}\t", lock.line)?;
            for (i, claim) in lock.locks.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}@{}", claim.stack_id, claim.commit_id)?;
            }
        }
        Ok(())
    }
}

/// Line selection over one parsed `git diff`
///
/// # Examples
/// ```
/// # use git_partial::{Action, HunkHeader, LineSelector};
/// let text = "diff --git a/f.txt b/f.txt
/// --- a/f.txt
/// +++ b/f.txt
/// @@ -1,3 +1,2 @@
///  line1
/// -line2
///  line3
/// ";
/// let selector = LineSelector::parse(text).unwrap();
/// let commit = selector.headers("f.txt:-2", Action::Commit).unwrap();
/// assert_eq!(commit, vec![HunkHeader::new(2, 1, 0, 0)]);
/// let discard = selector.headers("f.txt:-2", Action::Discard).unwrap();
/// assert_eq!(discard, vec![HunkHeader::new(2, 1, 1, 2)]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineSelector {
    diff: Diff,
}

impl LineSelector {
    pub fn new(diff: Diff) -> Self {
        Self { diff }
    }

    /// Parse `git diff` output
    ///
    /// # Errors
    ///
    /// Returns [`GitPartialError`] if a file section or hunk header is
    /// malformed.
    pub fn parse(text: &str) -> Result<Self, GitPartialError> {
        Ok(Self::new(Diff::parse(text)?))
    }

    pub fn diff(&self) -> &Diff {
        &self.diff
    }

    fn file(&self, file: &str) -> Result<&FileDiff, GitPartialError> {
        self.diff
            .file(file)
            .ok_or_else(|| GitPartialError::FileNotInDiff {
                file: file.to_string(),
            })
    }

    /// Hunk headers for the lines named by `file_ref` (e.g. `src/a.rs:3..5,-9`).
    ///
    /// Commit headers come out in application order; discard headers in
    /// diff order.
    ///
    /// # Errors
    ///
    /// Returns [`GitPartialError`] if the reference is malformed, the file
    /// is not in the diff, or none of the lines are changed lines.
    pub fn headers(
        &self,
        file_ref: &str,
        action: Action,
    ) -> Result<Vec<HunkHeader>, GitPartialError> {
        let refs = parse::parse_file_refs(file_ref)?;
        let file = self.file(&refs.file)?;
        let ids = refs.line_ids();

        let mut headers = Vec::new();
        for hunk in &file.hunks {
            headers.extend(line_ids_to_hunk_headers(&ids, &hunk.diff, action)?);
        }
        if headers.is_empty() {
            return Err(GitPartialError::NoMatchingLines { file: refs.file });
        }
        if action == Action::Commit {
            order_headers(&mut headers);
        }
        Ok(headers)
    }

    /// The runs the lines named by `file_ref` fall into, hunk by hunk
    ///
    /// # Errors
    ///
    /// Same as [`LineSelector::headers`].
    pub fn groups(&self, file_ref: &str) -> Result<Vec<GroupReport>, GitPartialError> {
        let refs = parse::parse_file_refs(file_ref)?;
        let file = self.file(&refs.file)?;
        let ids = refs.line_ids();

        let mut reports = Vec::new();
        for hunk in &file.hunks {
            let (groups, parent) = extract_line_groups(&ids, &hunk.diff)?;
            reports.extend(groups.into_iter().map(|group| GroupReport { parent, group }));
        }
        if reports.is_empty() {
            return Err(GitPartialError::NoMatchingLines { file: refs.file });
        }
        Ok(reports)
    }

    /// Lock state of every hunk of `path` for the stack `owner`
    ///
    /// # Errors
    ///
    /// Returns [`GitPartialError`] if the file is not in the diff or a hunk
    /// cannot be parsed.
    pub fn locks(
        &self,
        path: &str,
        owner: &StackId,
        locks: &[HunkLock],
    ) -> Result<Vec<LockReport>, GitPartialError> {
        self.file(path)?
            .hunks
            .iter()
            .map(|hunk| {
                let (fully_locked, lines) = get_line_locks(Some(owner), hunk, locks)?;
                Ok(LockReport {
                    header: hunk.header,
                    fully_locked,
                    lines,
                })
            })
            .collect()
    }

    /// Changed lines of every file with the ids line references use.
    ///
    /// # Example output
    /// ```text
    /// flake.nix:
    ///   +137:       debug = true;
    ///
    ///   +142:         ./flake-modules/home-manager.nix
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`GitPartialError`] if a hunk cannot be parsed.
    pub fn annotate(&self) -> Result<String, GitPartialError> {
        let mut out = String::new();
        for (i, file) in self.diff.files.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&file.path);
            out.push_str(":\n");
            for (j, hunk) in file.hunks.iter().enumerate() {
                if j > 0 {
                    out.push('\n');
                }
                let parsed = ParsedDiff::parse(&hunk.diff)?;
                for line in parsed.changed_lines() {
                    let content = line.content.trim_end_matches('\r');
                    out.push_str(&format!("  {}:\t{content}\n", line.id));
                }
            }
        }
        Ok(out)
    }
}
