use super::HunkError;
use super::file::DiffHunk;
use super::header::HunkHeader;
use super::hunk::ParsedDiff;
use super::line::LineId;
use std::fmt;
use tracing::debug;

/// Identifier of a unit of work (a stack of commits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(pub String);

impl StackId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StackId {
    fn from(id: &str) -> Self {
        StackId(id.to_string())
    }
}

impl From<String> for StackId {
    fn from(id: String) -> Self {
        StackId(id)
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A commit of some stack that already touched a region
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DependencyLock {
    pub stack_id: StackId,
    pub commit_id: String,
}

/// Claims on every line inside `hunk`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkLock {
    pub hunk: HunkHeader,
    pub locks: Vec<DependencyLock>,
}

/// Claims of other stacks on a single changed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineLock {
    pub line: LineId,
    pub locks: Vec<DependencyLock>,
}

/// Resolve which changed lines of `hunk` are claimed by stacks other than
/// `owner`.
///
/// Returns whether every changed line is claimed, and one [`LineLock`] per
/// claimed line in diff order. Without an owner nothing can be excluded,
/// so the answer is `(false, [])`. A hunk with no changed lines is never
/// fully locked.
///
/// # Errors
///
/// Returns [`HunkError::MalformedDiff`] if the hunk text cannot be parsed.
pub fn get_line_locks(
    owner: Option<&StackId>,
    hunk: &DiffHunk,
    locks: &[HunkLock],
) -> Result<(bool, Vec<LineLock>), HunkError> {
    let Some(owner) = owner else {
        return Ok((false, Vec::new()));
    };

    // Lock regions recorded against an older diff can be wider or narrower
    // than the current hunk
    let related: Vec<&HunkLock> = locks
        .iter()
        .filter(|lock| {
            hunk.header.contains_hunk(&lock.hunk) || lock.hunk.contains_hunk(&hunk.header)
        })
        .collect();

    let parsed = ParsedDiff::parse(&hunk.diff)?;
    let mut fully_locked = true;
    let mut changed = 0usize;
    let mut line_locks = Vec::new();

    for line in parsed.changed_lines() {
        changed += 1;
        let mut claims: Vec<DependencyLock> = Vec::new();
        for lock in &related {
            if !lock.hunk.contains_line(&line.id)? {
                continue;
            }
            for claim in &lock.locks {
                if claim.stack_id != *owner && !claims.contains(claim) {
                    claims.push(claim.clone());
                }
            }
        }

        if claims.is_empty() {
            fully_locked = false;
        } else {
            line_locks.push(LineLock {
                line: line.id,
                locks: claims,
            });
        }
    }

    let fully_locked = fully_locked && changed > 0;
    debug!(
        header = %hunk.header,
        %owner,
        related = related.len(),
        locked_lines = line_locks.len(),
        fully_locked,
        "resolved line locks"
    );
    Ok((fully_locked, line_locks))
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    const DIFF: &str = "@@ -1,5 +1,5 @@\n line 1\n-line 2\n-line 3\n-line 4\n+line 2 changed\n+line 3 changed\n+line 4 changed\n line 5";

    fn arb_lock() -> impl Strategy<Value = HunkLock> {
        (
            1u32..6,
            0u32..4,
            1u32..6,
            0u32..4,
            prop::collection::vec((0usize..3, 0usize..3), 1..4),
        )
            .prop_map(|(old_start, old_lines, new_start, new_lines, claims)| HunkLock {
                hunk: HunkHeader::new(old_start, old_lines, new_start, new_lines),
                locks: claims
                    .into_iter()
                    .map(|(stack, commit)| DependencyLock {
                        stack_id: StackId(format!("stack{}", stack)),
                        commit_id: format!("commit{}", commit),
                    })
                    .collect(),
            })
    }

    proptest! {
        /// The querying stack never sees its own claims
        #[test]
        fn owner_never_locks_itself(
            locks in prop::collection::vec(arb_lock(), 0..6),
            owner in 0usize..3,
        ) {
            let owner = StackId(format!("stack{}", owner));
            let hunk = DiffHunk {
                header: HunkHeader::new(1, 5, 1, 5),
                diff: DIFF.to_string(),
            };
            let result = get_line_locks(Some(&owner), &hunk, &locks);
            prop_assert!(result.is_ok());
            let (fully_locked, line_locks) = result.unwrap();
            for line_lock in &line_locks {
                prop_assert!(!line_lock.locks.is_empty());
                prop_assert!(line_lock.locks.iter().all(|claim| claim.stack_id != owner));
            }
            if fully_locked {
                prop_assert_eq!(line_locks.len(), 6);
            }
        }
    }
}
