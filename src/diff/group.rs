use super::HunkError;
use super::header::HunkHeader;
use super::hunk::ParsedDiff;
use super::line::{DeltaKind, LineId, LineKind, classify_line};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// What the recomputed headers will be used for.
///
/// A commit header zeroes the side the group does not touch; a discard
/// header keeps the parent hunk's span on that side so the reverse patch
/// still lines up with the working tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Action {
    #[default]
    Commit,
    Discard,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "commit" => Ok(Action::Commit),
            "discard" => Ok(Action::Discard),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Commit => write!(f, "commit"),
            Action::Discard => write!(f, "discard"),
        }
    }
}

/// A maximal run of selected lines of one kind, adjacent in diff order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaLineGroup {
    pub kind: DeltaKind,
    pub lines: Vec<LineId>,
}

/// Walk a parsed hunk and cut the selected changed lines into runs.
///
/// A run ends at the first line that is unselected, context, or of the
/// other kind.
fn group_runs(parsed: &ParsedDiff, is_selected: impl Fn(&LineId) -> bool) -> Vec<DeltaLineGroup> {
    let mut groups = Vec::new();
    let mut current: Option<DeltaLineGroup> = None;

    for line in parsed.lines() {
        let selected_kind = classify_line(&line.id)
            .ok()
            .and_then(LineKind::delta)
            .filter(|_| is_selected(&line.id));

        let Some(kind) = selected_kind else {
            groups.extend(current.take());
            continue;
        };

        trace!(line = %line.id, %kind, "selected line");
        match current.take() {
            Some(mut group) if group.kind == kind => {
                group.lines.push(line.id);
                current = Some(group);
            }
            previous => {
                groups.extend(previous);
                current = Some(DeltaLineGroup {
                    kind,
                    lines: vec![line.id],
                });
            }
        }
    }
    groups.extend(current);
    groups
}

/// Split the selected lines of a hunk into runs, in diff order.
///
/// Selection order does not matter; membership is structural. Selected
/// ids that are not changed lines of the hunk are ignored.
///
/// # Errors
///
/// Returns [`HunkError::MalformedDiff`] if the hunk text cannot be parsed.
pub fn extract_line_groups(
    selected: &[LineId],
    diff: &str,
) -> Result<(Vec<DeltaLineGroup>, HunkHeader), HunkError> {
    let parsed = ParsedDiff::parse(diff)?;
    let selected: HashSet<&LineId> = selected.iter().collect();
    let groups = group_runs(&parsed, |id| selected.contains(id));
    debug!(
        header = %parsed.header,
        selected = selected.len(),
        groups = groups.len(),
        "extracted line groups"
    );
    Ok((groups, parsed.header))
}

/// Every changed run of a hunk, as if all of its lines were selected.
///
/// # Errors
///
/// Returns [`HunkError::MalformedDiff`] if the hunk text cannot be parsed.
pub fn extract_all_groups(diff: &str) -> Result<(Vec<DeltaLineGroup>, HunkHeader), HunkError> {
    let parsed = ParsedDiff::parse(diff)?;
    let groups = group_runs(&parsed, |_| true);
    debug!(header = %parsed.header, groups = groups.len(), "extracted all line groups");
    Ok((groups, parsed.header))
}

/// Header covering exactly one group, anchored for `action`.
///
/// # Errors
///
/// Returns [`HunkError::EmptyGroup`] for a group without lines and
/// [`HunkError::MissingLineNumber`] if the first line lacks the number
/// its kind needs.
pub fn line_group_to_hunk_header(
    group: &DeltaLineGroup,
    parent: &HunkHeader,
    action: Action,
) -> Result<HunkHeader, HunkError> {
    let first = group
        .lines
        .first()
        .ok_or(HunkError::EmptyGroup { kind: group.kind })?;
    let len = u32::try_from(group.lines.len()).unwrap_or(u32::MAX);
    let missing = || HunkError::MissingLineNumber { kind: group.kind };

    let header = match group.kind {
        DeltaKind::Added => {
            let new_start = first.new_line.ok_or_else(missing)?;
            let (old_start, old_lines) = match action {
                Action::Discard => (parent.old_start, parent.old_lines),
                Action::Commit => (0, 0),
            };
            HunkHeader::new(old_start, old_lines, new_start, len)
        }
        DeltaKind::Removed => {
            let old_start = first.old_line.ok_or_else(missing)?;
            let (new_start, new_lines) = match action {
                Action::Discard => (parent.new_start, parent.new_lines),
                Action::Commit => (0, 0),
            };
            HunkHeader::new(old_start, len, new_start, new_lines)
        }
    };
    Ok(header)
}

fn groups_to_headers(
    groups: &[DeltaLineGroup],
    parent: &HunkHeader,
    action: Action,
) -> Result<Vec<HunkHeader>, HunkError> {
    groups
        .iter()
        .map(|group| line_group_to_hunk_header(group, parent, action))
        .collect()
}

/// Headers for the selected lines of one hunk, one per run, in diff order.
///
/// An empty selection yields no headers and the diff is not parsed.
///
/// # Errors
///
/// Fails as a whole if the diff cannot be parsed or any group cannot be
/// turned into a header.
pub fn line_ids_to_hunk_headers(
    selected: &[LineId],
    diff: &str,
    action: Action,
) -> Result<Vec<HunkHeader>, HunkError> {
    if selected.is_empty() {
        return Ok(Vec::new());
    }
    let (groups, parent) = extract_line_groups(selected, diff)?;
    groups_to_headers(&groups, &parent, action)
}

/// Headers for every changed run of a hunk, in diff order.
///
/// # Errors
///
/// Fails as a whole if the diff cannot be parsed or any group cannot be
/// turned into a header.
pub fn diff_to_hunk_headers(diff: &str, action: Action) -> Result<Vec<HunkHeader>, HunkError> {
    let (groups, parent) = extract_all_groups(diff)?;
    groups_to_headers(&groups, &parent, action)
}


#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// A hunk body as a list of line markers: `' '`, `'+'` or `'-'`
    fn arb_body() -> impl Strategy<Value = Vec<char>> {
        prop::collection::vec(prop::sample::select(vec![' ', '+', '-']), 1..24)
    }

    /// Render a body into hunk text with a header that matches it
    fn render(body: &[char]) -> String {
        let old = body.iter().filter(|&&c| c != '+').count() as u32;
        let new = body.iter().filter(|&&c| c != '-').count() as u32;
        let mut text = HunkHeader::new(1, old, 1, new).to_string();
        text.push('\n');
        for (i, marker) in body.iter().enumerate() {
            text.push(*marker);
            text.push_str(&format!("line {}\n", i));
        }
        text
    }

    fn changed_ids(diff: &str) -> Vec<LineId> {
        ParsedDiff::parse(diff)
            .unwrap()
            .changed_lines()
            .map(|line| line.id)
            .collect()
    }

    proptest! {
        /// Groups list lines in diff order however the selection is ordered
        #[test]
        fn groups_preserve_diff_order(
            body in arb_body(),
            keep in prop::collection::vec(any::<bool>(), 24),
            seed in any::<u64>(),
        ) {
            let diff = render(&body);
            let changed = changed_ids(&diff);
            let mut selected: Vec<LineId> = changed
                .iter()
                .zip(keep.iter())
                .filter(|(_, keep)| **keep)
                .map(|(id, _)| *id)
                .collect();
            let expected = selected.clone();
            if !selected.is_empty() {
                let len = selected.len();
                selected.rotate_left((seed as usize) % len);
                selected.reverse();
            }

            let extracted = extract_line_groups(&selected, &diff);
            prop_assert!(extracted.is_ok());
            let (groups, _) = extracted.unwrap();
            let flattened: Vec<LineId> = groups.into_iter().flat_map(|g| g.lines).collect();
            prop_assert_eq!(flattened, expected);
        }

        /// Commit zeroes exactly the side a discard copies from the parent
        #[test]
        fn anchors_are_complementary(body in arb_body()) {
            let diff = render(&body);
            let commit = diff_to_hunk_headers(&diff, Action::Commit);
            let discard = diff_to_hunk_headers(&diff, Action::Discard);
            prop_assert!(commit.is_ok());
            prop_assert!(discard.is_ok());
            let (commit, discard) = (commit.unwrap(), discard.unwrap());
            let parent = HunkHeader::new(
                1,
                body.iter().filter(|&&c| c != '+').count() as u32,
                1,
                body.iter().filter(|&&c| c != '-').count() as u32,
            );
            prop_assert_eq!(commit.len(), discard.len());
            for (c, d) in commit.iter().zip(discard.iter()) {
                if c.old_start == 0 && c.old_lines == 0 {
                    prop_assert_eq!((c.new_start, c.new_lines), (d.new_start, d.new_lines));
                    prop_assert_eq!(
                        (d.old_start, d.old_lines),
                        (parent.old_start, parent.old_lines)
                    );
                } else {
                    prop_assert_eq!((c.new_start, c.new_lines), (0, 0));
                    prop_assert_eq!((c.old_start, c.old_lines), (d.old_start, d.old_lines));
                    prop_assert_eq!(
                        (d.new_start, d.new_lines),
                        (parent.new_start, parent.new_lines)
                    );
                }
            }
        }

        /// Committing every line of a single-kind hunk reproduces its header
        #[test]
        fn full_single_kind_selection_reproduces_header(
            start in 1u32..50,
            len in 1usize..12,
            added in any::<bool>(),
        ) {
            let header = if added {
                HunkHeader::new(0, 0, start, len as u32)
            } else {
                HunkHeader::new(start, len as u32, 0, 0)
            };
            let diff = single_kind_hunk(&header, added, len);
            let selected = changed_ids(&diff);
            let headers = line_ids_to_hunk_headers(&selected, &diff, Action::Commit);
            prop_assert!(matches!(headers, Ok(ref h) if h == &vec![header]));
        }

        /// Discarding every line of a single-kind hunk keeps its anchor
        #[test]
        fn full_single_kind_discard_reproduces_header(
            start in 1u32..50,
            anchor in 0u32..50,
            len in 1usize..12,
            added in any::<bool>(),
        ) {
            let header = if added {
                HunkHeader::new(anchor, 0, start, len as u32)
            } else {
                HunkHeader::new(start, len as u32, anchor, 0)
            };
            let diff = single_kind_hunk(&header, added, len);
            let selected = changed_ids(&diff);
            let headers = line_ids_to_hunk_headers(&selected, &diff, Action::Discard);
            prop_assert!(matches!(headers, Ok(ref h) if h == &vec![header]));
        }
    }

    /// `len` lines of one kind under `header`
    fn single_kind_hunk(header: &HunkHeader, added: bool, len: usize) -> String {
        let marker = if added { '+' } else { '-' };
        let mut diff = header.to_string();
        diff.push('\n');
        for i in 0..len {
            diff.push_str(&format!("{}line {}\n", marker, i));
        }
        diff
    }
}
