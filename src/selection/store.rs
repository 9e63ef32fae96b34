use super::SelectionError;
use super::state::{HunkAssignment, HunkKey, HunkSelection, SelectionState, in_folder};
use crate::diff::{LineId, StackId, TreeChange};
use std::collections::{BTreeSet, HashSet};
use tracing::{debug, info};

/// Owner of the selection state.
///
/// Mutations take `&mut self`, so a refresh through [`update`] or
/// [`retain`] always finishes before a [`snapshot`] for commit building can
/// be taken.
///
/// [`update`]: SelectionStore::update
/// [`retain`]: SelectionStore::retain
/// [`snapshot`]: SelectionStore::snapshot
#[derive(Debug, Clone, Default)]
pub struct SelectionStore {
    state: SelectionState,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Owned copy of the current state
    pub fn snapshot(&self) -> SelectionState {
        self.state.clone()
    }

    /// Replace the live tree changes and assignments.
    ///
    /// Selections of hunks that are no longer assigned are dropped. Line
    /// selections keep only lines the new assignment still has.
    pub fn update(&mut self, changes: Vec<TreeChange>, assignments: Vec<HunkAssignment>) {
        self.state.changes = changes
            .into_iter()
            .map(|change| (change.path.clone(), change))
            .collect();
        self.state.assignments = assignments
            .into_iter()
            .map(|assignment| (assignment.key(), assignment))
            .collect();

        let before = self.state.selections.len();
        let selections = std::mem::take(&mut self.state.selections);
        self.state.selections = selections
            .into_iter()
            .filter_map(|(key, selection)| {
                let assignment = self.state.assignments.get(&key)?;
                let selection = match selection {
                    HunkSelection::All => HunkSelection::All,
                    HunkSelection::Lines(lines) => normalise(
                        assignment,
                        lines.into_iter().filter(|l| assignment.contains(l)),
                    )?,
                };
                Some((key, selection))
            })
            .collect();

        let pruned = before - self.state.selections.len();
        if pruned > 0 {
            info!(pruned, "dropped selections of vanished hunks");
        }
    }

    /// Forget every path not in `live_paths`.
    ///
    /// Returns how many selections were dropped.
    pub fn retain<'a>(&mut self, live_paths: impl IntoIterator<Item = &'a str>) -> usize {
        let live: HashSet<&str> = live_paths.into_iter().collect();
        let before = self.state.selections.len();

        self.state.changes.retain(|path, _| live.contains(path.as_str()));
        self.state
            .assignments
            .retain(|key, _| live.contains(key.path.as_str()));
        self.state
            .selections
            .retain(|key, _| live.contains(key.path.as_str()));

        let pruned = before - self.state.selections.len();
        if pruned > 0 {
            info!(pruned, live = live.len(), "dropped selections of vanished paths");
        }
        pruned
    }

    fn assignment(&self, key: &HunkKey) -> Result<&HunkAssignment, SelectionError> {
        self.state
            .assignments
            .get(key)
            .ok_or_else(|| SelectionError::HunkNotFound {
                path: key.path.clone(),
                header: key.header,
            })
    }

    /// Check one changed line of a hunk.
    ///
    /// Checking the last unchecked line checks the whole hunk. Lines that
    /// are not changed lines of the hunk are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::HunkNotFound`] if the hunk is not assigned.
    pub fn check_line(&mut self, key: &HunkKey, line: LineId) -> Result<(), SelectionError> {
        let assignment = self.assignment(key)?;
        if !assignment.contains(&line) {
            debug!(%key, %line, "ignoring line outside hunk");
            return Ok(());
        }

        let lines = match self.state.selections.get(key) {
            Some(HunkSelection::All) => return Ok(()),
            Some(HunkSelection::Lines(lines)) => lines.iter().copied().chain([line]).collect(),
            None => BTreeSet::from([line]),
        };

        match normalise(assignment, lines) {
            Some(selection) => self.state.selections.insert(key.clone(), selection),
            None => self.state.selections.remove(key),
        };
        Ok(())
    }

    /// Uncheck one changed line of a hunk.
    ///
    /// Unchecking a line of a fully checked hunk leaves every other line
    /// checked; unchecking the last checked line unchecks the hunk.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::HunkNotFound`] if the hunk is not assigned.
    pub fn uncheck_line(&mut self, key: &HunkKey, line: LineId) -> Result<(), SelectionError> {
        let assignment = self.assignment(key)?;

        let lines: BTreeSet<LineId> = match self.state.selections.get(key) {
            None => return Ok(()),
            Some(HunkSelection::All) => assignment
                .lines
                .iter()
                .copied()
                .filter(|l| *l != line)
                .collect(),
            Some(HunkSelection::Lines(lines)) => {
                lines.iter().copied().filter(|l| *l != line).collect()
            }
        };

        match normalise(assignment, lines) {
            Some(selection) => self.state.selections.insert(key.clone(), selection),
            None => self.state.selections.remove(key),
        };
        Ok(())
    }

    /// Check every line of a hunk.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::HunkNotFound`] if the hunk is not assigned.
    pub fn check_hunk(&mut self, key: &HunkKey) -> Result<(), SelectionError> {
        self.assignment(key)?;
        self.state.selections.insert(key.clone(), HunkSelection::All);
        Ok(())
    }

    pub fn uncheck_hunk(&mut self, key: &HunkKey) {
        self.state.selections.remove(key);
    }

    pub fn check_file(&mut self, stack: Option<&StackId>, path: &str) {
        self.check_where(stack, |p| p == path);
    }

    pub fn check_files(&mut self, stack: Option<&StackId>, paths: &[&str]) {
        self.check_where(stack, |p| paths.contains(&p));
    }

    pub fn uncheck_file(&mut self, stack: Option<&StackId>, path: &str) {
        self.uncheck_where(stack, |p| p == path);
    }

    /// Check every file below the folder `prefix`
    pub fn check_dir(&mut self, stack: Option<&StackId>, prefix: &str) {
        self.check_where(stack, |p| in_folder(p, prefix));
    }

    pub fn uncheck_dir(&mut self, stack: Option<&StackId>, prefix: &str) {
        self.uncheck_where(stack, |p| in_folder(p, prefix));
    }

    pub fn check_all(&mut self, stack: Option<&StackId>) {
        self.check_where(stack, |_| true);
    }

    pub fn uncheck_all(&mut self, stack: Option<&StackId>) {
        self.uncheck_where(stack, |_| true);
    }

    /// Drop every selection of every stack
    pub fn clear(&mut self) {
        self.state.selections.clear();
    }

    fn check_where(&mut self, stack: Option<&StackId>, matches: impl Fn(&str) -> bool) {
        let keys: Vec<HunkKey> = self
            .state
            .assignments_for(stack)
            .filter(|assignment| matches(&assignment.path))
            .map(HunkAssignment::key)
            .collect();
        debug!(hunks = keys.len(), "checking hunks");
        for key in keys {
            self.state.selections.insert(key, HunkSelection::All);
        }
    }

    fn uncheck_where(&mut self, stack: Option<&StackId>, matches: impl Fn(&str) -> bool) {
        self.state
            .selections
            .retain(|key, _| key.stack_id.as_ref() != stack || !matches(&key.path));
    }
}

/// Canonical selection for `lines` of `assignment`: `None` when empty,
/// `All` when every changed line is present
fn normalise(
    assignment: &HunkAssignment,
    lines: impl IntoIterator<Item = LineId>,
) -> Option<HunkSelection> {
    let lines: BTreeSet<LineId> = lines.into_iter().collect();
    if lines.is_empty() {
        None
    } else if assignment.lines.iter().all(|line| lines.contains(line)) {
        Some(HunkSelection::All)
    } else {
        Some(HunkSelection::Lines(lines))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::diff::{ChangeStatus, HunkHeader};
    use crate::selection::CheckStatus;
    use similar_asserts::assert_eq;

    const H1: HunkHeader = HunkHeader::new(2, 2, 2, 1);
    const H2: HunkHeader = HunkHeader::new(10, 0, 9, 1);

    fn h1_lines() -> Vec<LineId> {
        vec![LineId::removed(2), LineId::removed(3), LineId::added(2)]
    }

    fn assignment(stack: Option<&str>, path: &str, header: HunkHeader) -> HunkAssignment {
        let lines = if header == H1 {
            h1_lines()
        } else {
            vec![LineId::added(9)]
        };
        HunkAssignment {
            stack_id: stack.map(StackId::from),
            path: path.to_string(),
            header,
            lines,
        }
    }

    fn change(path: &str) -> TreeChange {
        TreeChange::new(path, ChangeStatus::Modification)
    }

    fn store_with(assignments: Vec<HunkAssignment>) -> SelectionStore {
        let mut paths: Vec<String> = assignments.iter().map(|a| a.path.clone()).collect();
        paths.dedup();
        let mut store = SelectionStore::new();
        store.update(paths.iter().map(|p| change(p)).collect(), assignments);
        store
    }

    fn key(stack: Option<&str>, path: &str, header: HunkHeader) -> HunkKey {
        HunkKey::new(stack.map(StackId::from), path, header)
    }

    #[test]
    fn check_line_then_all_lines_normalises() {
        let mut store = store_with(vec![assignment(None, "a.txt", H1)]);
        let k = key(None, "a.txt", H1);

        store.check_line(&k, LineId::removed(2)).unwrap();
        assert_eq!(
            store.state().selection(&k),
            Some(&HunkSelection::Lines([LineId::removed(2)].into()))
        );
        assert_eq!(store.state().hunk_status(&k), CheckStatus::Indeterminate);

        store.check_line(&k, LineId::removed(3)).unwrap();
        store.check_line(&k, LineId::added(2)).unwrap();
        assert_eq!(store.state().selection(&k), Some(&HunkSelection::All));
        assert_eq!(store.state().hunk_status(&k), CheckStatus::Checked);
    }

    #[test]
    fn uncheck_line_of_full_hunk_keeps_the_rest() {
        let mut store = store_with(vec![assignment(None, "a.txt", H1)]);
        let k = key(None, "a.txt", H1);
        store.check_hunk(&k).unwrap();

        store.uncheck_line(&k, LineId::removed(3)).unwrap();
        assert_eq!(
            store.state().selection(&k),
            Some(&HunkSelection::Lines(
                [LineId::removed(2), LineId::added(2)].into()
            ))
        );
    }

    #[test]
    fn unchecking_last_line_removes_selection() {
        let mut store = store_with(vec![assignment(None, "a.txt", H1)]);
        let k = key(None, "a.txt", H1);
        store.check_line(&k, LineId::added(2)).unwrap();
        store.uncheck_line(&k, LineId::added(2)).unwrap();
        assert_eq!(store.state().selection(&k), None);
        assert_eq!(store.state().hunk_status(&k), CheckStatus::Unchecked);
    }

    #[test]
    fn line_ops_on_unknown_hunk_fail() {
        let mut store = store_with(vec![assignment(None, "a.txt", H1)]);
        let missing = key(None, "a.txt", H2);
        assert!(matches!(
            store.check_line(&missing, LineId::added(9)),
            Err(SelectionError::HunkNotFound { .. })
        ));
        assert!(matches!(
            store.uncheck_line(&missing, LineId::added(9)),
            Err(SelectionError::HunkNotFound { .. })
        ));
        assert!(store.check_hunk(&missing).is_err());
    }

    #[test]
    fn foreign_line_is_ignored() {
        let mut store = store_with(vec![assignment(None, "a.txt", H1)]);
        let k = key(None, "a.txt", H1);
        store.check_line(&k, LineId::added(40)).unwrap();
        assert_eq!(store.state().selection(&k), None);
    }

    #[test]
    fn file_and_dir_fan_out() {
        let mut store = store_with(vec![
            assignment(None, "src/a.rs", H1),
            assignment(None, "src/a.rs", H2),
            assignment(None, "src/deep/b.rs", H1),
            assignment(None, "srcs/c.rs", H1),
        ]);

        store.check_file(None, "src/a.rs");
        assert_eq!(store.state().file_status(None, "src/a.rs"), CheckStatus::Checked);
        assert_eq!(store.state().folder_status(None, "src"), CheckStatus::Indeterminate);

        store.check_dir(None, "src");
        assert_eq!(store.state().folder_status(None, "src"), CheckStatus::Checked);
        assert_eq!(store.state().file_status(None, "srcs/c.rs"), CheckStatus::Unchecked);

        store.uncheck_dir(None, "src/deep");
        assert_eq!(store.state().file_status(None, "src/deep/b.rs"), CheckStatus::Unchecked);
        assert_eq!(store.state().file_status(None, "src/a.rs"), CheckStatus::Checked);

        store.uncheck_file(None, "src/a.rs");
        assert_eq!(store.state().stack_status(None), CheckStatus::Unchecked);

        store.check_files(None, &["src/deep/b.rs", "srcs/c.rs"]);
        assert_eq!(store.state().selected_paths(None), vec!["src/deep/b.rs", "srcs/c.rs"]);
    }

    #[test]
    fn stack_fan_out_stays_in_stack() {
        let mut store = store_with(vec![
            assignment(Some("s1"), "a.txt", H1),
            assignment(None, "b.txt", H1),
        ]);
        let s1 = StackId::from("s1");

        store.check_all(Some(&s1));
        assert_eq!(store.state().stack_status(Some(&s1)), CheckStatus::Checked);
        assert_eq!(store.state().stack_status(None), CheckStatus::Unchecked);

        store.check_all(None);
        store.uncheck_all(Some(&s1));
        assert_eq!(store.state().stack_status(Some(&s1)), CheckStatus::Unchecked);
        assert_eq!(store.state().stack_status(None), CheckStatus::Checked);

        store.clear();
        assert_eq!(store.state().stack_status(None), CheckStatus::Unchecked);
    }

    #[test]
    fn update_prunes_vanished_hunks() {
        let mut store = store_with(vec![
            assignment(None, "a.txt", H1),
            assignment(None, "a.txt", H2),
        ]);
        store.check_all(None);

        store.update(vec![change("a.txt")], vec![assignment(None, "a.txt", H2)]);
        assert_eq!(store.state().selection(&key(None, "a.txt", H1)), None);
        assert_eq!(
            store.state().selection(&key(None, "a.txt", H2)),
            Some(&HunkSelection::All)
        );
    }

    #[test]
    fn update_narrows_line_selections() {
        let mut store = store_with(vec![assignment(None, "a.txt", H1)]);
        let k = key(None, "a.txt", H1);
        store.check_line(&k, LineId::removed(2)).unwrap();
        store.check_line(&k, LineId::added(2)).unwrap();

        let narrowed = HunkAssignment {
            lines: vec![LineId::removed(2), LineId::removed(3)],
            ..assignment(None, "a.txt", H1)
        };
        store.update(vec![change("a.txt")], vec![narrowed]);
        assert_eq!(
            store.state().selection(&k),
            Some(&HunkSelection::Lines([LineId::removed(2)].into()))
        );
    }

    #[test]
    fn retain_drops_dead_paths() {
        let mut store = store_with(vec![
            assignment(None, "a.txt", H1),
            assignment(None, "b.txt", H1),
        ]);
        store.check_all(None);

        let pruned = store.retain(["b.txt"]);
        assert_eq!(pruned, 1);
        assert!(store.state().change("a.txt").is_none());
        assert!(store.state().assignment(&key(None, "a.txt", H1)).is_none());
        assert_eq!(store.state().selected_paths(None), vec!["b.txt"]);
    }

    #[test]
    fn snapshot_is_detached() {
        let mut store = store_with(vec![assignment(None, "a.txt", H1)]);
        let before = store.snapshot();
        store.check_all(None);
        assert_eq!(before.stack_status(None), CheckStatus::Unchecked);
        assert_eq!(store.state().stack_status(None), CheckStatus::Checked);
    }
}
