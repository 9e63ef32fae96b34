use super::DiffError;
use super::header::HunkHeader;

/// One hunk of a file diff: its header and its raw text.
///
/// `diff` starts with the `@@` line and keeps the body byte-for-byte, so
/// it can be fed back into [`super::parse_diff`] and friends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffHunk {
    pub header: HunkHeader,
    pub diff: String,
}

impl DiffHunk {
    /// Parse the header out of a hunk's text.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::MalformedDiff`] if the text does not start with
    /// a hunk header.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let first = text.split('\n').next().unwrap_or_default();
        let (header, _) = HunkHeader::parse_line(first)?;
        Ok(DiffHunk {
            header,
            diff: text.to_string(),
        })
    }
}

/// A complete diff for a single file.
///
/// Contains all hunks (change blocks) for one file from a git diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDiff {
    /// File path (from `+++ b/path`, or `--- a/path` for deletions)
    pub path: String,
    /// All hunks for this file, in diff order
    pub hunks: Vec<DiffHunk>,
}

impl FileDiff {
    /// Parse a single-file diff from git diff output.
    ///
    /// Expects input starting with `diff --git` and containing the
    /// `--- a/path` / `+++ b/path` headers. A file with no hunks (binary,
    /// mode-only change) parses with an empty hunk list.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::MissingPath`] if no path header is found and
    /// [`DiffError::MalformedDiff`] if a hunk header is broken.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let path = Self::parse_path(text).ok_or(DiffError::MissingPath)?;

        // Hunk markers always start a line
        let mut indices = Vec::new();
        let mut search_start = 0;
        while let Some(pos) = text[search_start..].find("\n@@ ") {
            let abs_pos = search_start + pos + 1;
            indices.push(abs_pos);
            search_start = abs_pos;
        }

        let hunks = indices
            .iter()
            .enumerate()
            .map(|(i, &start)| {
                let end = indices.get(i + 1).copied().unwrap_or(text.len());
                DiffHunk::parse(&text[start..end])
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FileDiff { path, hunks })
    }

    fn parse_path(text: &str) -> Option<String> {
        let header_lines = || {
            text.split('\n')
                .map(|line| line.trim_end_matches('\r'))
                .take_while(|line| !line.starts_with("@@ "))
        };

        header_lines()
            .find_map(|line| line.strip_prefix("+++ b/"))
            .or_else(|| header_lines().find_map(|line| line.strip_prefix("--- a/")))
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    }

    /// The hunk whose header equals `header` exactly
    pub fn find_hunk(&self, header: &HunkHeader) -> Option<&DiffHunk> {
        self.hunks.iter().find(|hunk| hunk.header == *header)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn parse_single_hunk() {
        let diff = r#"diff --git a/flake.nix b/flake.nix
index abc1234..def5678 100644
--- a/flake.nix
+++ b/flake.nix
@@ -136,0 +137 @@
+      debug = true;
"#;
        let file_diff = FileDiff::parse(diff).unwrap();
        assert_eq!(file_diff.path, "flake.nix");
        assert_eq!(file_diff.hunks.len(), 1);
        assert_eq!(file_diff.hunks[0].header, HunkHeader::new(136, 0, 137, 1));
        assert_eq!(file_diff.hunks[0].diff, "@@ -136,0 +137 @@\n+      debug = true;\n");
    }

    #[test]
    fn parse_multiple_hunks() {
        let diff = r#"diff --git a/config.nix b/config.nix
index fa2da6e..41114ff 100644
--- a/config.nix
+++ b/config.nix
@@ -2,0 +3 @@ line 2
+# FIRST INSERTION
@@ -8,0 +10 @@ line 8
+# SECOND INSERTION
"#;
        let file_diff = FileDiff::parse(diff).unwrap();
        assert_eq!(file_diff.path, "config.nix");
        assert_eq!(
            file_diff
                .hunks
                .iter()
                .map(|hunk| hunk.header)
                .collect::<Vec<_>>(),
            vec![HunkHeader::new(2, 0, 3, 1), HunkHeader::new(8, 0, 10, 1)]
        );
        assert_eq!(file_diff.hunks[1].diff, "@@ -8,0 +10 @@ line 8\n+# SECOND INSERTION\n");
    }

    #[test]
    fn parse_deleted_file_uses_old_path() {
        let diff = r#"diff --git a/gone.txt b/gone.txt
deleted file mode 100644
index 3b18e51..0000000
--- a/gone.txt
+++ /dev/null
@@ -1,2 +0,0 @@
-hello
-world
"#;
        let file_diff = FileDiff::parse(diff).unwrap();
        assert_eq!(file_diff.path, "gone.txt");
        assert_eq!(file_diff.hunks[0].header, HunkHeader::new(1, 2, 0, 0));
    }

    #[test]
    fn parse_binary_file_has_no_hunks() {
        let diff = "diff --git a/logo.png b/logo.png\nindex 1..2 100644\n--- a/logo.png\n+++ b/logo.png\nBinary files differ\n";
        let file_diff = FileDiff::parse(diff).unwrap();
        assert_eq!(file_diff.path, "logo.png");
        assert!(file_diff.hunks.is_empty());
    }

    #[test]
    fn parse_without_path_fails() {
        let result = FileDiff::parse("@@ -1 +1 @@\n-a\n+b\n");
        assert!(matches!(result, Err(DiffError::MissingPath)));
    }

    #[test]
    fn plus_lines_in_body_are_not_paths() {
        let diff = "diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-x\n+++ b/elsewhere\n";
        let file_diff = FileDiff::parse(diff).unwrap();
        assert_eq!(file_diff.path, "a.txt");
    }

    #[test]
    fn find_hunk_matches_exact_header() {
        let diff = "diff --git a/a.txt b/a.txt\n--- a/a.txt\n+++ b/a.txt\n@@ -1 +1 @@\n-x\n+y\n@@ -9,0 +10 @@\n+z\n";
        let file_diff = FileDiff::parse(diff).unwrap();
        assert!(file_diff.find_hunk(&HunkHeader::new(9, 0, 10, 1)).is_some());
        assert!(file_diff.find_hunk(&HunkHeader::new(9, 0, 10, 2)).is_none());
    }
}
