use super::DiffError;
use super::file::FileDiff;

/// A complete git diff containing changes for multiple files
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diff {
    pub files: Vec<FileDiff>,
}

impl Diff {
    /// Parse complete git diff output into file diffs.
    ///
    /// Lines keep their original terminators so CRLF content survives.
    ///
    /// # Errors
    ///
    /// Returns the first [`DiffError`] hit while parsing a file section.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let mut sections: Vec<String> = Vec::new();

        for line in text.split_inclusive('\n') {
            if line.starts_with("diff --git ") {
                sections.push(line.to_string());
            } else if let Some(current) = sections.last_mut() {
                current.push_str(line);
            }
        }

        let files = sections
            .iter()
            .map(|section| FileDiff::parse(section))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Diff { files })
    }

    /// The diff of the file at `path`, if it changed
    pub fn file(&self, path: &str) -> Option<&FileDiff> {
        self.files.iter().find(|file| file.path == path)
    }
}
