use super::DiffError;
use super::header::HunkHeader;
use super::line::{LineId, LineKind};

/// One body line of a hunk with its address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub id: LineId,
    /// Line text without the leading `+`/`-`/` ` marker. A `\r` from a
    /// CRLF diff is kept as-is.
    pub content: String,
}

/// Consecutive body lines of the same kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSection {
    pub kind: LineKind,
    pub lines: Vec<DiffLine>,
}

/// A single hunk parsed into addressable lines.
///
/// Recomputed from text on every query and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDiff {
    pub header: HunkHeader,
    /// Section heading git prints after the closing `@@`
    pub comment: Option<String>,
    pub sections: Vec<ContentSection>,
}

impl ParsedDiff {
    /// Parse hunk text (header line + body lines).
    ///
    /// Lines are split on `\n` only. Context lines that fall past the span
    /// declared by the header are ignored, as are `\ No newline at end of
    /// file` markers.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::MalformedDiff`] if the first line is not a hunk
    /// header, or if the body runs past line `u32::MAX`.
    pub fn parse(text: &str) -> Result<Self, DiffError> {
        let mut lines = text.split_terminator('\n');
        let first = lines.next().unwrap_or_default();
        let (header, comment) = HunkHeader::parse_line(first)?;

        // Exclusive ends; counters run in u64 and must narrow back to u32
        let old_end = u64::from(header.old_start) + u64::from(header.old_lines);
        let new_end = u64::from(header.new_start) + u64::from(header.new_lines);
        let line_number = |n: u64| {
            u32::try_from(n).map_err(|_| DiffError::MalformedDiff {
                header: first.trim_end().to_string(),
            })
        };

        let mut old_line = u64::from(header.old_start);
        let mut new_line = u64::from(header.new_start);
        let mut sections: Vec<ContentSection> = Vec::new();

        for line in lines {
            let (kind, id, content) = if let Some(content) = line.strip_prefix('+') {
                let id = LineId::added(line_number(new_line)?);
                new_line += 1;
                (LineKind::Added, id, content)
            } else if let Some(content) = line.strip_prefix('-') {
                let id = LineId::removed(line_number(old_line)?);
                old_line += 1;
                (LineKind::Removed, id, content)
            } else if line.starts_with('\\') {
                continue;
            } else {
                if old_line >= old_end || new_line >= new_end {
                    continue;
                }
                let id = LineId::context(line_number(old_line)?, line_number(new_line)?);
                old_line += 1;
                new_line += 1;
                (LineKind::Context, id, line.strip_prefix(' ').unwrap_or(line))
            };

            let line = DiffLine {
                id,
                content: content.to_string(),
            };
            match sections.last_mut() {
                Some(section) if section.kind == kind => section.lines.push(line),
                _ => sections.push(ContentSection {
                    kind,
                    lines: vec![line],
                }),
            }
        }

        Ok(ParsedDiff {
            header,
            comment: comment.map(str::to_string),
            sections,
        })
    }

    /// All body lines in diff order
    pub fn lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.sections.iter().flat_map(|section| &section.lines)
    }

    /// Added and removed lines in diff order
    pub fn changed_lines(&self) -> impl Iterator<Item = &DiffLine> {
        self.sections
            .iter()
            .filter(|section| section.kind != LineKind::Context)
            .flat_map(|section| &section.lines)
    }
}

/// Parse hunk text into a [`ParsedDiff`]
///
/// # Errors
///
/// Returns [`DiffError::MalformedDiff`] if the header cannot be parsed.
pub fn parse_diff(text: &str) -> Result<ParsedDiff, DiffError> {
    ParsedDiff::parse(text)
}
