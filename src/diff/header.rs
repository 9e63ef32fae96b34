use super::line::LineId;
use super::{DiffError, HunkError};
use nom::bytes::complete::tag;
use nom::character::complete::{self, char};
use nom::combinator::{map, opt};
use nom::sequence::{delimited, preceded, separated_pair};
use nom::{IResult, Parser};
use std::fmt;
use std::str::FromStr;

/// The four numbers of a `@@ -old_start,old_lines +new_start,new_lines @@` line.
///
/// A count of 0 means that side has no lines (pure addition or pure
/// deletion).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HunkHeader {
    pub old_start: u32,
    pub old_lines: u32,
    pub new_start: u32,
    pub new_lines: u32,
}

impl HunkHeader {
    pub const fn new(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> Self {
        Self {
            old_start,
            old_lines,
            new_start,
            new_lines,
        }
    }

    /// Parse a hunk header line, returning the header and any trailing
    /// section heading git appends after the closing `@@`.
    ///
    /// Missing counts default to 1, as in `@@ -15 +14,0 @@`.
    ///
    /// # Errors
    ///
    /// Returns [`DiffError::MalformedDiff`] if the line does not start with
    /// a well-formed header.
    pub fn parse_line(line: &str) -> Result<(Self, Option<&str>), DiffError> {
        let (rest, header) = header(line).map_err(|_| DiffError::MalformedDiff {
            header: line.trim_end().to_string(),
        })?;
        let comment = rest.trim();
        Ok((header, (!comment.is_empty()).then_some(comment)))
    }

    /// True if `other`'s old and new spans both lie inside this header's spans
    pub fn contains_hunk(&self, other: &HunkHeader) -> bool {
        let (old_start, old_end) = span(self.old_start, self.old_lines);
        let (new_start, new_end) = span(self.new_start, self.new_lines);
        let (other_old_start, other_old_end) = span(other.old_start, other.old_lines);
        let (other_new_start, other_new_end) = span(other.new_start, other.new_lines);

        old_start <= other_old_start
            && other_old_end <= old_end
            && new_start <= other_new_start
            && other_new_end <= new_end
    }

    /// True if every coordinate `line` carries falls inside the matching span.
    ///
    /// # Errors
    ///
    /// Returns [`HunkError::InvalidLineId`] if `line` has no coordinates.
    pub fn contains_line(&self, line: &LineId) -> Result<bool, HunkError> {
        let in_old = |n: u32| in_span(n, span(self.old_start, self.old_lines));
        let in_new = |n: u32| in_span(n, span(self.new_start, self.new_lines));

        match (line.old_line, line.new_line) {
            (None, None) => Err(HunkError::InvalidLineId),
            (Some(old), None) => Ok(in_old(old)),
            (None, Some(new)) => Ok(in_new(new)),
            (Some(old), Some(new)) => Ok(in_old(old) && in_new(new)),
        }
    }

    /// Position used to interleave commit-anchored headers in file order.
    ///
    /// Those headers zero out one side, so the other side's start is the
    /// only meaningful position.
    fn sort_key(&self) -> u32 {
        if self.old_start != 0 {
            self.old_start
        } else {
            self.new_start
        }
    }
}

/// Inclusive `start..=start + lines - 1` span; empty spans end before they start
fn span(start: u32, lines: u32) -> (i64, i64) {
    let start = i64::from(start);
    (start, start + i64::from(lines) - 1)
}

fn in_span(line: u32, (start, end): (i64, i64)) -> bool {
    let line = i64::from(line);
    start <= line && line <= end
}

/// `start` or `start,lines`
fn range(input: &str) -> IResult<&str, (u32, u32)> {
    map(
        (complete::u32, opt(preceded(char(','), complete::u32))),
        |(start, lines)| (start, lines.unwrap_or(1)),
    )
    .parse(input)
}

fn header(input: &str) -> IResult<&str, HunkHeader> {
    map(
        delimited(
            tag("@@ -"),
            separated_pair(range, tag(" +"), range),
            tag(" @@"),
        ),
        |((old_start, old_lines), (new_start, new_lines))| {
            HunkHeader::new(old_start, old_lines, new_start, new_lines)
        },
    )
    .parse(input)
}

impl FromStr for HunkHeader {
    type Err = DiffError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_line(s).map(|(header, _)| header)
    }
}

impl fmt::Display for HunkHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{} +{} @@",
            format_range(self.old_start, self.old_lines),
            format_range(self.new_start, self.new_lines)
        )
    }
}

/// Git elides a count of exactly one
fn format_range(start: u32, lines: u32) -> String {
    match lines {
        1 => start.to_string(),
        n => format!("{},{}", start, n),
    }
}

/// True iff `b` lies inside `a` on both sides
pub fn hunk_contains_hunk(a: &HunkHeader, b: &HunkHeader) -> bool {
    a.contains_hunk(b)
}

/// True iff the coordinates of `line` fall inside `hunk`
///
/// # Errors
///
/// Returns [`HunkError::InvalidLineId`] if `line` has no coordinates.
pub fn hunk_contains_line(hunk: &HunkHeader, line: &LineId) -> Result<bool, HunkError> {
    hunk.contains_line(line)
}

/// Sort headers into file order.
///
/// Each header is keyed by its non-zero start, so a commit-anchored removal
/// `-3` and addition `+5` interleave by position. The sort is stable, so
/// headers with equal keys keep their relative order.
pub fn order_headers(headers: &mut [HunkHeader]) {
    headers.sort_by_key(HunkHeader::sort_key);
}
