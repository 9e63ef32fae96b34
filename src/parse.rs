//! `FILE:REFS` line references, the CLI's way of naming changed lines.
//!
//! `REFS` is a comma separated list; each entry names added lines by their
//! new line number and removed lines by their old line number:
//!
//! | Entry    | Selects                               |
//! |----------|---------------------------------------|
//! | `N`      | added line `N`                        |
//! | `-N`     | removed line `N`                      |
//! | `N..M`   | added lines `N` through `M`           |
//! | `-N..-M` | removed lines `N` through `M`         |
//!
//! Line numbers start at 1; the file part may not be blank.
//!
//! ```
//! use git_partial::diff::LineId;
//! use git_partial::parse::{parse_file_refs, LineRef};
//! use std::num::NonZeroU32;
//!
//! let refs = parse_file_refs("file.nix:-10,12..13").unwrap();
//! assert_eq!(refs.refs[0], LineRef::Delete(NonZeroU32::new(10).unwrap()));
//! assert_eq!(
//!     refs.line_ids(),
//!     vec![LineId::removed(10), LineId::added(12), LineId::added(13)]
//! );
//! ```

use crate::diff::LineId;
use error_set::error_set;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1};
use nom::combinator::{all_consuming, map, opt};
use nom::sequence::preceded;
use nom::{IResult, Parser};
use std::num::NonZeroU32;

error_set! {
    /// Errors from parsing `FILE:REFS`
    ParseError := {
        /// No `:` between file and references
        #[display("Invalid format '{input}': expected 'file:refs'")]
        InvalidFormat { input: String },
        /// Blank file part
        #[display("Invalid format '{input}': file name cannot be empty")]
        EmptyFileName { input: String },
        #[display("No line references provided")]
        EmptyRefs,
        /// Not a number, zero, or too large for a line number
        #[display("Invalid line number '{value}'")]
        InvalidLineNumber { value: String },
        #[display("Invalid range {start}..{end}: start must be <= end")]
        InvalidRange { start: u32, end: u32 },
        /// `-N..M`: a removed range must end in a removed line
        #[display("Delete reference must start with '-', got '{value}'")]
        InvalidDeleteRef { value: String },
    }
}

/// One entry of `REFS`; ranges are inclusive
#[derive(Debug, Clone, PartialEq)]
pub enum LineRef {
    Add(NonZeroU32),
    AddRange(NonZeroU32, NonZeroU32),
    Delete(NonZeroU32),
    DeleteRange(NonZeroU32, NonZeroU32),
}

impl LineRef {
    /// Expand into the line ids this reference names, in ascending order
    pub fn line_ids(&self) -> Vec<LineId> {
        match *self {
            LineRef::Add(n) => vec![LineId::added(n.get())],
            LineRef::AddRange(start, end) => (start.get()..=end.get()).map(LineId::added).collect(),
            LineRef::Delete(n) => vec![LineId::removed(n.get())],
            LineRef::DeleteRange(start, end) => {
                (start.get()..=end.get()).map(LineId::removed).collect()
            }
        }
    }
}

/// A parsed `FILE:REFS` argument
#[derive(Debug, Clone, PartialEq)]
pub struct FileLineRefs {
    pub file: String,
    pub refs: Vec<LineRef>,
}

impl FileLineRefs {
    /// Every referenced line, in the order the references were written
    pub fn line_ids(&self) -> Vec<LineId> {
        self.refs.iter().flat_map(LineRef::line_ids).collect()
    }
}

/// Split `input` at its first `:` and parse the references after it.
///
/// Blank entries between commas are skipped.
///
/// # Errors
///
/// Returns [`ParseError`] for a missing `:`, a blank file, no entries, or
/// any entry that is not a valid reference.
pub fn parse_file_refs(input: &str) -> Result<FileLineRefs, ParseError> {
    let (file, refs) = input
        .split_once(':')
        .ok_or_else(|| ParseError::InvalidFormat {
            input: input.to_string(),
        })?;

    let file = file.trim();
    if file.is_empty() {
        return Err(ParseError::EmptyFileName {
            input: input.to_string(),
        });
    }

    Ok(FileLineRefs {
        file: file.to_string(),
        refs: parse_line_refs(refs)?,
    })
}

fn parse_line_refs(input: &str) -> Result<Vec<LineRef>, ParseError> {
    let refs: Vec<LineRef> = input
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(parse_single_ref)
        .collect::<Result<Vec<_>, _>>()?;

    if refs.is_empty() {
        return Err(ParseError::EmptyRefs);
    }

    Ok(refs)
}

/// A line number with its sign: `(is_deletion, digits)`
type Signed<'a> = (bool, &'a str);

fn signed_number(input: &str) -> IResult<&str, Signed<'_>> {
    (map(opt(char('-')), |sign| sign.is_some()), digit1).parse(input)
}

/// `[-]N` optionally followed by `..[-]M`
fn line_ref(input: &str) -> IResult<&str, (Signed<'_>, Option<Signed<'_>>)> {
    all_consuming((signed_number, opt(preceded(tag(".."), signed_number)))).parse(input)
}

/// One comma separated entry
fn parse_single_ref(input: &str) -> Result<LineRef, ParseError> {
    let (_, (start, end)) = line_ref(input).map_err(|_| ParseError::InvalidLineNumber {
        value: input.to_string(),
    })?;

    let (deletion, digits) = start;
    let start = line_number(digits, input)?;
    let Some((end_deletion, end_digits)) = end else {
        return Ok(if deletion {
            LineRef::Delete(start)
        } else {
            LineRef::Add(start)
        });
    };

    match (deletion, end_deletion) {
        (true, false) => {
            return Err(ParseError::InvalidDeleteRef {
                value: end_digits.to_string(),
            });
        }
        (false, true) => {
            return Err(ParseError::InvalidLineNumber {
                value: format!("-{}", end_digits),
            });
        }
        _ => {}
    }

    let end = line_number(end_digits, input)?;
    if start > end {
        return Err(ParseError::InvalidRange {
            start: start.get(),
            end: end.get(),
        });
    }

    Ok(if deletion {
        LineRef::DeleteRange(start, end)
    } else {
        LineRef::AddRange(start, end)
    })
}

/// Digits as a non-zero line number; `reference` is reported on failure
fn line_number(digits: &str, reference: &str) -> Result<NonZeroU32, ParseError> {
    digits
        .parse::<NonZeroU32>()
        .map_err(|_| ParseError::InvalidLineNumber {
            value: reference.to_string(),
        })
}
