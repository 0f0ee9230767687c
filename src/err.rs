//! Error interface for this crate.
//!
//! This module re-exports every error type of the crate, and defines:
//! - [`Error`]: the trait each of those errors implements, which exposes
//!     a source span and a help message on top of [`std::error::Error`],
//! - [`ErrSpan`]: the source location(s) an error points at.
use std::borrow::Cow;
use std::ops::Range;

pub use crate::parse::lex::LexErr;
pub use crate::parse::{ParseErr, ParseErrKind};
pub use crate::asm::{AsmErr, AsmErrKind};
pub use crate::sim::SimErr;
pub use crate::machine::AssembleErr;

/// Unified error interface for all errors in this crate.
///
/// Note that the [`std::fmt::Display`] implementation is used for the brief message,
/// and the other methods of this trait supply the extra information
/// a front end would show alongside it.
pub trait Error: std::error::Error {
    /// The range(s) of source code this error refers to.
    ///
    /// This is `None` for errors that do not come from assembly source
    /// (e.g., simulation errors).
    fn span(&self) -> Option<ErrSpan> {
        None
    }

    /// A help message for the error, if one exists.
    fn help(&self) -> Option<Cow<str>>;
}

/// The source span(s) an error refers to.
///
/// Most errors point at one range, but some (such as duplicate labels)
/// point at several.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub enum ErrSpan {
    /// One contiguous range.
    One(Range<usize>),
    /// Two contiguous ranges.
    Two([Range<usize>; 2]),
    /// Any number of ranges.
    Many(Vec<Range<usize>>)
}
impl ErrSpan {
    /// Gets the first range of the span, if one exists.
    pub fn first(&self) -> Option<Range<usize>> {
        match self {
            ErrSpan::One(r) => Some(r.clone()),
            ErrSpan::Two([r, _]) => Some(r.clone()),
            ErrSpan::Many(rs) => rs.first().cloned(),
        }
    }

    /// Iterates over all of the ranges of the span.
    pub fn iter(&self) -> impl Iterator<Item=&Range<usize>> + '_ {
        match self {
            ErrSpan::One(r) => std::slice::from_ref(r).iter(),
            ErrSpan::Two(r) => r.iter(),
            ErrSpan::Many(r) => r.iter(),
        }
    }
}
impl From<Range<usize>> for ErrSpan {
    fn from(value: Range<usize>) -> Self {
        ErrSpan::One(value)
    }
}
impl From<[Range<usize>; 2]> for ErrSpan {
    fn from(value: [Range<usize>; 2]) -> Self {
        ErrSpan::Two(value)
    }
}
impl From<Vec<Range<usize>>> for ErrSpan {
    fn from(value: Vec<Range<usize>>) -> Self {
        match <[_; 2]>::try_from(value) {
            Ok(arr) => ErrSpan::Two(arr),
            Err(mut value) => match value.len() {
                1 => ErrSpan::One(value.remove(0)),
                _ => ErrSpan::Many(value)
            }
        }
    }
}

/// Computes the 0-indexed (line, column) pair of a byte index in a source string.
///
/// If the index is past the end of the string, the position just past
/// the last character is returned.
///
/// ```
/// use riscvm::err::line_col;
///
/// let src = "li a0, 1\nli a1, 2\n";
/// assert_eq!(line_col(src, 0), (0, 0));
/// assert_eq!(line_col(src, 12), (1, 3));
/// ```
pub fn line_col(src: &str, index: usize) -> (usize, usize) {
    let mut index = index.min(src.len());
    while !src.is_char_boundary(index) {
        index -= 1;
    }
    let before = &src[..index];

    let line = before.matches('\n').count();
    let col = match before.rfind('\n') {
        Some(nl) => index - nl - 1,
        None => index,
    };
    (line, col)
}

/// Writes a report of the error with its location and help message, relative to the given source.
///
/// The report looks like:
/// ```text
/// error: undefined symbol 'end'
///   --> 3:6
///   help: define this symbol with a label (`end:`) or with `.set end, VALUE`
/// ```
pub fn report<E: Error + ?Sized>(err: &E, src: &str) -> String {
    use std::fmt::Write;

    let mut out = format!("error: {err}");
    if let Some(span) = err.span() {
        for r in span.iter() {
            let (line, col) = line_col(src, r.start);
            let _ = write!(out, "\n  --> {}:{}", line + 1, col + 1);
        }
    }
    if let Some(help) = err.help() {
        let _ = write!(out, "\n  help: {help}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{line_col, ErrSpan};

    #[test]
    fn test_span_from_vec() {
        assert_eq!(ErrSpan::from(vec![0..1]), ErrSpan::One(0..1));
        assert_eq!(ErrSpan::from(vec![0..1, 2..3]), ErrSpan::Two([0..1, 2..3]));
        assert_eq!(ErrSpan::from(vec![0..1, 2..3, 4..5]), ErrSpan::Many(vec![0..1, 2..3, 4..5]));
        assert_eq!(ErrSpan::from(vec![]).first(), None);
    }

    #[test]
    fn test_line_col() {
        let src = "a\nbc\n\ndef";
        assert_eq!(line_col(src, 0), (0, 0));
        assert_eq!(line_col(src, 2), (1, 0));
        assert_eq!(line_col(src, 3), (1, 1));
        assert_eq!(line_col(src, 5), (2, 0));
        assert_eq!(line_col(src, 8), (3, 2));
        assert_eq!(line_col(src, 100), (3, 3));
    }
}
