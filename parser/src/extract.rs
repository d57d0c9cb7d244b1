//! Line-oriented value extraction.
//!
//! Every parser in this crate is a list of [`LineRule`]s: a marker string and
//! the rule that turns a matching line into a token. Lines that contain no
//! known marker are ignored, so unknown or new log lines never cause a
//! failure.
//!
//! # Examples
//!
//! ```
//! use phylofeat_parser::extract::{get_all_values, get_single_value};
//!
//! let log = "\
//! Optimal log-likelihood: -1021.5
//! some unrelated line
//! Optimal log-likelihood: -1019.25
//! ";
//! assert_eq!(get_single_value(log, "Optimal log-likelihood:").unwrap(), -1021.5);
//! assert_eq!(get_all_values(log, "Optimal log-likelihood:").unwrap().len(), 2);
//! assert!(get_all_values(log, "Elapsed time:").unwrap().is_empty());
//! ```

use std::str::FromStr;

use crate::error::{ParseError, Result};

/// How the value token is located on a matching line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// Last whitespace-separated token of the line.
    LastToken,
    /// First whitespace-separated token after the marker.
    TokenAfterMarker,
    /// Everything after the first `:` following the marker, trimmed.
    RestAfterColon,
}

/// A marker string paired with its extraction rule.
#[derive(Debug, Clone, Copy)]
pub struct LineRule<'a> {
    pub marker: &'a str,
    pub extraction: Extraction,
}

impl<'a> LineRule<'a> {
    pub const fn new(marker: &'a str, extraction: Extraction) -> Self {
        Self { marker, extraction }
    }

    /// Returns the raw token if `line` contains the marker.
    ///
    /// A matching line without a token yields `Some("")`, so the caller
    /// reports it as an invalid value rather than a missing marker.
    pub fn token<'l>(&self, line: &'l str) -> Option<&'l str> {
        let start = line.find(self.marker)?;
        let after = &line[start + self.marker.len()..];
        let token = match self.extraction {
            Extraction::LastToken => line.split_whitespace().next_back().unwrap_or_default(),
            Extraction::TokenAfterMarker => after.split_whitespace().next().unwrap_or_default(),
            Extraction::RestAfterColon => match after.find(':') {
                Some(colon) => after[colon + 1..].trim(),
                None => after.trim(),
            },
        };
        Some(token)
    }

    /// Parses the token of a matching line as `T`.
    ///
    /// Returns `None` when the line does not contain the marker.
    pub fn parse<T: FromStr>(&self, line: &str) -> Option<Result<T>> {
        let token = self.token(line)?;
        Some(
            token
                .parse::<T>()
                .map_err(|_| ParseError::invalid(self.marker, token)),
        )
    }
}

/// Parses the value of the first line, in file order, matched by any rule.
///
/// Rules are tried in order for each line. Returns `None` when no line
/// matches.
pub fn first_match<T: FromStr>(text: &str, rules: &[LineRule<'_>]) -> Option<Result<T>> {
    text.lines()
        .find_map(|line| rules.iter().find_map(|rule| rule.parse(line)))
}

/// Parses the values of every line matched by any rule, in file order.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] on the first malformed token.
pub fn all_matches<T: FromStr>(text: &str, rules: &[LineRule<'_>]) -> Result<Vec<T>> {
    text.lines()
        .filter_map(|line| rules.iter().find_map(|rule| rule.parse(line)))
        .collect()
}

/// Extracts the trailing number of `line`, which must contain `marker`.
pub fn value_from_line(line: &str, marker: &str) -> Result<f64> {
    LineRule::new(marker, Extraction::LastToken)
        .parse(line.trim())
        .unwrap_or_else(|| Err(ParseError::missing(marker)))
}

/// Returns the trailing number of the first line containing `marker`.
///
/// # Errors
///
/// Returns [`ParseError::MissingMarker`] if no line contains the marker and
/// [`ParseError::InvalidValue`] if the trailing token is not a number.
pub fn get_single_value(text: &str, marker: &str) -> Result<f64> {
    first_match(text, &[LineRule::new(marker, Extraction::LastToken)])
        .unwrap_or_else(|| Err(ParseError::missing(marker)))
}

/// String variant of [`get_single_value`].
pub fn get_single_string(text: &str, marker: &str) -> Result<String> {
    first_match(text, &[LineRule::new(marker, Extraction::LastToken)])
        .unwrap_or_else(|| Err(ParseError::missing(marker)))
}

/// Returns the trailing numbers of every line containing `marker`.
///
/// No match is not an error: the result is empty and the caller decides
/// whether that is fatal.
pub fn get_all_values(text: &str, marker: &str) -> Result<Vec<f64>> {
    all_matches(text, &[LineRule::new(marker, Extraction::LastToken)])
}
