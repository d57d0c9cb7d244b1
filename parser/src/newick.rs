//! Newick tree text helpers: tree-list files and branch-length statistics.

use phylofeat_core::BranchLengthStats;

use crate::error::{ParseError, Result};
use crate::stats::{mean, std_dev};

/// Returns the trees of a tree-list file, one per non-empty line, trimmed.
///
/// Order is preserved; it matches the order of the log-derived values of
/// the same run.
pub fn read_tree_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Returns the first tree of a tree file.
///
/// # Errors
///
/// Returns [`ParseError::EmptyTreeFile`] if the file has no tree.
pub fn first_tree(text: &str) -> Result<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
        .ok_or(ParseError::EmptyTreeFile)
}

/// Returns every `:length` value of a newick string, in text order.
///
/// Quoted labels and `[...]` comments are skipped.
///
/// # Errors
///
/// Returns [`ParseError::MalformedNewick`] for an unterminated quote or
/// comment, or a length that is not a number.
pub fn branch_lengths(newick: &str) -> Result<Vec<f64>> {
    let bytes = newick.as_bytes();
    let mut lengths = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\'' => {
                // '' inside a quoted label is an escaped quote
                i += 1;
                loop {
                    match bytes.get(i) {
                        None => return Err(ParseError::MalformedNewick("unterminated quote".into())),
                        Some(b'\'') if bytes.get(i + 1) == Some(&b'\'') => i += 2,
                        Some(b'\'') => break,
                        Some(_) => i += 1,
                    }
                }
                i += 1;
            }
            b'[' => {
                let close = newick[i..]
                    .find(']')
                    .ok_or_else(|| ParseError::MalformedNewick("unterminated comment".into()))?;
                i += close + 1;
            }
            b':' => {
                let start = i + 1;
                let end = newick[start..]
                    .find(|c: char| matches!(c, ',' | ')' | ';' | '[') || c.is_whitespace())
                    .map_or(newick.len(), |offset| start + offset);
                let token = &newick[start..end];
                let length = token.parse::<f64>().map_err(|_| {
                    ParseError::MalformedNewick(format!("invalid branch length '{token}'"))
                })?;
                lengths.push(length);
                i = end;
            }
            _ => i += 1,
        }
    }

    Ok(lengths)
}

/// Computes min/max/mean/std/total of the branch lengths of a tree.
///
/// The standard deviation is the population standard deviation.
///
/// # Examples
///
/// ```
/// use phylofeat_parser::newick::branch_length_stats;
///
/// let stats = branch_length_stats("((a:0.1,b:0.3):0.2,c:0.4);").unwrap();
/// assert_eq!(stats.min, 0.1);
/// assert_eq!(stats.max, 0.4);
/// assert!((stats.total - 1.0).abs() < 1e-12);
/// ```
pub fn branch_length_stats(newick: &str) -> Result<BranchLengthStats> {
    let lengths = branch_lengths(newick)?;
    let mean = mean(&lengths).ok_or(ParseError::MissingBranchLengths)?;
    let std = std_dev(&lengths).ok_or(ParseError::MissingBranchLengths)?;

    Ok(BranchLengthStats {
        min: lengths.iter().copied().fold(f64::INFINITY, f64::min),
        max: lengths.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        mean,
        std,
        total: lengths.iter().sum(),
    })
}
