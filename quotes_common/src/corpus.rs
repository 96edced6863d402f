//! Quote corpus parsing shared between the server loader and tooling.
//!
//! Format: one quote per line. Blank lines and lines starting with `#` are skipped.
//! A line may carry an explicit id as `<id>|<text>`; otherwise it gets the previous
//! id plus one (the first quote gets `1`).

use std::collections::HashSet;
use std::io::BufRead;

use crate::error::QuoteError;
use crate::quote::{Quote, QuoteId};

const COMMENT: char = '#';
const ID_SEPARATOR: char = '|';

/// Trait providing corpus parsing for quotes.
pub trait QuoteParser {
    /// Parses quotes from a buffered reader.
    ///
    /// Returns an error on I/O failure, duplicate ids, or an empty quote text.
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Quote>, QuoteError>;
}

impl QuoteParser for Quote {
    fn parse_from_file<R: BufRead>(reader: R) -> Result<Vec<Self>, QuoteError> {
        let mut quotes = Vec::new();
        let mut seen = HashSet::new();
        let mut next_id: QuoteId = 1;

        for (line_no, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(QuoteError::Io)?;
            let trimmed_line = line.trim();
            if trimmed_line.is_empty() || trimmed_line.starts_with(COMMENT) {
                continue;
            }

            let (id, text) = split_id(trimmed_line).unwrap_or((next_id, trimmed_line));
            if text.is_empty() {
                return Err(QuoteError::ParseCorpus(format!(
                    "line {}: empty quote text",
                    line_no + 1
                )));
            }
            if !seen.insert(id) {
                return Err(QuoteError::ParseCorpus(format!(
                    "line {}: duplicate quote id {}",
                    line_no + 1,
                    id
                )));
            }

            quotes.push(Quote::new(id, text));
            next_id = id + 1;
        }
        Ok(quotes)
    }
}

/// Splits `12|text` into its id and text; `None` when the prefix is not a number.
fn split_id(line: &str) -> Option<(QuoteId, &str)> {
    let (prefix, text) = line.split_once(ID_SEPARATOR)?;
    let id = prefix.trim().parse::<QuoteId>().ok()?;
    Some((id, text.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn assigns_sequential_ids_and_skips_comments() {
        let input = "# Berra\nA man's got to believe in something\n\n  It ain't over till it's over  \n";
        let quotes = Quote::parse_from_file(Cursor::new(input)).unwrap();
        assert_eq!(
            quotes,
            vec![
                Quote::new(1, "A man's got to believe in something"),
                Quote::new(2, "It ain't over till it's over"),
            ]
        );
    }

    #[test]
    fn explicit_ids_reset_the_sequence() {
        let input = "10|first\nsecond\n3|third\nfourth\n";
        let ids: Vec<QuoteId> = Quote::parse_from_file(Cursor::new(input))
            .unwrap()
            .into_iter()
            .map(|q| q.id)
            .collect();
        assert_eq!(ids, vec![10, 11, 3, 4]);
    }

    #[test]
    fn non_numeric_prefix_is_part_of_the_text() {
        let quotes = Quote::parse_from_file(Cursor::new("Yes|No, maybe\n")).unwrap();
        assert_eq!(quotes, vec![Quote::new(1, "Yes|No, maybe")]);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = Quote::parse_from_file(Cursor::new("1|a\n1|b\n"));
        assert!(matches!(result, Err(QuoteError::ParseCorpus(_))));
    }

    #[test]
    fn empty_text_is_rejected() {
        let result = Quote::parse_from_file(Cursor::new("5|   \n"));
        assert!(matches!(result, Err(QuoteError::ParseCorpus(_))));
    }
}
