//! Splits delimited text into key/value pairs and feeds them to
//! handlers.

use regex::Regex;

use crate::error::ParseError;
use crate::handler::{KeyValueHandler, Pair};

/// Extracts key/value pairs from a piece of text and dispatches each
/// pair to every handler, in order.
pub trait KeyValueParser {
    /// Parses `input`, invoking the handlers once per extracted pair.
    fn parse(
        &self,
        input: &str,
        handlers: &mut [&mut dyn KeyValueHandler],
    ) -> Result<(), ParseError>;
}

/// Regex-delimited parser covering both authorization headers and
/// query strings.
///
/// Tokens that do not split into a usable pair are dropped rather than
/// reported: a token with an empty key, or one containing the pair
/// delimiter more than once, contributes nothing. A token with no value
/// yields the empty string as its value.
#[derive(Debug, Clone)]
pub struct StandardKeyValueParser {
    delimiter: Regex,
    kv_delimiter: Regex,
}

impl StandardKeyValueParser {
    /// Builds a parser from a pair-separator pattern and a key/value
    /// separator pattern.
    pub fn new(delimiter: &str, kv_delimiter: &str) -> Result<Self, ParseError> {
        Ok(Self {
            delimiter: Regex::new(delimiter)?,
            kv_delimiter: Regex::new(kv_delimiter)?,
        })
    }

    /// Parser for `Authorization` header payloads: comma-separated
    /// pairs with optional whitespace around both delimiters.
    pub fn header() -> Self {
        Self::new(r"\s*,\s*", r"\s*=\s*").expect("hard-coded patterns are valid")
    }

    /// Parser for query strings and form-encoded bodies.
    pub fn query() -> Self {
        Self::new("&", "=").expect("hard-coded patterns are valid")
    }
}

impl KeyValueParser for StandardKeyValueParser {
    fn parse(
        &self,
        input: &str,
        handlers: &mut [&mut dyn KeyValueHandler],
    ) -> Result<(), ParseError> {
        if input.is_empty() {
            return Ok(());
        }
        for token in split_dropping_trailing_empties(&self.delimiter, input) {
            let pieces = split_dropping_trailing_empties(&self.kv_delimiter, token);
            match pieces.as_slice() {
                [key, value] if !key.is_empty() => dispatch(handlers, key, value),
                [key] if !key.is_empty() => dispatch(handlers, key, ""),
                _ => {}
            }
        }
        Ok(())
    }
}

/// Replays a fixed list of pairs, ignoring the input. A test seam for
/// code that takes a parser.
#[derive(Debug, Clone, Default)]
pub struct ConstKeyValueParser {
    pairs: Vec<Pair>,
}

impl ConstKeyValueParser {
    /// Creates a parser that always emits `pairs`.
    pub fn new(pairs: Vec<Pair>) -> Self {
        Self { pairs }
    }
}

impl KeyValueParser for ConstKeyValueParser {
    fn parse(
        &self,
        _input: &str,
        handlers: &mut [&mut dyn KeyValueHandler],
    ) -> Result<(), ParseError> {
        for pair in &self.pairs {
            dispatch(handlers, &pair.key, &pair.value);
        }
        Ok(())
    }
}

/// Splits on the pattern, then removes empty trailing pieces so `"a="`
/// splits to `["a"]` and `"="` splits to nothing at all.
fn split_dropping_trailing_empties<'a>(pattern: &Regex, input: &'a str) -> Vec<&'a str> {
    let mut pieces: Vec<&str> = pattern.split(input).collect();
    while pieces.last().is_some_and(|piece| piece.is_empty()) {
        pieces.pop();
    }
    pieces
}

fn dispatch(handlers: &mut [&mut dyn KeyValueHandler], key: &str, value: &str) {
    for handler in handlers.iter_mut() {
        handler.handle(key, value);
    }
}

#[cfg(test)]
mod tests {
    use crate::handler::DuplicateKeyValueHandler;

    use super::*;

    fn parse_query(input: &str) -> Vec<Pair> {
        let mut collector = DuplicateKeyValueHandler::new();
        StandardKeyValueParser::query()
            .parse(input, &mut [&mut collector])
            .unwrap();
        collector.into_pairs()
    }

    fn parse_header(input: &str) -> Vec<Pair> {
        let mut collector = DuplicateKeyValueHandler::new();
        StandardKeyValueParser::header()
            .parse(input, &mut [&mut collector])
            .unwrap();
        collector.into_pairs()
    }

    #[test]
    fn test_should_parse_simple_query_pairs() {
        assert_eq!(
            parse_query("a=b&c=d"),
            vec![Pair::new("a", "b"), Pair::new("c", "d")]
        );
    }

    #[test]
    fn test_should_default_missing_values_to_empty() {
        assert_eq!(
            parse_query("a=b&c=&d"),
            vec![
                Pair::new("a", "b"),
                Pair::new("c", ""),
                Pair::new("d", ""),
            ]
        );
    }

    #[test]
    fn test_should_drop_tokens_with_empty_keys() {
        assert_eq!(parse_query("=b&c=d"), vec![Pair::new("c", "d")]);
        assert_eq!(parse_query("=&c=d"), vec![Pair::new("c", "d")]);
    }

    #[test]
    fn test_should_drop_tokens_with_extra_delimiters() {
        assert_eq!(parse_query("a=b=c&d=e"), vec![Pair::new("d", "e")]);
    }

    #[test]
    fn test_should_treat_trailing_delimiter_as_missing_value() {
        // "a=b=" loses only the trailing empty piece.
        assert_eq!(parse_query("a=b="), vec![Pair::new("a", "b")]);
        assert_eq!(parse_query("a="), vec![Pair::new("a", "")]);
    }

    #[test]
    fn test_should_ignore_empty_input_and_empty_tokens() {
        assert_eq!(parse_query(""), vec![]);
        assert_eq!(
            parse_query("a=b&&c=d"),
            vec![Pair::new("a", "b"), Pair::new("c", "d")]
        );
    }

    #[test]
    fn test_should_parse_header_pairs_with_loose_whitespace() {
        assert_eq!(
            parse_header("a=\"b\" , c = d"),
            vec![Pair::new("a", "\"b\""), Pair::new("c", "d")]
        );
    }

    #[test]
    fn test_should_feed_every_handler() {
        let mut first = DuplicateKeyValueHandler::new();
        let mut second = DuplicateKeyValueHandler::new();
        StandardKeyValueParser::query()
            .parse("a=b", &mut [&mut first, &mut second])
            .unwrap();
        assert_eq!(first.into_pairs(), vec![Pair::new("a", "b")]);
        assert_eq!(second.into_pairs(), vec![Pair::new("a", "b")]);
    }

    #[test]
    fn test_should_reject_invalid_delimiter_patterns() {
        assert!(StandardKeyValueParser::new("[", "=").is_err());
    }

    #[test]
    fn test_should_replay_const_pairs_regardless_of_input() {
        let parser = ConstKeyValueParser::new(vec![Pair::new("k", "v")]);
        let mut collector = DuplicateKeyValueHandler::new();
        parser.parse("ignored", &mut [&mut collector]).unwrap();
        assert_eq!(collector.into_pairs(), vec![Pair::new("k", "v")]);
    }
}
