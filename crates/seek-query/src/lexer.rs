//! Query lexer.
//!
//! Converts a query string into a stream of tokens for the parser.

use std::{iter::Peekable, str::Chars};

use crate::error::LexError;

/// A token in the query language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A bare word (search term). May contain `*`/`?` wildcards.
    Term(String),

    /// A quoted phrase (the quotes are stripped, content preserved).
    Phrase(String),

    /// A slash-delimited regular expression (slashes stripped).
    Regex(String),

    /// The OR keyword.
    Or,

    /// Negation prefix (-).
    Not,

    /// Left parenthesis.
    LParen,

    /// Right parenthesis.
    RParen,

    /// Field prefix (e.g. "path:" produces FieldPrefix("path")).
    FieldPrefix(String),

    /// Boost operator with factor (e.g. "^2.5" produces Boost(2.5)).
    Boost(f32),

    /// Fuzzy operator with optional distance (e.g. "~2" produces Fuzzy(Some(2))).
    Fuzzy(Option<u8>),
}

/// Tokenizes a query string.
struct Lexer<'a> {
    /// The original input string.
    input: &'a str,
    /// Character iterator with one-character lookahead.
    chars: Peekable<Chars<'a>>,
    /// Current byte position in input.
    position: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.chars().peekable(),
            position: 0,
        }
    }

    /// Creates an error at a specific position.
    fn error_at(&self, message: impl Into<String>, position: usize) -> LexError {
        LexError::new(message, position, self.input)
    }

    /// Tokenizes the entire input, returning all tokens or an error.
    fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Returns the next token, or None if at end of input.
    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace();

        let Some(&ch) = self.chars.peek() else {
            return Ok(None);
        };

        match ch {
            '"' => self.read_delimited('"', "unclosed quote").map(|s| Some(Token::Phrase(s))),
            '/' => self
                .read_delimited('/', "unclosed regular expression")
                .map(|s| Some(Token::Regex(s))),
            '(' => {
                self.advance();
                Ok(Some(Token::LParen))
            }
            ')' => {
                self.advance();
                Ok(Some(Token::RParen))
            }
            '-' => {
                self.advance();
                Ok(Some(Token::Not))
            }
            '^' => self.read_boost(),
            '~' => self.read_fuzzy(),
            _ => self.read_term_or_keyword(),
        }
    }

    /// Reads text up to an unescaped closing delimiter.
    ///
    /// A backslash before the delimiter keeps the delimiter literally; other
    /// escapes are preserved verbatim for the consumer.
    fn read_delimited(&mut self, delimiter: char, unclosed: &str) -> Result<String, LexError> {
        let start_pos = self.position;
        self.advance();

        let mut content = String::new();

        loop {
            match self.chars.peek().copied() {
                Some(ch) if ch == delimiter => {
                    self.advance();
                    return Ok(content);
                }
                Some('\\') => {
                    self.advance();
                    match self.chars.peek().copied() {
                        Some(next) if next == delimiter => {
                            content.push(next);
                            self.advance();
                        }
                        _ => content.push('\\'),
                    }
                }
                Some(ch) => {
                    content.push(ch);
                    self.advance();
                }
                None => return Err(self.error_at(unclosed, start_pos)),
            }
        }
    }

    /// Reads a term, keyword (OR), or field prefix.
    fn read_term_or_keyword(&mut self) -> Result<Option<Token>, LexError> {
        let mut word = String::new();

        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() || matches!(ch, '(' | ')' | '"' | '^' | '~') {
                break;
            }

            if ch == ':' {
                // `a::b` is a path-like term, not a field prefix.
                if self.input[self.position..].starts_with("::") {
                    word.push_str("::");
                    self.advance();
                    self.advance();
                    continue;
                }
                self.advance();
                if word.is_empty() {
                    continue;
                }
                return Ok(Some(Token::FieldPrefix(word)));
            }

            word.push(ch);
            self.advance();
        }

        if word.is_empty() {
            return Ok(None);
        }

        if word.eq_ignore_ascii_case("OR") {
            return Ok(Some(Token::Or));
        }

        Ok(Some(Token::Term(word)))
    }

    /// Reads a boost operator (^N or ^N.N).
    fn read_boost(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance();

        let number = self.read_number(true);
        if number.is_empty() {
            return Err(self.error_at("expected number after '^'", start_pos));
        }

        match number.parse::<f32>() {
            Ok(factor) => Ok(Some(Token::Boost(factor))),
            Err(_) => Err(self.error_at(format!("invalid boost value: {number}"), start_pos)),
        }
    }

    /// Reads a fuzzy operator (~ or ~N).
    fn read_fuzzy(&mut self) -> Result<Option<Token>, LexError> {
        let start_pos = self.position;
        self.advance();

        let number = self.read_number(false);
        if number.is_empty() {
            return Ok(Some(Token::Fuzzy(None)));
        }

        match number.parse::<u8>() {
            Ok(distance) => Ok(Some(Token::Fuzzy(Some(distance)))),
            Err(_) => Err(self.error_at(format!("invalid edit distance: {number}"), start_pos)),
        }
    }

    /// Reads a run of digits, optionally allowing one decimal point.
    fn read_number(&mut self, allow_decimal: bool) -> String {
        let mut number = String::new();
        while let Some(&ch) = self.chars.peek() {
            if ch.is_ascii_digit() || (allow_decimal && ch == '.' && !number.contains('.')) {
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        number
    }

    /// Skips whitespace characters.
    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.chars.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Advances to the next character.
    fn advance(&mut self) {
        if let Some(ch) = self.chars.next() {
            self.position += ch.len_utf8();
        }
    }
}

/// Convenience function to tokenize a query string.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(s: &str) -> Token {
        Token::Term(s.into())
    }

    #[test]
    fn empty_input() {
        assert_eq!(tokenize("   ").unwrap(), vec![]);
    }

    #[test]
    fn terms_keep_code_punctuation() {
        assert_eq!(
            tokenize("foo-bar a.b_c").unwrap(),
            vec![term("foo-bar"), term("a.b_c")]
        );
    }

    #[test]
    fn double_colon_stays_in_term() {
        assert_eq!(tokenize("std::vec").unwrap(), vec![term("std::vec")]);
    }

    #[test]
    fn field_prefix() {
        assert_eq!(
            tokenize("path:src main").unwrap(),
            vec![Token::FieldPrefix("path".into()), term("src"), term("main")]
        );
    }

    #[test]
    fn quoted_phrase() {
        assert_eq!(
            tokenize("\"open file\"").unwrap(),
            vec![Token::Phrase("open file".into())]
        );
    }

    #[test]
    fn unclosed_quote_error() {
        let err = tokenize("\"open file").unwrap_err();
        assert_eq!(err.position, 0);
        assert!(err.message.contains("unclosed quote"));
    }

    #[test]
    fn regex_literal() {
        assert_eq!(
            tokenize("/err(or)?/ x").unwrap(),
            vec![Token::Regex("err(or)?".into()), term("x")]
        );
    }

    #[test]
    fn regex_escaped_slash() {
        assert_eq!(
            tokenize(r"/a\/b\d/").unwrap(),
            vec![Token::Regex(r"a/b\d".into())]
        );
    }

    #[test]
    fn unclosed_regex_error() {
        let err = tokenize("x /abc").unwrap_err();
        assert_eq!(err.position, 2);
        assert!(err.message.contains("regular expression"));
    }

    #[test]
    fn or_negation_and_groups() {
        assert_eq!(
            tokenize("(a or b) -c").unwrap(),
            vec![
                Token::LParen,
                term("a"),
                Token::Or,
                term("b"),
                Token::RParen,
                Token::Not,
                term("c"),
            ]
        );
    }

    #[test]
    fn boost_and_fuzzy() {
        assert_eq!(
            tokenize("rust^2.5 recieve~ colour~2").unwrap(),
            vec![
                term("rust"),
                Token::Boost(2.5),
                term("recieve"),
                Token::Fuzzy(None),
                term("colour"),
                Token::Fuzzy(Some(2)),
            ]
        );
    }

    #[test]
    fn boost_missing_number() {
        let err = tokenize("rust^").unwrap_err();
        assert!(err.message.contains("expected number"));
    }

    #[test]
    fn fuzzy_distance_overflow() {
        let err = tokenize("abc~999").unwrap_err();
        assert!(err.message.contains("invalid edit distance"));
    }

    #[test]
    fn wildcards_are_part_of_terms() {
        assert_eq!(tokenize("read* f?o").unwrap(), vec![term("read*"), term("f?o")]);
    }
}
