//! Tokenization policy for the seek index.
//!
//! Three tokenizers are registered with Tantivy:
//! - `seek_source` - source text; token characters are Unicode letters and
//!   digits, connector punctuation (`_` and friends) and `#`
//! - `seek_path` - path hierarchy; `/a/b/c.txt` yields `/a`, `/a/b`, `/a/b/c.txt`
//! - `seek_tag_kind` - one token per `\n`-separated line
//!
//! All three lowercase their output. Which tokenizer indexes which field is
//! the [`FIELD_TOKENIZERS`] table.

use std::{str::CharIndices, sync::LazyLock};

use regex::Regex;
use tantivy::{
    Index,
    tokenizer::{LowerCaser, TextAnalyzer, Token, TokenStream, Tokenizer},
};

/// Name of the source text tokenizer.
pub const SOURCE_TOKENIZER: &str = "seek_source";

/// Name of the path hierarchy tokenizer.
pub const PATH_TOKENIZER: &str = "seek_path";

/// Name of the tag kind tokenizer.
pub const TAG_KIND_TOKENIZER: &str = "seek_tag_kind";

/// Tokenizer used by each analyzed field; unlisted fields are indexed raw.
pub const FIELD_TOKENIZERS: &[(&str, &str)] = &[
    ("path", PATH_TOKENIZER),
    ("definitions", SOURCE_TOKENIZER),
    ("tag_kind", TAG_KIND_TOKENIZER),
    ("content", SOURCE_TOKENIZER),
    ("labels", SOURCE_TOKENIZER),
];

/// Looks up the tokenizer for `field`.
pub fn tokenizer_for(field: &str) -> Option<&'static str> {
    FIELD_TOKENIZERS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, tokenizer)| *tokenizer)
}

/// Registers every seek tokenizer on `index`.
pub fn register_tokenizers(index: &Index) {
    let manager = index.tokenizers();
    manager.register(SOURCE_TOKENIZER, source_analyzer());
    manager.register(
        PATH_TOKENIZER,
        TextAnalyzer::builder(PathHierarchyTokenizer).filter(LowerCaser).build(),
    );
    manager.register(
        TAG_KIND_TOKENIZER,
        TextAnalyzer::builder(LineTokenizer).filter(LowerCaser).build(),
    );
}

/// Builds the lowercasing source text analyzer.
pub fn source_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(SourceTokenizer::default())
        .filter(LowerCaser)
        .build()
}

/// A lowercased source token and its byte span in the original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceToken {
    /// Lowercased token text.
    pub text: String,
    /// Byte offset of the first character.
    pub offset_from: usize,
    /// Byte offset one past the last character.
    pub offset_to: usize,
}

/// Splits `text` into lowercased source tokens.
pub fn source_tokens(text: &str) -> Vec<SourceToken> {
    let mut analyzer = source_analyzer();
    let mut stream = analyzer.token_stream(text);
    let mut tokens = Vec::new();
    while let Some(token) = stream.next() {
        tokens.push(SourceToken {
            text: token.text.clone(),
            offset_from: token.offset_from,
            offset_to: token.offset_to,
        });
    }
    tokens
}

/// Lowercased source token texts of `text`, first occurrence order, no repeats.
pub fn distinct_terms(text: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for token in source_tokens(text) {
        if !terms.contains(&token.text) {
            terms.push(token.text);
        }
    }
    terms
}

/// True for characters that belong to a source token.
pub fn is_token_char(c: char) -> bool {
    c.is_alphabetic() || is_decimal_digit(c) || c == '#' || is_connector_punctuation(c)
}

/// Single-character matcher for Unicode category Nd.
static DECIMAL_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{Nd}$").expect("static pattern"));

/// Unicode category Nd; other numerics such as `²` or `½` separate tokens.
fn is_decimal_digit(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_digit();
    }
    c.is_numeric() && DECIMAL_DIGIT.is_match(c.encode_utf8(&mut [0; 4]))
}

/// Unicode category Pc.
fn is_connector_punctuation(c: char) -> bool {
    matches!(
        c,
        '_' | '\u{203F}'
            | '\u{2040}'
            | '\u{2054}'
            | '\u{FE33}'
            | '\u{FE34}'
            | '\u{FE4D}'
            | '\u{FE4E}'
            | '\u{FE4F}'
            | '\u{FF3F}'
    )
}

/// Tokenizer for source text.
#[derive(Clone, Default)]
pub struct SourceTokenizer {
    /// Token buffer reused across streams.
    token: Token,
}

/// Token stream produced by [`SourceTokenizer`].
pub struct SourceTokenStream<'a> {
    /// Text being tokenized.
    text: &'a str,
    /// Remaining characters.
    chars: CharIndices<'a>,
    /// Current token.
    token: &'a mut Token,
}

impl Tokenizer for SourceTokenizer {
    type TokenStream<'a> = SourceTokenStream<'a>;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> SourceTokenStream<'a> {
        self.token = Token::default();
        SourceTokenStream {
            text,
            chars: text.char_indices(),
            token: &mut self.token,
        }
    }
}

impl SourceTokenStream<'_> {
    /// Consumes token characters and returns the offset just past them.
    fn token_end(&mut self) -> usize {
        (&mut self.chars)
            .find(|(_, c)| !is_token_char(*c))
            .map(|(offset, _)| offset)
            .unwrap_or(self.text.len())
    }
}

impl TokenStream for SourceTokenStream<'_> {
    fn advance(&mut self) -> bool {
        self.token.text.clear();
        self.token.position = self.token.position.wrapping_add(1);
        while let Some((offset_from, c)) = self.chars.next() {
            if is_token_char(c) {
                let offset_to = self.token_end();
                self.token.offset_from = offset_from;
                self.token.offset_to = offset_to;
                self.token.text.push_str(&self.text[offset_from..offset_to]);
                return true;
            }
        }
        false
    }

    fn token(&self) -> &Token {
        self.token
    }

    fn token_mut(&mut self) -> &mut Token {
        self.token
    }
}

/// Tokenizer emitting every ancestor of a path followed by the path itself.
#[derive(Clone, Default)]
pub struct PathHierarchyTokenizer;

impl Tokenizer for PathHierarchyTokenizer {
    type TokenStream<'a> = BufferedTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> BufferedTokenStream {
        let mut spans = Vec::new();
        for (idx, c) in text.char_indices() {
            if (c == '/' || c == '\\') && idx > 0 {
                spans.push(idx);
            }
        }
        if !text.is_empty() && !text.ends_with(['/', '\\']) {
            spans.push(text.len());
        }

        let tokens = spans
            .into_iter()
            .enumerate()
            .map(|(position, end)| Token {
                offset_from: 0,
                offset_to: end,
                position,
                text: text[..end].replace('\\', "/"),
                position_length: 1,
            })
            .collect();
        BufferedTokenStream::new(tokens)
    }
}

/// Tokenizer emitting each non-empty line as one token.
#[derive(Clone, Default)]
pub struct LineTokenizer;

impl Tokenizer for LineTokenizer {
    type TokenStream<'a> = BufferedTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> BufferedTokenStream {
        let mut tokens = Vec::new();
        let mut start = 0;
        for line in text.split('\n') {
            let end = start + line.len();
            if !line.is_empty() {
                tokens.push(Token {
                    offset_from: start,
                    offset_to: end,
                    position: tokens.len(),
                    text: line.to_string(),
                    position_length: 1,
                });
            }
            start = end + 1;
        }
        BufferedTokenStream::new(tokens)
    }
}

/// Token stream over a precomputed token list.
pub struct BufferedTokenStream {
    /// All tokens of the text.
    tokens: Vec<Token>,
    /// Index of the next token to yield.
    next: usize,
    /// Returned before the first advance and after exhaustion.
    empty: Token,
}

impl BufferedTokenStream {
    /// Wraps a token list.
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            next: 0,
            empty: Token::default(),
        }
    }

    /// Index of the current token, if any.
    fn current(&self) -> Option<usize> {
        self.next.checked_sub(1).filter(|idx| *idx < self.tokens.len())
    }
}

impl TokenStream for BufferedTokenStream {
    fn advance(&mut self) -> bool {
        if self.next < self.tokens.len() {
            self.next += 1;
            true
        } else {
            self.next = self.tokens.len() + 1;
            false
        }
    }

    fn token(&self) -> &Token {
        match self.current() {
            Some(idx) => &self.tokens[idx],
            None => &self.empty,
        }
    }

    fn token_mut(&mut self) -> &mut Token {
        match self.current() {
            Some(idx) => &mut self.tokens[idx],
            None => &mut self.empty,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn texts(analyzer: &mut TextAnalyzer, input: &str) -> Vec<String> {
        let mut stream = analyzer.token_stream(input);
        let mut out = Vec::new();
        while let Some(token) = stream.next() {
            out.push(token.text.clone());
        }
        out
    }

    #[test]
    fn source_token_characters() {
        let tokens: Vec<String> = source_tokens("#include <Std_IO.h> x‿y 42!")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["#include", "std_io", "h", "x‿y", "42"]);
    }

    #[test]
    fn only_decimal_digits_join_tokens() {
        assert!(is_token_char('7'));
        assert!(is_token_char('٣'));
        assert!(!is_token_char('²'));
        assert!(!is_token_char('½'));
        assert!(!is_token_char('Ⅳ'));

        let tokens: Vec<String> = source_tokens("x² v٣ ½cup")
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert_eq!(tokens, vec!["x", "v٣", "cup"]);
    }

    #[test]
    fn source_tokens_keep_original_offsets() {
        let tokens = source_tokens("int Größe = 3;");
        assert_eq!(tokens[1].text, "größe");
        assert_eq!(tokens[1].offset_from, 4);
        assert_eq!(tokens[1].offset_to, 4 + "Größe".len());
    }

    #[test]
    fn separators_only() {
        assert!(source_tokens(" \t\n;(){}").is_empty());
    }

    #[test]
    fn distinct_terms_preserve_first_occurrence() {
        assert_eq!(distinct_terms("B a b A c"), vec!["b", "a", "c"]);
    }

    #[test]
    fn path_hierarchy() {
        let mut analyzer =
            TextAnalyzer::builder(PathHierarchyTokenizer).filter(LowerCaser).build();
        assert_eq!(
            texts(&mut analyzer, "/A/b/c.TXT"),
            vec!["/a", "/a/b", "/a/b/c.txt"]
        );
        assert_eq!(texts(&mut analyzer, "src\\lib.rs"), vec!["src", "src/lib.rs"]);
        assert_eq!(texts(&mut analyzer, "/a/"), vec!["/a"]);
        assert!(texts(&mut analyzer, "").is_empty());
    }

    #[test]
    fn tag_kind_lines() {
        let mut analyzer = TextAnalyzer::builder(LineTokenizer).filter(LowerCaser).build();
        assert_eq!(
            texts(&mut analyzer, "Variable\nlocal var\n\nMember"),
            vec!["variable", "local var", "member"]
        );
    }

    #[test]
    fn field_table_lookup() {
        assert_eq!(tokenizer_for("content"), Some(SOURCE_TOKENIZER));
        assert_eq!(tokenizer_for("path"), Some(PATH_TOKENIZER));
        assert_eq!(tokenizer_for("tag_kind"), Some(TAG_KIND_TOKENIZER));
        assert_eq!(tokenizer_for("file_id"), None);
    }
}
