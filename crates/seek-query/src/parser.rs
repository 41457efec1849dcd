//! Query parser.
//!
//! Parses a token stream into a query AST using recursive descent.
//!
//! # Grammar
//!
//! ```text
//! query      → or_expr
//! or_expr    → and_expr ("OR" and_expr)*
//! and_expr   → unary+
//! unary      → "-" unary | primary
//! primary    → leaf | field_expr | "(" or_expr ")"
//! leaf       → TERM FUZZY? | PHRASE | REGEX
//! field_expr → FIELD_PREFIX (leaf | "(" or_expr ")")
//! ```
//!
//! Every primary accepts an optional `^N` boost suffix.

use std::mem;

use crate::{
    ast::QueryExpr,
    error::{ParseError, QueryError},
    lexer::{Token, tokenize},
};

/// Recursive descent parser for query expressions.
struct Parser {
    /// Token stream to parse.
    tokens: Vec<Token>,
    /// Current position in token stream.
    position: usize,
}

impl Parser {
    /// Creates a new parser from a token stream.
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
        }
    }

    /// Parses the token stream into a query expression.
    fn parse(mut self) -> Result<Option<QueryExpr>, ParseError> {
        if self.tokens.is_empty() {
            return Ok(None);
        }

        let expr = self.parse_or_expr()?;

        if let Some(token) = self.peek() {
            return Err(ParseError::new(
                format!("unexpected token: {token:?}"),
                Some(self.position),
            ));
        }

        Ok(Some(expr))
    }

    /// Parses: or_expr → and_expr ("OR" and_expr)*
    fn parse_or_expr(&mut self) -> Result<QueryExpr, ParseError> {
        let mut left = self.parse_and_expr()?;

        while self.check(&Token::Or) {
            self.advance();
            let right = self.parse_and_expr()?;
            left = QueryExpr::or(vec![left, right]);
        }

        Ok(left)
    }

    /// Parses: and_expr → unary+
    fn parse_and_expr(&mut self) -> Result<QueryExpr, ParseError> {
        let mut exprs = vec![self.parse_unary()?];

        while self.can_start_unary() {
            exprs.push(self.parse_unary()?);
        }

        Ok(QueryExpr::and(exprs))
    }

    /// Checks if the current token can start a unary expression.
    fn can_start_unary(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Term(_)
                    | Token::Phrase(_)
                    | Token::Regex(_)
                    | Token::Not
                    | Token::LParen
                    | Token::FieldPrefix(_)
            )
        )
    }

    /// Applies a trailing boost operator, if present.
    fn maybe_apply_boost(&mut self, expr: QueryExpr) -> QueryExpr {
        if let Some(Token::Boost(factor)) = self.peek().cloned() {
            self.advance();
            QueryExpr::boost(expr, factor)
        } else {
            expr
        }
    }

    /// Parses: unary → "-" unary | primary
    fn parse_unary(&mut self) -> Result<QueryExpr, ParseError> {
        if self.check(&Token::Not) {
            self.advance();
            let expr = self.parse_unary()?;
            return Ok(QueryExpr::Not(Box::new(expr)));
        }

        self.parse_primary()
    }

    /// Parses: primary → leaf | field_expr | "(" or_expr ")"
    fn parse_primary(&mut self) -> Result<QueryExpr, ParseError> {
        let expr = match self.peek().cloned() {
            Some(Token::Term(_) | Token::Phrase(_) | Token::Regex(_)) => self.parse_leaf()?,

            Some(Token::FieldPrefix(name)) => {
                self.advance();
                self.parse_field_expr(name)?
            }

            Some(Token::LParen) => self.parse_group("expected closing parenthesis")?,

            Some(Token::RParen) => {
                return Err(ParseError::new(
                    "unexpected closing parenthesis",
                    Some(self.position),
                ));
            }

            Some(Token::Or) => {
                return Err(ParseError::new(
                    "unexpected OR (needs expression before it)",
                    Some(self.position),
                ));
            }

            Some(Token::Not) => {
                return Err(ParseError::new("unexpected negation", Some(self.position)));
            }

            Some(Token::Boost(_)) => {
                return Err(ParseError::new(
                    "unexpected boost (needs expression before it)",
                    Some(self.position),
                ));
            }

            Some(Token::Fuzzy(_)) => {
                return Err(ParseError::new(
                    "unexpected '~' (needs a term before it)",
                    Some(self.position),
                ));
            }

            None => {
                return Err(ParseError::new("unexpected end of query", None));
            }
        };

        Ok(self.maybe_apply_boost(expr))
    }

    /// Parses the expression after a field prefix.
    fn parse_field_expr(&mut self, name: String) -> Result<QueryExpr, ParseError> {
        let expr = match self.peek() {
            Some(Token::Term(_) | Token::Phrase(_) | Token::Regex(_)) => self.parse_leaf()?,
            Some(Token::LParen) => {
                self.parse_group("expected closing parenthesis after field expression")?
            }
            _ => {
                return Err(ParseError::new(
                    format!("expected term, phrase, regex, or group after '{name}:'"),
                    Some(self.position),
                ));
            }
        };

        Ok(QueryExpr::Field {
            name,
            expr: Box::new(expr),
        })
    }

    /// Parses a single leaf token, consuming a trailing fuzzy operator on terms.
    fn parse_leaf(&mut self) -> Result<QueryExpr, ParseError> {
        let position = self.position;
        let Some(token) = self.peek().cloned() else {
            return Err(ParseError::new("unexpected end of query", None));
        };
        self.advance();

        match token {
            Token::Term(text) => {
                if let Some(Token::Fuzzy(distance)) = self.peek().cloned() {
                    self.advance();
                    if is_wildcard(&text) {
                        return Err(ParseError::new(
                            "fuzzy matching cannot be combined with wildcards",
                            Some(position),
                        ));
                    }
                    return Ok(QueryExpr::Fuzzy {
                        term: text,
                        distance,
                    });
                }
                if is_wildcard(&text) {
                    Ok(QueryExpr::Wildcard(text))
                } else {
                    Ok(QueryExpr::Term(text))
                }
            }
            Token::Phrase(text) => {
                let words: Vec<String> = text.split_whitespace().map(String::from).collect();
                match words.len() {
                    0 => Err(ParseError::new("empty phrase", Some(position))),
                    1 => Ok(QueryExpr::Term(words.into_iter().collect())),
                    _ => Ok(QueryExpr::Phrase(words)),
                }
            }
            Token::Regex(pattern) => {
                if pattern.is_empty() {
                    Err(ParseError::new("empty regular expression", Some(position)))
                } else {
                    Ok(QueryExpr::Regex(pattern))
                }
            }
            other => Err(ParseError::new(
                format!("unexpected token: {other:?}"),
                Some(position),
            )),
        }
    }

    /// Parses a parenthesized group, consuming the surrounding parentheses.
    fn parse_group(&mut self, missing_rparen_msg: &str) -> Result<QueryExpr, ParseError> {
        self.advance();
        let inner = self.parse_or_expr()?;

        if !self.check(&Token::RParen) {
            return Err(ParseError::new(missing_rparen_msg, Some(self.position)));
        }
        self.advance();

        Ok(inner)
    }

    /// Returns the current token without consuming it.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Checks if the current token has the same variant as `token`.
    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| mem::discriminant(t) == mem::discriminant(token))
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        if self.position < self.tokens.len() {
            self.position += 1;
        }
    }
}

/// Returns true when a bare term carries `*` or `?` wildcards.
fn is_wildcard(text: &str) -> bool {
    text.contains(['*', '?'])
}

/// Parses a query string into an AST.
///
/// Returns `Ok(None)` for empty queries, `Ok(Some(expr))` for valid queries,
/// or `Err(QueryError)` for invalid syntax.
pub fn parse(input: &str) -> Result<Option<QueryExpr>, QueryError> {
    let tokens = tokenize(input).map_err(QueryError::from)?;
    Parser::new(tokens)
        .parse()
        .map_err(|err| QueryError::from(err).with_query(input))
}
