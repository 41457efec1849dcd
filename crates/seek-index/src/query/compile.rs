//! Query compiler.
//!
//! Compiles a free-text query AST into Tantivy queries and records, for the
//! default matcher, which content terms each leaf can match.

use seek_query::{QueryError, QueryExpr};
use tantivy::{
    Term,
    query::{
        AllQuery, BooleanQuery, BoostQuery, FuzzyTermQuery, Occur, PhraseQuery, Query,
        RegexQuery, TermQuery,
    },
    schema::{Field, IndexRecordOption},
};

use crate::{analyzer::source_tokens, schema::IndexSchema};

/// Largest edit distance supported by fuzzy queries.
const MAX_FUZZY_DISTANCE: u8 = 2;

/// How a query leaf selects content terms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermPattern {
    /// The term itself.
    Exact(String),
    /// Terms within an edit distance.
    Fuzzy {
        /// Lowercased query term.
        term: String,
        /// Maximum edit distance.
        distance: u8,
    },
    /// Terms matching a regular expression in full.
    Regex(String),
}

/// Compiles a free-text query; `None` for queries without searchable words.
///
/// Returns the query together with the content term patterns it uses.
pub fn compile_text_query(
    schema: &IndexSchema,
    text: &str,
    fuzzy_distance: u8,
    file_names: bool,
) -> Result<Option<(Box<dyn Query>, Vec<TermPattern>)>, QueryError> {
    let Some(expr) = seek_query::parse(text)? else {
        return Ok(None);
    };
    let mut compiler = QueryCompiler::new(schema.clone(), fuzzy_distance);
    if file_names {
        compiler = compiler.for_file_names();
    }
    let query = compiler
        .compile(&expr)
        .map_err(|e| e.with_query(text))?;
    Ok(query.map(|q| (q, compiler.into_patterns())))
}

/// Target of unscoped leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Analyzed text field.
    Text(Field),
    /// Case-insensitive substring of the stored path.
    Path,
    /// Exact file name, wildcards and regexes apply to the whole name.
    FileName,
    /// Case-insensitive substring of the file name.
    FileNameSubstring,
}

/// Compiles query AST nodes into Tantivy queries.
pub struct QueryCompiler {
    /// Index schema for field references.
    schema: IndexSchema,
    /// Edit distance for `term~` without an explicit distance.
    fuzzy_distance: u8,
    /// Scope of leaves outside a `field:` clause.
    default_scope: Scope,
    /// Set while compiling the body of a `field:` clause.
    in_field: bool,
    /// Content term patterns collected during compilation.
    patterns: Vec<TermPattern>,
}

impl QueryCompiler {
    /// Creates a compiler that searches file content by default.
    pub fn new(schema: IndexSchema, fuzzy_distance: u8) -> Self {
        let content = schema.content;
        Self {
            schema,
            fuzzy_distance,
            default_scope: Scope::Text(content),
            in_field: false,
            patterns: Vec::new(),
        }
    }

    /// Makes unscoped leaves match file names by substring instead of content.
    pub fn for_file_names(mut self) -> Self {
        self.default_scope = Scope::FileNameSubstring;
        self
    }

    /// Content term patterns collected so far.
    pub fn into_patterns(self) -> Vec<TermPattern> {
        self.patterns
    }

    /// Compiles a query expression into a Tantivy query.
    ///
    /// Returns `None` when the expression has no searchable words.
    pub fn compile(&mut self, expr: &QueryExpr) -> Result<Option<Box<dyn Query>>, QueryError> {
        self.compile_in(self.default_scope, expr)
    }

    /// Compiles `expr` with leaves targeting `scope`.
    fn compile_in(
        &mut self,
        scope: Scope,
        expr: &QueryExpr,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        match expr {
            QueryExpr::Term(text) => self.compile_term(scope, text),
            QueryExpr::Phrase(words) => self.compile_phrase(scope, words),
            QueryExpr::Fuzzy { term, distance } => {
                self.compile_fuzzy(scope, term, distance.unwrap_or(self.fuzzy_distance))
            }
            QueryExpr::Wildcard(pattern) => self.compile_wildcard(scope, pattern),
            QueryExpr::Regex(pattern) => self.compile_regex(scope, pattern),
            QueryExpr::Not(inner) => {
                let before = self.patterns.len();
                let compiled = self.compile_in(scope, inner)?;
                self.patterns.truncate(before);
                Ok(compiled.map(|q| {
                    let clauses = vec![
                        (Occur::Must, Box::new(AllQuery) as Box<dyn Query>),
                        (Occur::MustNot, q),
                    ];
                    Box::new(BooleanQuery::new(clauses)) as Box<dyn Query>
                }))
            }
            QueryExpr::And(exprs) => self.compile_and(scope, exprs),
            QueryExpr::Or(exprs) => {
                let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
                for e in exprs {
                    if let Some(q) = self.compile_in(scope, e)? {
                        clauses.push((Occur::Should, q));
                    }
                }
                Ok(boolean(clauses))
            }
            QueryExpr::Field { name, expr } => {
                if self.in_field {
                    return Err(QueryError::compile("nested field queries not supported"));
                }
                let field_scope = self.field_scope(name)?;
                self.in_field = true;
                let result = self.compile_in(field_scope, expr);
                self.in_field = false;
                result
            }
            QueryExpr::Boost { expr, factor } => Ok(self
                .compile_in(scope, expr)?
                .map(|q| Box::new(BoostQuery::new(q, *factor)) as Box<dyn Query>)),
        }
    }

    /// Resolves a `field:` name.
    fn field_scope(&self, name: &str) -> Result<Scope, QueryError> {
        match name {
            "content" => Ok(Scope::Text(self.schema.content)),
            "labels" => Ok(Scope::Text(self.schema.labels)),
            "path" => Ok(Scope::Path),
            "file" => Ok(Scope::FileName),
            _ => Err(QueryError::compile(format!("unknown field: {name}"))),
        }
    }

    /// Compiles an AND expression.
    ///
    /// Negated clauses become MUST_NOT; with no positive clause the base is
    /// every document.
    fn compile_and(
        &mut self,
        scope: Scope,
        exprs: &[QueryExpr],
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let mut positive: Vec<Box<dyn Query>> = Vec::new();
        let mut negative: Vec<Box<dyn Query>> = Vec::new();

        for expr in exprs {
            match expr {
                QueryExpr::Not(inner) => {
                    let before = self.patterns.len();
                    if let Some(q) = self.compile_in(scope, inner)? {
                        negative.push(q);
                    }
                    self.patterns.truncate(before);
                }
                other => {
                    if let Some(q) = self.compile_in(scope, other)? {
                        positive.push(q);
                    }
                }
            }
        }

        if positive.is_empty() && negative.is_empty() {
            return Ok(None);
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> =
            positive.into_iter().map(|q| (Occur::Must, q)).collect();
        if clauses.is_empty() {
            clauses.push((Occur::Must, Box::new(AllQuery)));
        }
        clauses.extend(negative.into_iter().map(|q| (Occur::MustNot, q)));
        Ok(Some(Box::new(BooleanQuery::new(clauses))))
    }

    /// Compiles a plain term.
    fn compile_term(&mut self, scope: Scope, text: &str) -> Result<Option<Box<dyn Query>>, QueryError> {
        match scope {
            Scope::Text(field) => {
                let tokens = tokenize(text);
                match tokens.as_slice() {
                    [] => Ok(None),
                    [token] => {
                        self.record(field, TermPattern::Exact(token.clone()));
                        Ok(Some(term_query(field, token)))
                    }
                    _ => Ok(self.text_phrase(field, &tokens)),
                }
            }
            Scope::Path => self.regex_query(
                self.schema.path,
                &format!(".*{}.*", regex::escape(&text.to_lowercase())),
            ),
            Scope::FileName => Ok(Some(term_query(self.schema.file_name, text))),
            Scope::FileNameSubstring => self.regex_query(
                self.schema.file_name,
                &format!(".*{}.*", case_insensitive(text)),
            ),
        }
    }

    /// Compiles a quoted phrase.
    fn compile_phrase(
        &mut self,
        scope: Scope,
        words: &[String],
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        match scope {
            Scope::Text(field) => {
                let tokens: Vec<String> = words.iter().flat_map(|w| tokenize(w)).collect();
                Ok(self.text_phrase(field, &tokens))
            }
            _ => self.compile_term(scope, &words.join(" ")),
        }
    }

    /// Builds a phrase query over analyzed tokens.
    fn text_phrase(&mut self, field: Field, tokens: &[String]) -> Option<Box<dyn Query>> {
        match tokens {
            [] => None,
            [token] => {
                self.record(field, TermPattern::Exact(token.clone()));
                Some(term_query(field, token))
            }
            _ => {
                for token in tokens {
                    self.record(field, TermPattern::Exact(token.clone()));
                }
                let terms = tokens
                    .iter()
                    .map(|t| Term::from_field_text(field, t))
                    .collect();
                Some(Box::new(PhraseQuery::new(terms)))
            }
        }
    }

    /// Compiles an edit-distance term.
    fn compile_fuzzy(
        &mut self,
        scope: Scope,
        text: &str,
        distance: u8,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        if distance > MAX_FUZZY_DISTANCE {
            return Err(QueryError::compile(format!(
                "edit distance {distance} exceeds the maximum of {MAX_FUZZY_DISTANCE}"
            )));
        }
        let Scope::Text(field) = scope else {
            return Err(QueryError::compile("fuzzy terms are only supported on text fields"));
        };

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for token in tokenize(text) {
            self.record(
                field,
                TermPattern::Fuzzy {
                    term: token.clone(),
                    distance,
                },
            );
            let term = Term::from_field_text(field, &token);
            clauses.push((Occur::Must, Box::new(FuzzyTermQuery::new(term, distance, true))));
        }
        if clauses.len() == 1 {
            return Ok(clauses.pop().map(|(_, q)| q));
        }
        Ok(boolean(clauses))
    }

    /// Compiles a `*`/`?` wildcard term.
    fn compile_wildcard(
        &mut self,
        scope: Scope,
        pattern: &str,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        match scope {
            Scope::Text(field) => {
                let regex = wildcard_to_regex(&pattern.to_lowercase());
                self.record(field, TermPattern::Regex(regex.clone()));
                self.regex_query(field, &regex)
            }
            Scope::Path => self.regex_query(
                self.schema.path,
                &format!(".*{}.*", wildcard_to_regex(&pattern.to_lowercase())),
            ),
            Scope::FileName => self.regex_query(self.schema.file_name, &wildcard_to_regex(pattern)),
            Scope::FileNameSubstring => {
                let regex: String = pattern
                    .split(['*', '?'])
                    .map(case_insensitive)
                    .collect::<Vec<_>>()
                    .join(".*");
                self.regex_query(self.schema.file_name, &format!(".*{regex}.*"))
            }
        }
    }

    /// Compiles a `/regex/` leaf; the pattern must match a whole term.
    fn compile_regex(
        &mut self,
        scope: Scope,
        pattern: &str,
    ) -> Result<Option<Box<dyn Query>>, QueryError> {
        let field = match scope {
            Scope::Text(field) => {
                self.record(field, TermPattern::Regex(pattern.to_string()));
                field
            }
            Scope::Path => self.schema.path,
            Scope::FileName | Scope::FileNameSubstring => self.schema.file_name,
        };
        self.regex_query(field, pattern)
    }

    /// Builds a `RegexQuery`, reporting invalid patterns as compile errors.
    fn regex_query(&self, field: Field, pattern: &str) -> Result<Option<Box<dyn Query>>, QueryError> {
        RegexQuery::from_pattern(pattern, field)
            .map(|q| Some(Box::new(q) as Box<dyn Query>))
            .map_err(|e| QueryError::compile(format!("invalid regex {pattern:?}: {e}")))
    }

    /// Remembers a content pattern for highlighting.
    fn record(&mut self, field: Field, pattern: TermPattern) {
        if field == self.schema.content && !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }
}

/// Lowercased source tokens of `text`.
fn tokenize(text: &str) -> Vec<String> {
    source_tokens(text).into_iter().map(|t| t.text).collect()
}

/// A term query with frequencies.
fn term_query(field: Field, text: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, text),
        IndexRecordOption::WithFreqs,
    ))
}

/// Wraps clauses in a boolean query; `None` when there are none.
fn boolean(clauses: Vec<(Occur, Box<dyn Query>)>) -> Option<Box<dyn Query>> {
    if clauses.is_empty() {
        None
    } else {
        Some(Box::new(BooleanQuery::new(clauses)))
    }
}

/// Translates `*` and `?` wildcards into a regex over whole terms.
fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    out
}

/// Regex matching `literal` regardless of letter case.
fn case_insensitive(literal: &str) -> String {
    let mut out = String::new();
    for c in literal.chars() {
        let lower: String = c.to_lowercase().collect();
        let upper: String = c.to_uppercase().collect();
        if lower == upper || lower.chars().count() != 1 || upper.chars().count() != 1 {
            out.push_str(&regex::escape(c.encode_utf8(&mut [0; 4])));
        } else {
            out.push('[');
            out.push_str(&lower);
            out.push_str(&upper);
            out.push(']');
        }
    }
    out
}
