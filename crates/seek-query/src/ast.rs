//! Query abstract syntax tree.
//!
//! Represents parsed free-text queries before they are compiled against the
//! index schema.

use std::fmt;

/// A parsed query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryExpr {
    /// A single search term.
    Term(String),

    /// An exact phrase (sequence of terms).
    Phrase(Vec<String>),

    /// A term matched within an edit distance.
    Fuzzy {
        /// The term text.
        term: String,
        /// Explicit edit distance; `None` uses the configured default.
        distance: Option<u8>,
    },

    /// A term containing `*` or `?` wildcards.
    Wildcard(String),

    /// A regular expression matched against whole indexed terms.
    Regex(String),

    /// Negation: results must NOT match this expression.
    Not(Box<Self>),

    /// Conjunction: all sub-expressions must match.
    And(Vec<Self>),

    /// Disjunction: at least one sub-expression must match.
    Or(Vec<Self>),

    /// Field-scoped query: search only within a specific field.
    Field {
        /// Field name (e.g. path, file, content, labels).
        name: String,
        /// Expression to match within that field.
        expr: Box<Self>,
    },

    /// Boosted query: multiplies the score of the inner expression.
    Boost {
        /// The expression to boost.
        expr: Box<Self>,
        /// The boost factor.
        factor: f32,
    },
}

impl QueryExpr {
    /// Creates an And expression, flattening nested Ands.
    pub fn and(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::And(inner) => inner,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1 {
            flattened.remove(0)
        } else {
            Self::And(flattened)
        }
    }

    /// Creates an Or expression, flattening nested Ors.
    pub fn or(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::Or(inner) => inner,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1 {
            flattened.remove(0)
        } else {
            Self::Or(flattened)
        }
    }

    /// Creates a boosted expression.
    pub fn boost(expr: Self, factor: f32) -> Self {
        Self::Boost {
            expr: Box::new(expr),
            factor,
        }
    }

    /// Collects the plain words of all positive leaves.
    ///
    /// Negated subtrees are skipped; regex and wildcard leaves contribute
    /// their raw pattern text.
    pub fn positive_terms(&self) -> Vec<String> {
        let mut terms = Vec::new();
        self.collect_terms(&mut terms);
        terms
    }

    /// Recursive helper for [`positive_terms`](Self::positive_terms).
    fn collect_terms(&self, out: &mut Vec<String>) {
        match self {
            Self::Term(s) | Self::Wildcard(s) | Self::Regex(s) => out.push(s.clone()),
            Self::Fuzzy { term, .. } => out.push(term.clone()),
            Self::Phrase(words) => out.extend(words.iter().cloned()),
            Self::Not(_) => {}
            Self::And(exprs) | Self::Or(exprs) => {
                for expr in exprs {
                    expr.collect_terms(out);
                }
            }
            Self::Field { expr, .. } | Self::Boost { expr, .. } => expr.collect_terms(out),
        }
    }

    /// Formats the expression as a tree structure with the given indentation level.
    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term(s) => writeln!(f, "{prefix}Term({s:?})"),
            Self::Phrase(words) => writeln!(f, "{prefix}Phrase({words:?})"),
            Self::Fuzzy { term, distance } => match distance {
                Some(d) => writeln!(f, "{prefix}Fuzzy({term:?}, {d})"),
                None => writeln!(f, "{prefix}Fuzzy({term:?})"),
            },
            Self::Wildcard(s) => writeln!(f, "{prefix}Wildcard({s:?})"),
            Self::Regex(s) => writeln!(f, "{prefix}Regex({s:?})"),
            Self::Not(inner) => {
                writeln!(f, "{prefix}Not")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::And(exprs) => {
                writeln!(f, "{prefix}And")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Or(exprs) => {
                writeln!(f, "{prefix}Or")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
            Self::Field { name, expr } => {
                writeln!(f, "{prefix}Field({name:?})")?;
                expr.fmt_tree(f, indent + 1)
            }
            Self::Boost { expr, factor } => {
                writeln!(f, "{prefix}Boost({factor})")?;
                expr.fmt_tree(f, indent + 1)
            }
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
