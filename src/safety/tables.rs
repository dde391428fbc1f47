//! Table reference extraction.
//!
//! Three independent passes whose results are unioned:
//! 1. every relation the sqlparser AST names (derived tables, nested joins,
//!    CTE bodies, set operations and expression subqueries included);
//! 2. a tokenizer-backed walk of each `FROM` clause, so statements the parser
//!    rejects still yield their relations;
//! 3. a whole-word scan of the raw text for every known table name.
//!
//! The result over-approximates the tables a statement reads.

use regex::Regex;
use sqlparser::ast::visit_relations;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::keywords::Keyword;
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer, Word};
use std::collections::BTreeSet;
use std::ops::ControlFlow;
use std::sync::OnceLock;
use tracing::debug;

/// Extracts the lower-cased set of tables a SQL statement references.
#[derive(Debug, Clone, Default)]
pub struct TableExtractor {
    known_tables: BTreeSet<String>,
}

impl TableExtractor {
    /// Creates an extractor that also scans for the given known table names.
    pub fn new<I, S>(known_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            known_tables: known_tables
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// Known table names, lower-cased.
    pub fn known_tables(&self) -> &BTreeSet<String> {
        &self.known_tables
    }

    /// Returns every table the statement may read, lower-cased and deduplicated.
    pub fn extract_tables(&self, sql: &str) -> BTreeSet<String> {
        let mut tables = parsed_relations(sql);
        tables.extend(relation_names(sql));

        let words: BTreeSet<String> = sql
            .to_lowercase()
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        tables.extend(self.known_tables.intersection(&words).cloned());

        tables
    }
}

/// Relations named anywhere in the parsed statement. Empty if it does not parse.
fn parsed_relations(sql: &str) -> BTreeSet<String> {
    let statements = match Parser::parse_sql(&SQLiteDialect {}, sql) {
        Ok(statements) => statements,
        Err(e) => {
            debug!("Parser failed ({e}); relying on the token walk");
            return BTreeSet::new();
        }
    };

    let mut names = BTreeSet::new();
    let _ = visit_relations(&statements, |relation| {
        if let Some(ident) = relation.0.last() {
            names.insert(ident.value.to_lowercase());
        }
        ControlFlow::<()>::Continue(())
    });
    names
}

/// Relation names in every `FROM` clause, from the token stream.
///
/// Each parenthesis level tracks whether it is inside a `FROM` clause. A
/// relation is expected after `FROM`, after `JOIN`, and after a comma at the
/// clause's own level, so the list keeps going past derived tables and
/// `JOIN ... ON` conditions.
fn relation_names(sql: &str) -> BTreeSet<String> {
    let tokens = match Tokenizer::new(&SQLiteDialect {}, sql).tokenize() {
        Ok(tokens) => tokens,
        Err(e) => {
            debug!("Tokenizer failed ({e}); falling back to pattern scan");
            return relation_names_fallback(sql);
        }
    };

    let tokens: Vec<Token> = tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_)))
        .collect();

    let mut names = BTreeSet::new();
    let mut in_from = vec![false];
    let mut expect_relation = false;
    let mut i = 0;

    while i < tokens.len() {
        let level = in_from.len() - 1;
        match &tokens[i] {
            // `FROM (a JOIN b ...)` opens a nested FROM list; `FROM (SELECT` ends it
            Token::LParen => {
                in_from.push(expect_relation);
                i += 1;
            }
            Token::RParen => {
                if level > 0 {
                    in_from.pop();
                }
                expect_relation = false;
                i += 1;
            }
            Token::Comma => {
                expect_relation = in_from[level];
                i += 1;
            }
            Token::Word(w)
                if w.quote_style.is_none() && matches!(w.keyword, Keyword::FROM | Keyword::JOIN) =>
            {
                in_from[level] = true;
                expect_relation = true;
                i += 1;
            }
            Token::Word(w) if w.quote_style.is_none() && ends_from_clause(w.keyword) => {
                in_from[level] = false;
                expect_relation = false;
                i += 1;
            }
            _ if expect_relation => {
                expect_relation = false;
                match qualified_name(&tokens, i) {
                    Some((name, next)) => {
                        names.insert(name);
                        i = skip_alias(&tokens, next);
                    }
                    None => i += 1,
                }
            }
            _ => i += 1,
        }
    }

    names
}

fn ends_from_clause(keyword: Keyword) -> bool {
    matches!(
        keyword,
        Keyword::WHERE
            | Keyword::GROUP
            | Keyword::HAVING
            | Keyword::WINDOW
            | Keyword::ORDER
            | Keyword::LIMIT
            | Keyword::OFFSET
            | Keyword::UNION
            | Keyword::INTERSECT
            | Keyword::EXCEPT
            | Keyword::SELECT
    )
}

/// Reads `name` or `schema.name` starting at `start`; returns the last segment.
fn qualified_name(tokens: &[Token], start: usize) -> Option<(String, usize)> {
    let mut name = relation_word(tokens.get(start)?)?;
    let mut i = start + 1;

    while let (Some(Token::Period), Some(token)) = (tokens.get(i), tokens.get(i + 1)) {
        match relation_word(token) {
            Some(segment) => {
                name = segment;
                i += 2;
            }
            None => break,
        }
    }

    Some((name.to_lowercase(), i))
}

fn relation_word(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if w.quote_style.is_some() => Some(w.value.clone()),
        Token::Word(w) if !matches!(w.keyword, Keyword::SELECT | Keyword::VALUES) => {
            Some(w.value.clone())
        }
        // SQLite accepts 'name' as an identifier in FROM
        Token::SingleQuotedString(s) => Some(s.clone()),
        _ => None,
    }
}

fn skip_alias(tokens: &[Token], i: usize) -> usize {
    match tokens.get(i) {
        Some(Token::Word(w)) if w.keyword == Keyword::AS => i + 2,
        Some(Token::Word(w)) if is_alias(w) => i + 1,
        _ => i,
    }
}

fn is_alias(word: &Word) -> bool {
    word.quote_style.is_some() || word.keyword == Keyword::NoKeyword
}

/// Pattern scan used when the tokenizer rejects the input.
fn relation_names_fallback(sql: &str) -> BTreeSet<String> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:from|join)\s+["`\[']?([A-Za-z_][A-Za-z0-9_]*)"#)
            .expect("relation pattern is valid")
    });

    pattern
        .captures_iter(sql)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_lowercase())
        .collect()
}
