//! SQL grammar validator.
//!
//! A canonical candidate is decoded, tokenized run by run, split into
//! statements on `;` and each statement is recognized against the ANSI
//! grammar with placeholders acting as wildcards.
//!
//! # Example
//! ```
//! use sqlsift_core::validator::{StatementKind, Validator, ValidatorConfig};
//!
//! let validator = Validator::new(ValidatorConfig::default()).unwrap();
//! let verdict = validator.validate("SELECT * FROM users WHERE id = $01").unwrap();
//! assert_eq!(verdict.statement_kind(), Some(StatementKind::Select));
//! ```

pub mod earley;
pub mod grammar;
pub mod lexer;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::SiftResult;
use crate::placeholder;
use earley::{Budget, Recognition};
use grammar::Grammar;
use lexer::SqlToken;

/// Category of an accepted statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Unknown,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Ddl => "DDL",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Kind for the statement-family nonterminal a derivation went through.
    fn from_family(name: &str) -> Self {
        match name {
            "query_statement" => Self::Select,
            "insert_statement" => Self::Insert,
            "update_statement" => Self::Update,
            "delete_statement" => Self::Delete,
            "ddl_statement" => Self::Ddl,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureReason {
    NoMatch,
    /// Nothing but placeholders and non-keywords: any statement could hide
    /// behind the placeholders.
    AmbiguousPlaceholderSpan,
    LexicalError,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoMatch => "no-match",
            Self::AmbiguousPlaceholderSpan => "ambiguous-placeholder-span",
            Self::LexicalError => "lexical-error",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of validating one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Verdict {
    Accepted {
        kind: StatementKind,
    },
    Rejected {
        reason: FailureReason,
        detail: String,
    },
}

impl Verdict {
    fn rejected(reason: FailureReason, detail: impl Into<String>) -> Self {
        Self::Rejected {
            reason,
            detail: detail.into(),
        }
    }

    pub fn accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn statement_kind(&self) -> Option<StatementKind> {
        match self {
            Self::Accepted { kind } => Some(*kind),
            Self::Rejected { .. } => None,
        }
    }

    pub fn failure_reason(&self) -> Option<FailureReason> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected { reason, .. } => Some(*reason),
        }
    }
}

/// How `;`-separated statement lists are judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementPolicy {
    /// Every statement must derive; the first one names the kind.
    #[default]
    All,
    /// At least one statement must derive; the first that does names the kind.
    Any,
    /// Exactly one statement is allowed.
    Single,
}

impl std::str::FromStr for StatementPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "any" => Ok(Self::Any),
            "single" => Ok(Self::Single),
            other => Err(format!(
                "unknown statement policy '{other}' (expected all, any or single)"
            )),
        }
    }
}

pub const DEFAULT_MAX_ITEMS: usize = 200_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Earley items processed per candidate before giving up.
    pub max_items: usize,
    /// Optional wall-clock limit per candidate, in milliseconds.
    pub time_budget_ms: Option<u64>,
    pub statement_policy: StatementPolicy,
    /// Also accept FROM-less `SELECT`, `TABLE t` and top-level `VALUES`.
    /// Off by default: short prose such as "Select one" derives from them.
    pub bare_queries: bool,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_items: DEFAULT_MAX_ITEMS,
            time_budget_ms: None,
            statement_policy: StatementPolicy::All,
            bare_queries: false,
        }
    }
}

impl ValidatorConfig {
    fn budget(&self) -> Budget {
        Budget::new(self.max_items, self.time_budget_ms.map(Duration::from_millis))
    }
}

/// Validates canonical candidates. Cheap to clone; the grammar is shared.
#[derive(Debug, Clone)]
pub struct Validator {
    grammar: Arc<Grammar>,
    config: ValidatorConfig,
}

impl Validator {
    /// A validator over the built-in ANSI grammar.
    ///
    /// `config.bare_queries` picks the grammar variant.
    pub fn new(config: ValidatorConfig) -> SiftResult<Self> {
        Ok(Self::with_grammar(grammar::ansi(config.bare_queries)?, config))
    }

    pub fn with_grammar(grammar: Arc<Grammar>, config: ValidatorConfig) -> Self {
        Self { grammar, config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Validate one canonical string.
    ///
    /// Rejection is a normal `Ok` verdict. `Err` means the string is not valid
    /// canonical form (`SiftError::MalformedEscape`).
    pub fn validate(&self, canonical: &str) -> SiftResult<Verdict> {
        let pieces = placeholder::decode(canonical)?;
        let verdict = match lexer::tokenize(&pieces) {
            Ok(tokens) => self.validate_tokens(&tokens),
            Err(detail) => Verdict::rejected(FailureReason::LexicalError, detail),
        };
        tracing::debug!(candidate = canonical, ?verdict, "validated");
        Ok(verdict)
    }

    fn validate_tokens(&self, tokens: &[SqlToken]) -> Verdict {
        let statements: Vec<&[SqlToken]> = tokens
            .split(|t| t.is_symbol(";"))
            .filter(|s| !s.is_empty())
            .collect();

        if statements.is_empty() {
            return Verdict::rejected(FailureReason::NoMatch, "no statement");
        }
        if self.config.statement_policy == StatementPolicy::Single && statements.len() > 1 {
            return Verdict::rejected(
                FailureReason::NoMatch,
                format!("expected a single statement, found {}", statements.len()),
            );
        }

        let mut budget = self.config.budget();
        let mut first: Option<Verdict> = None;
        for (n, statement) in statements.iter().enumerate() {
            let verdict = self.validate_statement(statement, &mut budget);
            let verdict = match verdict {
                Verdict::Rejected { reason, detail } if statements.len() > 1 => {
                    Verdict::rejected(reason, format!("statement {}: {detail}", n + 1))
                }
                other => other,
            };

            match self.config.statement_policy {
                StatementPolicy::All | StatementPolicy::Single => {
                    if !verdict.accepted() {
                        return verdict;
                    }
                    first.get_or_insert(verdict);
                }
                StatementPolicy::Any => {
                    if verdict.accepted() {
                        return verdict;
                    }
                    first.get_or_insert(verdict);
                }
            }
        }
        first.unwrap_or_else(|| Verdict::rejected(FailureReason::NoMatch, "no statement"))
    }

    fn validate_statement(&self, tokens: &[SqlToken], budget: &mut Budget) -> Verdict {
        let anchored = tokens
            .iter()
            .any(|t| matches!(t, SqlToken::Word(w) if self.grammar.is_keyword(w)));
        if !anchored {
            let has_placeholder = tokens.iter().any(|t| matches!(t, SqlToken::Placeholder(_)));
            return if has_placeholder {
                Verdict::rejected(
                    FailureReason::AmbiguousPlaceholderSpan,
                    "no SQL keyword outside placeholders",
                )
            } else {
                Verdict::rejected(FailureReason::NoMatch, "no SQL keyword")
            };
        }

        match earley::recognize(&self.grammar, tokens, budget) {
            Recognition::Matched { alternative } => {
                let kind = self
                    .grammar
                    .start_alternative_name(alternative)
                    .map_or(StatementKind::Unknown, StatementKind::from_family);
                Verdict::Accepted { kind }
            }
            Recognition::Stuck { position } => Verdict::rejected(
                FailureReason::NoMatch,
                format!(
                    "unexpected {} at token {}",
                    tokens.get(position).map_or_else(|| "end".to_string(), describe),
                    position + 1
                ),
            ),
            Recognition::Incomplete => {
                Verdict::rejected(FailureReason::NoMatch, "unexpected end of statement")
            }
            Recognition::Exhausted { items } => Verdict::rejected(
                FailureReason::NoMatch,
                format!("work budget exhausted after {items} items"),
            ),
        }
    }
}

fn describe(token: &SqlToken) -> String {
    match token {
        SqlToken::Word(w) => format!("'{w}'"),
        SqlToken::Symbol(s) => format!("'{s}'"),
        SqlToken::Placeholder(i) => format!("placeholder ${i:02}"),
        SqlToken::QuotedIdent => "quoted identifier".to_string(),
        SqlToken::Number => "number".to_string(),
        SqlToken::Str => "string literal".to_string(),
        SqlToken::Param => "bind parameter".to_string(),
    }
}
