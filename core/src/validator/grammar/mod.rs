//! Grammar tables for the recognizer.
//!
//! Rules are written in a compact EBNF (see [`ebnf`]) and lowered once into
//! plain BNF: every optional, repetition and multi-way group becomes a
//! generated helper nonterminal named `owner#n`. The resulting [`Grammar`] is
//! immutable and shared by every worker.

pub mod ddl;
pub mod dml;
pub mod ebnf;
pub mod expr;
pub mod query;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};

use crate::error::{SiftError, SiftResult};
use crate::validator::lexer::SqlToken;
use ebnf::{Alternatives, RuleDef, Term, TokenClass};

pub type NtId = usize;
pub type RuleId = usize;
pub type TermId = usize;

/// Words that never match `@ident`. Every other grammar keyword doubles as
/// an identifier, so `name`, `level` or `data` stay usable as column names.
pub const RESERVED: &[&str] = &[
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CAST", "CHECK",
    "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
    "ELSE", "END", "EXCEPT", "EXISTS", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "FULL",
    "GRANT", "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN",
    "LATERAL", "LEFT", "LIKE", "LIMIT", "LOCALTIME", "LOCALTIMESTAMP", "NATURAL", "NOT",
    "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "REVOKE",
    "RIGHT", "SELECT", "SESSION_USER", "SET", "SIMILAR", "SOME", "TABLE", "THEN", "TO",
    "TRUE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WINDOW", "WITH",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminal {
    Keyword(String),
    Symbol(String),
    Ident,
    Number,
    Str,
    Param,
}

impl Terminal {
    /// Lexical classes accept a placeholder; keywords and symbols never do.
    pub fn is_class(&self) -> bool {
        !matches!(self, Terminal::Keyword(_) | Terminal::Symbol(_))
    }
}

impl From<TokenClass> for Terminal {
    fn from(class: TokenClass) -> Self {
        match class {
            TokenClass::Ident => Terminal::Ident,
            TokenClass::Number => Terminal::Number,
            TokenClass::Str => Terminal::Str,
            TokenClass::Param => Terminal::Param,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    T(TermId),
    N(NtId),
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub lhs: NtId,
    pub rhs: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    pub name: String,
    /// A placeholder may stand for one whole derivation of this nonterminal.
    pub wildcard: bool,
    pub nullable: bool,
    /// Rule ids in definition order.
    pub rules: Vec<RuleId>,
}

#[derive(Debug, Clone)]
pub struct Grammar {
    nonterminals: Vec<Nonterminal>,
    rules: Vec<Rule>,
    terminals: Vec<Terminal>,
    names: HashMap<String, NtId>,
    start: NtId,
    keywords: HashSet<String>,
    reserved: HashSet<String>,
}

impl Grammar {
    /// Parse, lower and analyse an EBNF grammar text.
    pub fn from_ebnf(text: &str, start: &str, reserved: &[&str]) -> SiftResult<Self> {
        let defs = ebnf::parse_rules(text)?;
        let mut builder = Builder::default();

        for def in &defs {
            if builder.names.contains_key(&def.name) {
                return Err(SiftError::grammar(format!(
                    "nonterminal '{}' is defined twice",
                    def.name
                )));
            }
            builder.declare(def.name.clone(), def.wildcard);
        }

        let start = *builder
            .names
            .get(start)
            .ok_or_else(|| SiftError::grammar(format!("start symbol '{start}' is not defined")))?;

        for def in &defs {
            builder.lower_definition(def)?;
        }

        let mut grammar = Grammar {
            nonterminals: builder.nonterminals,
            rules: builder.rules,
            terminals: builder.terminals,
            names: builder.names,
            start,
            keywords: builder.keywords,
            reserved: reserved.iter().map(|w| w.to_ascii_uppercase()).collect(),
        };
        grammar.compute_nullable();

        tracing::debug!(
            nonterminals = grammar.nonterminals.len(),
            rules = grammar.rules.len(),
            terminals = grammar.terminals.len(),
            "grammar built"
        );
        Ok(grammar)
    }

    fn compute_nullable(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for rule in &self.rules {
                if self.nonterminals[rule.lhs].nullable {
                    continue;
                }
                let nullable = rule.rhs.iter().all(|sym| match sym {
                    Symbol::N(n) => self.nonterminals[*n].nullable,
                    Symbol::T(_) => false,
                });
                if nullable {
                    self.nonterminals[rule.lhs].nullable = true;
                    changed = true;
                }
            }
        }
    }

    pub fn start(&self) -> NtId {
        self.start
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn nonterminal(&self, id: NtId) -> &Nonterminal {
        &self.nonterminals[id]
    }

    pub fn terminal(&self, id: TermId) -> &Terminal {
        &self.terminals[id]
    }

    pub fn lookup(&self, name: &str) -> Option<NtId> {
        self.names.get(name).copied()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Whether `word` (upper-case) appears as a keyword anywhere in the grammar.
    pub fn is_keyword(&self, word: &str) -> bool {
        self.keywords.contains(word)
    }

    /// Name of the nonterminal a start rule derives into, for single-symbol
    /// start alternatives such as `sql_statement = query_statement`.
    pub fn start_alternative_name(&self, alternative: usize) -> Option<&str> {
        let rule = self.nonterminals[self.start].rules.get(alternative)?;
        match self.rules[*rule].rhs.as_slice() {
            [Symbol::N(n)] => Some(self.nonterminals[*n].name.as_str()),
            _ => None,
        }
    }

    /// Whether terminal `id` accepts `token`.
    pub fn matches(&self, id: TermId, token: &SqlToken) -> bool {
        match (&self.terminals[id], token) {
            (Terminal::Keyword(k), SqlToken::Word(w)) => k == w,
            (Terminal::Symbol(s), SqlToken::Symbol(sym)) => s == sym,
            (Terminal::Ident, SqlToken::Word(w)) => !self.reserved.contains(w),
            (Terminal::Ident, SqlToken::QuotedIdent)
            | (Terminal::Number, SqlToken::Number)
            | (Terminal::Str, SqlToken::Str)
            | (Terminal::Param, SqlToken::Param) => true,
            (terminal, SqlToken::Placeholder(_)) => terminal.is_class(),
            _ => false,
        }
    }
}

#[derive(Default)]
struct Builder {
    nonterminals: Vec<Nonterminal>,
    rules: Vec<Rule>,
    terminals: Vec<Terminal>,
    terminal_ids: HashMap<Terminal, TermId>,
    names: HashMap<String, NtId>,
    keywords: HashSet<String>,
    helpers: HashMap<NtId, usize>,
}

impl Builder {
    fn declare(&mut self, name: String, wildcard: bool) -> NtId {
        let id = self.nonterminals.len();
        self.names.insert(name.clone(), id);
        self.nonterminals.push(Nonterminal {
            name,
            wildcard,
            nullable: false,
            rules: Vec::new(),
        });
        id
    }

    fn helper(&mut self, owner: NtId) -> NtId {
        let n = self.helpers.entry(owner).or_insert(0);
        *n += 1;
        let name = format!("{}#{}", self.nonterminals[owner].name, n);
        self.declare(name, false)
    }

    fn terminal(&mut self, terminal: Terminal) -> Symbol {
        if let Terminal::Keyword(k) = &terminal {
            self.keywords.insert(k.clone());
        }
        let next = self.terminals.len();
        let id = *self.terminal_ids.entry(terminal.clone()).or_insert(next);
        if id == next {
            self.terminals.push(terminal);
        }
        Symbol::T(id)
    }

    fn add_rule(&mut self, lhs: NtId, rhs: Vec<Symbol>) {
        let id = self.rules.len();
        self.rules.push(Rule { lhs, rhs });
        self.nonterminals[lhs].rules.push(id);
    }

    fn lower_definition(&mut self, def: &RuleDef) -> SiftResult<()> {
        let lhs = self.names[&def.name];
        for seq in &def.body.0 {
            let rhs = self.lower_sequence(lhs, seq)?;
            self.add_rule(lhs, rhs);
        }
        Ok(())
    }

    fn lower_sequence(&mut self, owner: NtId, seq: &[Term]) -> SiftResult<Vec<Symbol>> {
        let mut out = Vec::with_capacity(seq.len());
        for term in seq {
            match term {
                Term::Nonterminal(name) => {
                    let id = self.names.get(name).copied().ok_or_else(|| {
                        SiftError::grammar(format!(
                            "'{}' references undefined nonterminal '{name}'",
                            self.nonterminals[owner].name
                        ))
                    })?;
                    out.push(Symbol::N(id));
                }
                Term::Keyword(k) => out.push(self.terminal(Terminal::Keyword(k.clone()))),
                Term::Symbol(s) => out.push(self.terminal(Terminal::Symbol(s.clone()))),
                Term::Class(class) => out.push(self.terminal((*class).into())),
                Term::Optional(alts) => {
                    let helper = self.helper(owner);
                    self.add_rule(helper, Vec::new());
                    self.lower_alternatives(owner, helper, alts, false)?;
                    out.push(Symbol::N(helper));
                }
                Term::Repeat(alts) => {
                    let helper = self.helper(owner);
                    self.add_rule(helper, Vec::new());
                    self.lower_alternatives(owner, helper, alts, true)?;
                    out.push(Symbol::N(helper));
                }
                Term::Group(alts) if alts.0.len() == 1 => {
                    out.extend(self.lower_sequence(owner, &alts.0[0])?);
                }
                Term::Group(alts) => {
                    let helper = self.helper(owner);
                    self.lower_alternatives(owner, helper, alts, false)?;
                    out.push(Symbol::N(helper));
                }
            }
        }
        Ok(out)
    }

    /// One rule per alternative; repetitions are left-recursive.
    fn lower_alternatives(
        &mut self,
        owner: NtId,
        helper: NtId,
        alts: &Alternatives,
        repeat: bool,
    ) -> SiftResult<()> {
        for seq in &alts.0 {
            let mut rhs = if repeat {
                vec![Symbol::N(helper)]
            } else {
                Vec::new()
            };
            rhs.extend(self.lower_sequence(owner, seq)?);
            self.add_rule(helper, rhs);
        }
        Ok(())
    }
}

/// Grammar texts in load order, minus the query primary.
const ANSI_SOURCES: &[&str] = &[
    query::STATEMENTS,
    query::QUERY,
    expr::EXPRESSIONS,
    dml::DML,
    dml::TRANSACTIONS,
    dml::ACCESS,
    ddl::DDL,
];

fn build(primary: &str) -> Result<Arc<Grammar>, String> {
    let mut text = ANSI_SOURCES.concat();
    text.push_str(primary);
    Grammar::from_ebnf(&text, "sql_statement", RESERVED)
        .map(Arc::new)
        .map_err(|e| e.to_string())
}

static ANSI: LazyLock<Result<Arc<Grammar>, String>> =
    LazyLock::new(|| build(query::QUERY_PRIMARY));

static ANSI_BARE: LazyLock<Result<Arc<Grammar>, String>> =
    LazyLock::new(|| build(query::BARE_QUERY_PRIMARY));

/// The process-wide ANSI SQL grammar, built on first use.
///
/// With `bare_queries`, FROM-less SELECT, `TABLE t` and top-level `VALUES`
/// are accepted as queries too.
pub fn ansi(bare_queries: bool) -> SiftResult<Arc<Grammar>> {
    let grammar = if bare_queries { &ANSI_BARE } else { &ANSI };
    LazyLock::force(grammar).clone().map_err(SiftError::Grammar)
}
