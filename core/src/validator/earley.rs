//! Earley recognizer with placeholder wildcards.
//!
//! Nullable nonterminals are handled the Aycock-Horspool way: predicting a
//! nullable symbol also advances over it, so zero-width completions never
//! have to be replayed.
//!
//! A placeholder consumes exactly one token position and either
//! - stands for one whole derivation of a wildcard nonterminal, or
//! - matches a lexical class terminal (`@ident`, `@number`, ...).
//!
//! It never matches a keyword or a symbol.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use super::grammar::{Grammar, NtId, RuleId, Symbol};
use super::lexer::SqlToken;

/// Wall-clock checks happen once per this many items.
const CLOCK_INTERVAL: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Item {
    rule: RuleId,
    dot: usize,
    origin: usize,
}

impl Item {
    fn advance(self) -> Self {
        Self {
            dot: self.dot + 1,
            ..self
        }
    }
}

#[derive(Debug, Default)]
struct ItemSet {
    items: Vec<Item>,
    seen: HashSet<Item>,
    /// Items whose next symbol is the keyed nonterminal.
    waiting: HashMap<NtId, Vec<Item>>,
}

impl ItemSet {
    fn add(&mut self, item: Item, grammar: &Grammar) {
        if !self.seen.insert(item) {
            return;
        }
        if let Some(Symbol::N(next)) = grammar.rule(item.rule).rhs.get(item.dot) {
            self.waiting.entry(*next).or_default().push(item);
        }
        self.items.push(item);
    }

    fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Work limit for one recognition.
#[derive(Debug, Clone)]
pub struct Budget {
    max_items: usize,
    deadline: Option<Instant>,
    used: usize,
}

impl Budget {
    pub fn new(max_items: usize, time_budget: Option<Duration>) -> Self {
        Self {
            max_items,
            deadline: time_budget.map(|d| Instant::now() + d),
            used: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self::new(usize::MAX, None)
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Account for one processed item. `false` once the budget is spent.
    fn charge(&mut self) -> bool {
        self.used += 1;
        if self.used > self.max_items {
            return false;
        }
        if self.used % CLOCK_INTERVAL == 0
            && let Some(deadline) = self.deadline
        {
            return Instant::now() < deadline;
        }
        true
    }
}

/// How a recognition attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recognition {
    /// The input derives from the start symbol. `alternative` is the index of
    /// the leftmost start rule with a successful derivation.
    Matched { alternative: usize },
    /// No item survives past the token at `position`.
    Stuck { position: usize },
    /// Every token was consumed but no derivation is complete.
    Incomplete,
    /// Item or time budget ran out after `items` items.
    Exhausted { items: usize },
}

/// Run the recognizer over `tokens`.
pub fn recognize(grammar: &Grammar, tokens: &[SqlToken], budget: &mut Budget) -> Recognition {
    let start = grammar.start();
    let mut sets: Vec<ItemSet> = Vec::with_capacity(tokens.len() + 1);
    let mut current = ItemSet::default();
    for &rule in &grammar.nonterminal(start).rules {
        current.add(
            Item {
                rule,
                dot: 0,
                origin: 0,
            },
            grammar,
        );
    }

    for position in 0..=tokens.len() {
        let token = tokens.get(position);
        let mut next = ItemSet::default();
        let placeholder = matches!(token, Some(SqlToken::Placeholder(_)));

        let mut k = 0;
        while k < current.items.len() {
            let item = current.items[k];
            k += 1;
            if !budget.charge() {
                return Recognition::Exhausted { items: budget.used() };
            }

            let rule = grammar.rule(item.rule);
            match rule.rhs.get(item.dot) {
                None => {
                    // Zero-width completions were already advanced at prediction.
                    if item.origin == position {
                        continue;
                    }
                    if let Some(parents) = sets[item.origin].waiting.get(&rule.lhs) {
                        for &parent in parents {
                            current.add(parent.advance(), grammar);
                        }
                    }
                }
                Some(Symbol::N(nt)) => {
                    let nonterminal = grammar.nonterminal(*nt);
                    for &r in &nonterminal.rules {
                        current.add(
                            Item {
                                rule: r,
                                dot: 0,
                                origin: position,
                            },
                            grammar,
                        );
                    }
                    if nonterminal.nullable {
                        current.add(item.advance(), grammar);
                    }
                    if placeholder && nonterminal.wildcard {
                        next.add(item.advance(), grammar);
                    }
                }
                Some(Symbol::T(t)) => {
                    if let Some(token) = token
                        && grammar.matches(*t, token)
                    {
                        next.add(item.advance(), grammar);
                    }
                }
            }
        }

        if position == tokens.len() {
            return accept(grammar, &current);
        }
        if next.is_empty() {
            return Recognition::Stuck { position };
        }
        sets.push(current);
        current = next;
    }

    Recognition::Incomplete
}

fn accept(grammar: &Grammar, last: &ItemSet) -> Recognition {
    let start_rules = &grammar.nonterminal(grammar.start()).rules;
    last.items
        .iter()
        .filter(|item| item.origin == 0 && item.dot == grammar.rule(item.rule).rhs.len())
        .filter_map(|item| start_rules.iter().position(|&r| r == item.rule))
        .min()
        .map_or(Recognition::Incomplete, |alternative| Recognition::Matched {
            alternative,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TOY: &str = r#"
        !stmt = query | removal ;
        !query = SELECT list [FROM table] [WHERE cond] ;
        !removal = DELETE FROM table [WHERE cond] ;
        list = '*' | expr { ',' expr } ;
        table = @ident ;
        cond = expr '=' expr ;
        expr = @ident | @number | '(' expr ')' ;
    "#;

    fn toy() -> Grammar {
        Grammar::from_ebnf(TOY, "stmt", &["SELECT", "FROM", "WHERE", "DELETE"]).unwrap()
    }

    fn word(w: &str) -> SqlToken {
        SqlToken::Word(w.into())
    }

    fn sym(s: &'static str) -> SqlToken {
        SqlToken::Symbol(s)
    }

    fn run(tokens: &[SqlToken]) -> Recognition {
        recognize(&toy(), tokens, &mut Budget::unlimited())
    }

    #[test]
    fn test_plain_recognition() {
        let tokens = [word("SELECT"), sym("*"), word("FROM"), word("USERS")];
        assert_eq!(run(&tokens), Recognition::Matched { alternative: 0 });

        let tokens = [word("DELETE"), word("FROM"), word("T")];
        assert_eq!(run(&tokens), Recognition::Matched { alternative: 1 });
    }

    #[test]
    fn test_stuck_position() {
        let tokens = [word("SELECT"), sym("*"), sym("*")];
        assert_eq!(run(&tokens), Recognition::Stuck { position: 2 });
    }

    #[test]
    fn test_incomplete_input() {
        let tokens = [word("SELECT"), sym("*"), word("FROM")];
        assert_eq!(run(&tokens), Recognition::Incomplete);
    }

    #[test]
    fn test_placeholder_stands_for_wildcard() {
        // $01 as the whole select list, $02 as the whole condition.
        let tokens = [
            word("SELECT"),
            SqlToken::Placeholder(1),
            word("FROM"),
            word("T"),
            word("WHERE"),
            SqlToken::Placeholder(2),
        ];
        assert_eq!(run(&tokens), Recognition::Matched { alternative: 0 });
    }

    #[test]
    fn test_placeholder_never_matches_keyword_or_symbol() {
        let tokens = [word("SELECT"), sym("*"), SqlToken::Placeholder(1), word("T")];
        assert_eq!(run(&tokens), Recognition::Stuck { position: 2 });

        let tokens = [SqlToken::Placeholder(1)];
        assert_eq!(run(&tokens), Recognition::Stuck { position: 0 });
    }

    #[test]
    fn test_item_budget() {
        let tokens = [word("SELECT"), sym("*"), word("FROM"), word("USERS")];
        let mut budget = Budget::new(3, None);
        assert_eq!(
            recognize(&toy(), &tokens, &mut budget),
            Recognition::Exhausted { items: 4 }
        );
    }

    #[test]
    fn test_nullable_chain() {
        let g = Grammar::from_ebnf("!s = a b C ; a = [X] ; b = { Y } ;", "s", &[]).unwrap();
        let mut budget = Budget::unlimited();
        assert_eq!(
            recognize(&g, &[word("C")], &mut budget),
            Recognition::Matched { alternative: 0 }
        );
        assert_eq!(
            recognize(&g, &[word("X"), word("Y"), word("Y"), word("C")], &mut budget),
            Recognition::Matched { alternative: 0 }
        );
    }
}
