//! Parser for the compact EBNF notation the SQL grammar is written in.
//!
//! ```text
//! # comment
//! !statement = SELECT select_list [from_clause] ;
//! select_list = '*' | item { ',' item } ;
//! item = @ident | '(' ( @number | @string ) ')' ;
//! ```
//!
//! Lowercase names are nonterminals, uppercase words are keywords, quoted text
//! is a symbol and `@class` is a lexical class. A leading `!` marks a rule that
//! a placeholder may not stand for.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{char, multispace1, not_line_ending, satisfy},
    combinator::{map, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, preceded},
};

use crate::error::{SiftError, SiftResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenClass {
    Ident,
    Number,
    Str,
    Param,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Nonterminal(String),
    Keyword(String),
    Symbol(String),
    Class(TokenClass),
    Optional(Alternatives),
    Repeat(Alternatives),
    Group(Alternatives),
}

/// `a b | c` is `[[a, b], [c]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alternatives(pub Vec<Vec<Term>>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleDef {
    pub name: String,
    pub wildcard: bool,
    pub body: Alternatives,
}

type Res<'a, T> = IResult<&'a str, T>;

fn skip(input: &str) -> Res<'_, ()> {
    value(
        (),
        many0(alt((multispace1, preceded(char('#'), not_line_ending)))),
    )
    .parse(input)
}

fn nonterminal_name(input: &str) -> Res<'_, &str> {
    recognize((
        satisfy(|c| c.is_ascii_lowercase()),
        take_while(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'),
    ))
    .parse(input)
}

fn keyword(input: &str) -> Res<'_, &str> {
    recognize((
        satisfy(|c| c.is_ascii_uppercase()),
        take_while(|c: char| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'),
    ))
    .parse(input)
}

fn symbol(input: &str) -> Res<'_, &str> {
    delimited(char('\''), is_not("'"), char('\'')).parse(input)
}

fn class(input: &str) -> Res<'_, TokenClass> {
    preceded(
        char('@'),
        alt((
            value(TokenClass::Ident, tag("ident")),
            value(TokenClass::Number, tag("number")),
            value(TokenClass::Str, tag("string")),
            value(TokenClass::Param, tag("param")),
        )),
    )
    .parse(input)
}

fn bracketed(open: char, close: char) -> impl FnMut(&str) -> Res<'_, Alternatives> {
    move |input| {
        delimited(char(open), alternatives, preceded(skip, char(close))).parse(input)
    }
}

fn term(input: &str) -> Res<'_, Term> {
    preceded(
        skip,
        alt((
            map(bracketed('[', ']'), Term::Optional),
            map(bracketed('{', '}'), Term::Repeat),
            map(bracketed('(', ')'), Term::Group),
            map(symbol, |s| Term::Symbol(s.to_string())),
            map(class, Term::Class),
            map(keyword, |k| Term::Keyword(k.to_string())),
            map(nonterminal_name, |n| Term::Nonterminal(n.to_string())),
        )),
    )
    .parse(input)
}

fn alternatives(input: &str) -> Res<'_, Alternatives> {
    map(
        separated_list1(preceded(skip, char('|')), many0(term)),
        Alternatives,
    )
    .parse(input)
}

fn rule(input: &str) -> Res<'_, RuleDef> {
    map(
        (
            skip,
            opt(char('!')),
            nonterminal_name,
            skip,
            char('='),
            alternatives,
            skip,
            char(';'),
        ),
        |(_, bang, name, _, _, body, _, _)| RuleDef {
            name: name.to_string(),
            wildcard: bang.is_none(),
            body,
        },
    )
    .parse(input)
}

/// Parse a complete grammar text.
pub fn parse_rules(text: &str) -> SiftResult<Vec<RuleDef>> {
    let (rest, rules) = many0(rule)
        .parse(text)
        .map_err(|e| SiftError::grammar(format!("malformed grammar: {e}")))?;
    let (rest, _) = skip(rest).map_err(|e| SiftError::grammar(format!("malformed grammar: {e}")))?;

    if !rest.is_empty() {
        let line = text[..text.len() - rest.len()].matches('\n').count() + 1;
        let snippet: String = rest.chars().take(40).collect();
        return Err(SiftError::grammar(format!(
            "cannot parse grammar near line {line}: '{snippet}'"
        )));
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nt(n: &str) -> Term {
        Term::Nonterminal(n.into())
    }

    fn kw(k: &str) -> Term {
        Term::Keyword(k.into())
    }

    #[test]
    fn test_parse_rule_forms() {
        let rules = parse_rules(
            "# header\n!stmt = SELECT list [FROM @ident] ;\nlist = '*' | item { ',' item } ;",
        )
        .unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].name, "stmt");
        assert!(!rules[0].wildcard);
        assert!(rules[1].wildcard);
        assert_eq!(
            rules[0].body,
            Alternatives(vec![vec![
                kw("SELECT"),
                nt("list"),
                Term::Optional(Alternatives(vec![vec![
                    kw("FROM"),
                    Term::Class(TokenClass::Ident)
                ]])),
            ]])
        );
        assert_eq!(
            rules[1].body,
            Alternatives(vec![
                vec![Term::Symbol("*".into())],
                vec![
                    nt("item"),
                    Term::Repeat(Alternatives(vec![vec![Term::Symbol(",".into()), nt("item")]])),
                ],
            ])
        );
    }

    #[test]
    fn test_groups_and_comments() {
        let rules = parse_rules("a = ( B | c ) # trailing\n  D ;").unwrap();
        assert_eq!(
            rules[0].body,
            Alternatives(vec![vec![
                Term::Group(Alternatives(vec![vec![kw("B")], vec![nt("c")]])),
                kw("D"),
            ]])
        );
    }

    #[test]
    fn test_malformed_grammar() {
        let err = parse_rules("a = B ;\nb = [ C ;").unwrap_err();
        assert!(matches!(err, SiftError::Grammar(_)));
        assert!(err.to_string().contains("line 2"), "{err}");
    }
}
