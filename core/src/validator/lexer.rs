//! SQL lexical layer.
//!
//! Each decoded text run is tokenized on its own; placeholders pass through as
//! opaque tokens, so they always sit on token boundaries.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{is_not, tag, take_until, take_while},
    character::complete::{char, digit0, digit1, multispace1, one_of, satisfy},
    combinator::{map, opt, recognize, value},
    error::{Error, ErrorKind},
    multi::many0,
    sequence::{delimited, preceded},
};

use crate::placeholder::Piece;

/// Two-character operators come first so the longest match wins.
const SYMBOLS: &[&str] = &[
    "<>", "!=", "<=", ">=", "||", "=", "<", ">", "+", "-", "*", "/", "%", "^", "&", "|", "~",
    "!", "(", ")", ",", ";", ".", "[", "]",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlToken {
    /// Unquoted word, upper-cased. Keyword or identifier, the grammar decides.
    Word(String),
    QuotedIdent,
    Number,
    Str,
    /// Driver bind parameter: `?`, `$1`, `:name`, `%s`, `%(name)s`.
    Param,
    Symbol(&'static str),
    Placeholder(u8),
}

impl SqlToken {
    pub fn is_symbol(&self, s: &str) -> bool {
        matches!(self, SqlToken::Symbol(sym) if *sym == s)
    }
}

type Res<'a, T> = IResult<&'a str, T>;

fn line_comment(input: &str) -> Res<'_, &str> {
    preceded(tag("--"), take_while(|c| c != '\n')).parse(input)
}

fn block_comment(input: &str) -> Res<'_, &str> {
    delimited(tag("/*"), take_until("*/"), tag("*/")).parse(input)
}

fn trivia(input: &str) -> Res<'_, ()> {
    value((), alt((multispace1, line_comment, block_comment))).parse(input)
}

fn string_literal(input: &str) -> Res<'_, SqlToken> {
    value(
        SqlToken::Str,
        (
            opt(one_of("NnXxBb")),
            char('\''),
            many0(alt((is_not("'"), tag("''")))),
            char('\''),
        ),
    )
    .parse(input)
}

fn quoted_identifier(input: &str) -> Res<'_, SqlToken> {
    value(
        SqlToken::QuotedIdent,
        (char('"'), many0(alt((is_not("\""), tag("\"\"")))), char('"')),
    )
    .parse(input)
}

fn number(input: &str) -> Res<'_, SqlToken> {
    value(
        SqlToken::Number,
        (
            alt((
                recognize((digit1, opt((char('.'), digit0)))),
                recognize((char('.'), digit1)),
            )),
            opt((one_of("eE"), opt(one_of("+-")), digit1)),
        ),
    )
    .parse(input)
}

fn word_chars(input: &str) -> Res<'_, &str> {
    recognize((
        satisfy(|c| c.is_alphabetic() || c == '_'),
        take_while(|c: char| c.is_alphanumeric() || c == '_'),
    ))
    .parse(input)
}

fn param(input: &str) -> Res<'_, SqlToken> {
    value(
        SqlToken::Param,
        alt((
            tag("?"),
            recognize((char('$'), digit1)),
            recognize((char(':'), word_chars)),
            tag("%s"),
            recognize((tag("%("), is_not(")"), tag(")s"))),
        )),
    )
    .parse(input)
}

fn word(input: &str) -> Res<'_, SqlToken> {
    map(word_chars, |w| SqlToken::Word(w.to_uppercase())).parse(input)
}

fn symbol(input: &str) -> Res<'_, SqlToken> {
    match SYMBOLS.iter().find(|s| input.starts_with(**s)) {
        Some(sym) => Ok((&input[sym.len()..], SqlToken::Symbol(sym))),
        None => Err(nom::Err::Error(Error::new(input, ErrorKind::Tag))),
    }
}

fn token(input: &str) -> Res<'_, Option<SqlToken>> {
    alt((
        value(None, trivia),
        map(
            alt((string_literal, quoted_identifier, number, param, word, symbol)),
            Some,
        ),
    ))
    .parse(input)
}

/// Explain why no token could be read at the start of `rest`.
fn describe_failure(rest: &str) -> String {
    let mut chars = rest.chars();
    let first = chars.next().unwrap_or(' ');
    let prefixed_quote = "NnXxBb".contains(first) && chars.next() == Some('\'');
    if first == '\'' || prefixed_quote {
        "unterminated string literal".to_string()
    } else if rest.starts_with('"') {
        "unterminated quoted identifier".to_string()
    } else if rest.starts_with("/*") {
        "unterminated block comment".to_string()
    } else {
        let c = rest.chars().next().unwrap_or(' ');
        format!("invalid character '{}'", c)
    }
}

fn lex_run(text: &str, out: &mut Vec<SqlToken>) -> Result<(), String> {
    let mut rest = text;
    while !rest.is_empty() {
        match token(rest) {
            Ok((remaining, tok)) => {
                out.extend(tok);
                rest = remaining;
            }
            Err(_) => {
                let offset = text.len() - rest.len();
                return Err(format!("{} at offset {}", describe_failure(rest), offset));
            }
        }
    }
    Ok(())
}

/// Tokenize a decoded candidate. `Err` carries a lexical diagnostic.
pub fn tokenize(pieces: &[Piece]) -> Result<Vec<SqlToken>, String> {
    let mut tokens = Vec::new();
    for piece in pieces {
        match piece {
            Piece::Text(text) => lex_run(text, &mut tokens)?,
            Piece::Placeholder(index) => tokens.push(SqlToken::Placeholder(*index)),
        }
    }
    Ok(tokens)
}
