//! Python tokenizer.
//!
//! Only what expression extraction needs: names, numbers, string literals
//! (with prefixes and triple quotes), operators, brackets and logical
//! newlines. Indentation is ignored.

use crate::error::{SiftError, SiftResult};

/// Multi-character operators first so the longest match wins.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->",
    "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", ":=", "+", "-", "*", "/", "%", "@",
    "&", "|", "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "=",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLit {
    pub raw: bool,
    pub bytes: bool,
    pub format: bool,
    /// Source text between the quotes, escapes untouched.
    pub body: String,
}

impl StrLit {
    /// The literal's value. Bytes literals have no `\u`/`\U` escapes.
    pub fn value(&self) -> String {
        if self.raw {
            self.body.clone()
        } else {
            unescape(&self.body, !self.bytes)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Name(String),
    Number,
    Str(StrLit),
    Op(&'static str),
    Newline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offsets into the source.
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn is_op(&self, op: &str) -> bool {
        matches!(self.kind, TokenKind::Op(o) if o == op)
    }
}

/// Maps byte offsets to 1-indexed (line, column) pairs.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    pub fn position(&self, source: &str, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let start = self.line_starts[line];
        let column = source
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(0);
        (line + 1, column + 1)
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    tokens: Vec<Token>,
    brackets: Vec<(char, usize)>,
    lines: LineIndex,
}

/// Tokenize Python source.
pub fn tokenize(src: &str) -> SiftResult<Vec<Token>> {
    let mut lexer = Lexer {
        src,
        pos: 0,
        tokens: Vec::new(),
        brackets: Vec::new(),
        lines: LineIndex::new(src),
    };
    lexer.run()?;
    Ok(lexer.tokens)
}

impl<'a> Lexer<'a> {
    fn error(&self, offset: usize, message: impl Into<String>) -> SiftError {
        let (line, column) = self.lines.position(self.src, offset);
        SiftError::parse(line, column, message)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, start: usize) {
        self.tokens.push(Token {
            kind,
            start,
            end: self.pos,
        });
    }

    fn run(&mut self) -> SiftResult<()> {
        while let Some(c) = self.peek() {
            let start = self.pos;
            match c {
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                '\\' => {
                    self.bump();
                    if self.peek() == Some('\r') {
                        self.bump();
                    }
                    if self.bump() != Some('\n') {
                        return Err(self.error(start, "unexpected character after line continuation"));
                    }
                }
                '\n' => {
                    self.bump();
                    let last_is_newline = matches!(
                        self.tokens.last(),
                        None | Some(Token {
                            kind: TokenKind::Newline,
                            ..
                        })
                    );
                    if self.brackets.is_empty() && !last_is_newline {
                        self.push(TokenKind::Newline, start);
                    }
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '"' | '\'' => self.string(start, "")?,
                c if c.is_alphabetic() || c == '_' => self.name_or_prefixed_string(start)?,
                c if c.is_ascii_digit() => self.number(start),
                '.' if self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => self.number(start),
                _ => self.operator(start)?,
            }
        }

        if let Some(&(open, offset)) = self.brackets.last() {
            return Err(self.error(offset, format!("'{}' was never closed", open)));
        }
        Ok(())
    }

    fn name_or_prefixed_string(&mut self, start: usize) -> SiftResult<()> {
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.bump();
            } else {
                break;
            }
        }
        let word = &self.src[start..self.pos];
        if matches!(self.peek(), Some('"' | '\'')) && is_string_prefix(word) {
            return self.string(start, word);
        }
        self.push(TokenKind::Name(word.to_string()), start);
        Ok(())
    }

    fn number(&mut self, start: usize) {
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-')
                && (prev == 'e' || prev == 'E')
                && !self.src[start..self.pos].starts_with("0x")
                && !self.src[start..self.pos].starts_with("0X");
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || exponent_sign {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }
        self.push(TokenKind::Number, start);
    }

    fn string(&mut self, start: usize, prefix: &str) -> SiftResult<()> {
        let lower = prefix.to_ascii_lowercase();
        let raw = lower.contains('r');
        let bytes = lower.contains('b');
        let format = lower.contains('f');

        let quote = self.bump().unwrap_or('"');
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.bump();
            self.bump();
        }

        let body_start = self.pos;
        loop {
            let Some(c) = self.peek() else {
                return Err(self.error(start, "unterminated string literal"));
            };
            if c == '\\' {
                self.bump();
                self.bump();
                continue;
            }
            if c == '\n' && !triple {
                return Err(self.error(start, "unterminated string literal"));
            }
            if c == quote {
                if !triple {
                    let body = self.src[body_start..self.pos].to_string();
                    self.bump();
                    self.push(
                        TokenKind::Str(StrLit {
                            raw,
                            bytes,
                            format,
                            body,
                        }),
                        start,
                    );
                    return Ok(());
                }
                if self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote) {
                    let body = self.src[body_start..self.pos].to_string();
                    self.bump();
                    self.bump();
                    self.bump();
                    self.push(
                        TokenKind::Str(StrLit {
                            raw,
                            bytes,
                            format,
                            body,
                        }),
                        start,
                    );
                    return Ok(());
                }
            }
            self.bump();
        }
    }

    fn operator(&mut self, start: usize) -> SiftResult<()> {
        let rest = &self.src[self.pos..];
        let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) else {
            let c = self.peek().unwrap_or('?');
            return Err(self.error(start, format!("invalid character '{}'", c)));
        };
        self.pos += op.len();

        match *op {
            "(" | "[" | "{" => {
                let open = op.chars().next().unwrap_or('(');
                self.brackets.push((open, start));
            }
            ")" | "]" | "}" => {
                let expected = match *op {
                    ")" => '(',
                    "]" => '[',
                    _ => '{',
                };
                match self.brackets.pop() {
                    Some((open, _)) if open == expected => {}
                    Some((open, _)) => {
                        return Err(self.error(
                            start,
                            format!("closing '{}' does not match '{}'", op, open),
                        ));
                    }
                    None => return Err(self.error(start, format!("unmatched '{}'", op))),
                }
            }
            ";" if self.brackets.is_empty() => {
                self.push(TokenKind::Newline, start);
                return Ok(());
            }
            _ => {}
        }
        self.push(TokenKind::Op(op), start);
        Ok(())
    }
}

fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

/// Decode the escape sequences of a non-raw literal body.
///
/// Unknown escapes are kept verbatim, as Python does.
pub fn decode_escapes(body: &str) -> String {
    unescape(body, true)
}

fn unescape(body: &str, unicode: bool) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0C}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0B}'),
            '0'..='7' => {
                let mut digits = String::from(next);
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            digits.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                push_code(&mut out, u32::from_str_radix(&digits, 8).ok(), &format!("\\{digits}"));
            }
            'u' | 'U' if !unicode => {
                out.push('\\');
                out.push(next);
            }
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.by_ref().take(width).collect();
                let code = if digits.len() == width {
                    u32::from_str_radix(&digits, 16).ok()
                } else {
                    None
                };
                push_code(&mut out, code, &format!("\\{next}{digits}"));
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

fn push_code(out: &mut String, code: Option<u32>, fallback: &str) {
    match code.and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => out.push_str(fallback),
    }
}
