//! Tolerant Python expression parser.
//!
//! Statements are not modelled: the module is read as a flat sequence of
//! expressions, and any token that cannot start one (keywords, `=`, `:`,
//! commas, comparisons) is skipped. What remains is enough structure to see
//! string concatenations, `%` formatting and `.format()` calls.

use super::lexer::{StrLit, Token, TokenKind};

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Mod,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgKind {
    Positional,
    Keyword(String),
    Star,
    DoubleStar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arg {
    pub kind: ArgKind,
    pub value: Node,
    /// Expressions after the value that are not arguments themselves
    /// (generator clauses, conditional expressions).
    pub extra: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// One or more adjacent literals, implicitly concatenated.
    Str(Vec<StrLit>),
    Name(String),
    Number,
    /// Operators of one precedence level, flattened: `a + b - c` is
    /// `first: a, rest: [(Add, b), (Other, c)]`.
    Binary {
        first: Box<Node>,
        rest: Vec<(BinOp, Node)>,
    },
    Unary(Box<Node>),
    Attribute {
        value: Box<Node>,
        attr: String,
    },
    Call {
        func: Box<Node>,
        args: Vec<Arg>,
    },
    Subscript {
        value: Box<Node>,
        index: Vec<Node>,
    },
    Paren(Box<Node>),
    /// Tuple, list, dict or set display; `open` is the opening bracket.
    Collection {
        open: char,
        items: Vec<Node>,
    },
}

/// An expression together with the token range it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    pub first: usize,
    pub last: usize,
}

impl Node {
    /// Dotted name of a `Name` or attribute chain, e.g. `cursor.execute`.
    pub fn dotted_name(&self) -> Option<String> {
        match &self.kind {
            NodeKind::Name(name) => Some(name.clone()),
            NodeKind::Attribute { value, attr } => {
                let base = value.dotted_name().unwrap_or_default();
                Some(if base.is_empty() {
                    attr.clone()
                } else {
                    format!("{base}.{attr}")
                })
            }
            _ => None,
        }
    }
}

/// Deepest bracket, prefix-operator and trailer nesting accepted. CPython
/// stops at the same depth.
pub const MAX_NESTING: usize = 200;

/// Nesting went past [`MAX_NESTING`] at token index `token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TooDeep {
    pub token: usize,
}

/// Parse a token stream into its top-level expressions, in source order.
pub fn parse_module(tokens: &[Token]) -> Result<Vec<Node>, TooDeep> {
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        too_deep: None,
    };
    let (nodes, _) = parser.sequence(None);
    match parser.too_deep {
        Some(token) => Err(TooDeep { token }),
        None => Ok(nodes),
    }
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
    /// Set once nesting overflows; the parser then sees end of input.
    too_deep: Option<usize>,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&'t Token> {
        if self.too_deep.is_some() {
            return None;
        }
        self.tokens.get(self.pos)
    }

    /// Enter one nesting level, or record the overflow.
    fn descend(&mut self) -> bool {
        if self.depth >= MAX_NESTING {
            self.too_deep.get_or_insert(self.pos);
            return false;
        }
        self.depth += 1;
        true
    }

    fn peek_op(&self) -> Option<&'static str> {
        match self.peek()?.kind {
            TokenKind::Op(op) => Some(op),
            _ => None,
        }
    }

    fn starts_expression(&self) -> bool {
        let Some(token) = self.peek() else {
            return false;
        };
        match &token.kind {
            TokenKind::Str(_) | TokenKind::Number => true,
            TokenKind::Name(name) => !KEYWORDS.contains(&name.as_str()) || name == "await",
            TokenKind::Op(op) => matches!(*op, "(" | "[" | "{" | "-" | "+" | "~" | "..."),
            TokenKind::Newline => false,
        }
    }

    /// Expressions up to `close` (not consumed). The flag reports whether a
    /// comma appeared at this nesting level.
    fn sequence(&mut self, close: Option<&str>) -> (Vec<Node>, bool) {
        let mut nodes = Vec::new();
        let mut saw_comma = false;
        while let Some(token) = self.peek() {
            if let (Some(close), TokenKind::Op(op)) = (close, &token.kind)
                && *op == close
            {
                break;
            }
            if token.is_op(",") {
                saw_comma = true;
            }
            if self.starts_expression()
                && let Some(node) = self.expression(0)
            {
                nodes.push(node);
                continue;
            }
            self.pos += 1;
        }
        (nodes, saw_comma)
    }

    fn expression(&mut self, min_prec: u8) -> Option<Node> {
        let mut lhs = self.unary()?;
        // Precedence of `lhs` when it is a chain built by this loop.
        let mut chain_prec = None;
        loop {
            let Some(op) = self.peek_op() else { break };
            let Some((prec, right_assoc)) = binary_precedence(op) else {
                break;
            };
            if prec < min_prec {
                break;
            }
            let saved = self.pos;
            self.pos += 1;
            let next_min = if right_assoc { prec } else { prec + 1 };
            let Some(rhs) = self.expression(next_min) else {
                self.pos = saved;
                break;
            };
            let kind = match op {
                "+" => BinOp::Add,
                "%" => BinOp::Mod,
                _ => BinOp::Other,
            };
            let last = rhs.last;
            if chain_prec == Some(prec)
                && let NodeKind::Binary { rest, .. } = &mut lhs.kind
            {
                rest.push((kind, rhs));
                lhs.last = last;
            } else {
                lhs = Node {
                    first: lhs.first,
                    last,
                    kind: NodeKind::Binary {
                        first: Box::new(lhs),
                        rest: vec![(kind, rhs)],
                    },
                };
            }
            chain_prec = Some(prec);
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<Node> {
        if !self.descend() {
            return None;
        }
        let node = self.prefixed();
        self.depth -= 1;
        node
    }

    fn prefixed(&mut self) -> Option<Node> {
        let token = self.peek()?;
        let first = self.pos;
        match &token.kind {
            TokenKind::Op("-" | "+" | "~") => {
                self.pos += 1;
                let Some(operand) = self.unary() else {
                    self.pos = first;
                    return None;
                };
                Some(Node {
                    first,
                    last: operand.last,
                    kind: NodeKind::Unary(Box::new(operand)),
                })
            }
            TokenKind::Name(name) if name == "await" => {
                self.pos += 1;
                self.unary()
            }
            _ => {
                let primary = self.primary()?;
                Some(self.postfix(primary))
            }
        }
    }

    fn primary(&mut self) -> Option<Node> {
        let token = self.peek()?;
        let first = self.pos;
        match &token.kind {
            TokenKind::Str(_) => {
                let mut literals = Vec::new();
                while let Some(Token {
                    kind: TokenKind::Str(lit),
                    ..
                }) = self.peek()
                {
                    literals.push(lit.clone());
                    self.pos += 1;
                }
                Some(Node {
                    kind: NodeKind::Str(literals),
                    first,
                    last: self.pos - 1,
                })
            }
            TokenKind::Name(name) if !KEYWORDS.contains(&name.as_str()) => {
                self.pos += 1;
                Some(Node {
                    kind: NodeKind::Name(name.clone()),
                    first,
                    last: first,
                })
            }
            TokenKind::Number => {
                self.pos += 1;
                Some(Node {
                    kind: NodeKind::Number,
                    first,
                    last: first,
                })
            }
            TokenKind::Op("...") => {
                self.pos += 1;
                Some(Node {
                    kind: NodeKind::Name("...".into()),
                    first,
                    last: first,
                })
            }
            TokenKind::Op(open @ ("(" | "[" | "{")) => {
                let open_char = open.chars().next().unwrap_or('(');
                let close = match open_char {
                    '(' => ")",
                    '[' => "]",
                    _ => "}",
                };
                self.pos += 1;
                let (mut items, saw_comma) = self.sequence(Some(close));
                let last = self.pos.min(self.tokens.len().saturating_sub(1));
                self.pos += 1;

                let kind = if open_char == '(' && items.len() == 1 && !saw_comma {
                    NodeKind::Paren(Box::new(items.remove(0)))
                } else {
                    NodeKind::Collection {
                        open: open_char,
                        items,
                    }
                };
                Some(Node { kind, first, last })
            }
            _ => None,
        }
    }

    /// Attribute, call and subscript trailers. Each one nests the node a
    /// level deeper.
    fn postfix(&mut self, node: Node) -> Node {
        let base = self.depth;
        let node = self.trailers(node);
        self.depth = base;
        node
    }

    fn trailers(&mut self, mut node: Node) -> Node {
        loop {
            let op = self.peek_op();
            if matches!(op, Some("." | "(" | "[")) && !self.descend() {
                return node;
            }
            match op {
                Some(".") => {
                    let Some(Token {
                        kind: TokenKind::Name(attr),
                        ..
                    }) = self.tokens.get(self.pos + 1)
                    else {
                        return node;
                    };
                    self.pos += 2;
                    node = Node {
                        first: node.first,
                        last: self.pos - 1,
                        kind: NodeKind::Attribute {
                            value: Box::new(node),
                            attr: attr.clone(),
                        },
                    };
                }
                Some("(") => {
                    self.pos += 1;
                    let args = self.arguments();
                    node = Node {
                        first: node.first,
                        last: self.pos.saturating_sub(1),
                        kind: NodeKind::Call {
                            func: Box::new(node),
                            args,
                        },
                    };
                }
                Some("[") => {
                    self.pos += 1;
                    let (index, _) = self.sequence(Some("]"));
                    let last = self.pos.min(self.tokens.len().saturating_sub(1));
                    self.pos += 1;
                    node = Node {
                        first: node.first,
                        last,
                        kind: NodeKind::Subscript {
                            value: Box::new(node),
                            index,
                        },
                    };
                }
                _ => return node,
            }
        }
    }

    /// Call arguments after the opening parenthesis, consuming the closing one.
    fn arguments(&mut self) -> Vec<Arg> {
        let mut args = Vec::new();
        let mut current: Option<Arg> = None;
        let mut pending = ArgKind::Positional;

        while let Some(token) = self.peek() {
            if token.is_op(")") {
                self.pos += 1;
                break;
            }
            if token.is_op(",") {
                self.pos += 1;
                args.extend(current.take());
                pending = ArgKind::Positional;
                continue;
            }

            if current.is_none() {
                match &token.kind {
                    TokenKind::Op("*") => {
                        pending = ArgKind::Star;
                        self.pos += 1;
                        continue;
                    }
                    TokenKind::Op("**") => {
                        pending = ArgKind::DoubleStar;
                        self.pos += 1;
                        continue;
                    }
                    TokenKind::Name(name)
                        if self.tokens.get(self.pos + 1).is_some_and(|t| t.is_op("=")) =>
                    {
                        pending = ArgKind::Keyword(name.clone());
                        self.pos += 2;
                        continue;
                    }
                    _ => {}
                }
            }

            if self.starts_expression()
                && let Some(value) = self.expression(0)
            {
                match current.as_mut() {
                    Some(arg) => arg.extra.push(value),
                    None => {
                        current = Some(Arg {
                            kind: std::mem::replace(&mut pending, ArgKind::Positional),
                            value,
                            extra: Vec::new(),
                        })
                    }
                }
                continue;
            }
            self.pos += 1;
        }

        args.extend(current);
        args
    }
}

fn binary_precedence(op: &str) -> Option<(u8, bool)> {
    let prec = match op {
        "|" => (1, false),
        "^" => (2, false),
        "&" => (3, false),
        "<<" | ">>" => (4, false),
        "+" | "-" => (5, false),
        "*" | "/" | "//" | "%" | "@" => (6, false),
        "**" => (8, true),
        _ => return None,
    };
    Some(prec)
}
