//! Python candidate extraction.
//!
//! Recognized string-producing expressions:
//! - literals, including implicit concatenation of adjacent literals
//! - `+` chains with at least one string operand
//! - f-strings
//! - `template % args`
//! - `template.format(...)`
//!
//! Anything else inside those expressions becomes a placeholder, and is then
//! walked on its own so nested strings are still found.

mod lexer;
mod syntax;
mod templates;

use std::collections::HashMap;

use super::{ExtractOptions, Extractor, Language, SourceFile};
use crate::candidate::{CandidateBuilder, CandidateString, OriginKind, SourceLocation};
use crate::error::{SiftError, SiftResult};
use crate::placeholder::PlaceholderKind;
use lexer::{LineIndex, StrLit, Token};
use syntax::{Arg, ArgKind, BinOp, Node, NodeKind};
use templates::{FieldKey, TemplatePart};

pub struct PythonExtractor {
    options: ExtractOptions,
}

impl PythonExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }
}

impl Extractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&self, file: &SourceFile) -> SiftResult<Vec<CandidateString>> {
        let tokens = lexer::tokenize(&file.text)?;
        let lines = LineIndex::new(&file.text);
        let module = syntax::parse_module(&tokens).map_err(|err| {
            let offset = tokens.get(err.token).map_or(file.text.len(), |t| t.start);
            let (line, column) = lines.position(&file.text, offset);
            SiftError::parse(
                line,
                column,
                format!("expression nested deeper than {}", syntax::MAX_NESTING),
            )
        })?;

        let mut walker = Walker {
            file,
            tokens: &tokens,
            lines,
            options: &self.options,
            sink_depth: 0,
            out: Vec::new(),
        };
        for node in &module {
            walker.visit(node)?;
        }
        tracing::trace!(
            file = %file.path.display(),
            candidates = walker.out.len(),
            "python extraction done"
        );
        Ok(walker.out)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Text(String),
    Hole {
        kind: PlaceholderKind,
        expression: Option<String>,
    },
}

/// A string-valued expression, flattened.
struct StrValue<'n> {
    parts: Vec<Part>,
    origin: OriginKind,
    /// Non-string sub-expressions that still need walking.
    opaque: Vec<&'n Node>,
}

impl<'n> StrValue<'n> {
    fn absorb(&mut self, other: StrValue<'n>) {
        self.parts.extend(other.parts);
        self.origin = self.origin.merge(other.origin);
        self.opaque.extend(other.opaque);
    }
}

struct Walker<'a> {
    file: &'a SourceFile,
    tokens: &'a [Token],
    lines: LineIndex,
    options: &'a ExtractOptions,
    sink_depth: usize,
    out: Vec<CandidateString>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: &Node) -> SiftResult<()> {
        if let Some(value) = self.string_value(node) {
            self.emit(node, value.parts, value.origin)?;
            for child in value.opaque {
                self.visit(child)?;
            }
            return Ok(());
        }

        match &node.kind {
            NodeKind::Binary { first, rest } => {
                self.visit(first)?;
                for (_, operand) in rest {
                    self.visit(operand)?;
                }
            }
            NodeKind::Unary(inner) | NodeKind::Paren(inner) => self.visit(inner)?,
            NodeKind::Attribute { value, .. } => self.visit(value)?,
            NodeKind::Subscript { value, index } => {
                self.visit(value)?;
                for item in index {
                    self.visit(item)?;
                }
            }
            NodeKind::Collection { items, .. } => {
                for item in items {
                    self.visit(item)?;
                }
            }
            NodeKind::Call { func, args } => {
                self.visit(func)?;
                let sink = func
                    .dotted_name()
                    .is_some_and(|name| self.options.is_sink(&name));
                if sink {
                    self.sink_depth += 1;
                }
                let result = args.iter().try_for_each(|arg| self.visit_arg(arg));
                if sink {
                    self.sink_depth -= 1;
                }
                result?;
            }
            NodeKind::Str(_) | NodeKind::Name(_) | NodeKind::Number => {}
        }
        Ok(())
    }

    fn visit_arg(&mut self, arg: &Arg) -> SiftResult<()> {
        self.visit(&arg.value)?;
        for extra in &arg.extra {
            self.visit(extra)?;
        }
        Ok(())
    }

    fn emit(&mut self, node: &Node, parts: Vec<Part>, origin: OriginKind) -> SiftResult<()> {
        if self.options.filters_sinks() && self.sink_depth == 0 {
            return Ok(());
        }
        let start = self.position(self.tokens[node.first].start);
        let end = self.position(self.tokens[node.last].end);

        let mut builder = CandidateBuilder::new(origin, start.0, start.1);
        for part in parts {
            match part {
                Part::Text(text) => {
                    builder.text(&text);
                }
                Part::Hole { kind, expression } => {
                    builder.placeholder(kind, expression)?;
                }
            }
        }
        let location = SourceLocation::new(&self.file.path, start, end);
        self.out.push(builder.finish(location)?);
        Ok(())
    }

    fn position(&self, offset: usize) -> (usize, usize) {
        self.lines.position(&self.file.text, offset)
    }

    /// Source text of a node with whitespace runs collapsed.
    fn source_text(&self, node: &Node) -> String {
        let start = self.tokens[node.first].start;
        let end = self.tokens[node.last].end;
        self.file
            .text
            .get(start..end)
            .unwrap_or_default()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn string_value<'n>(&self, node: &'n Node) -> Option<StrValue<'n>> {
        match &node.kind {
            NodeKind::Str(literals) => Some(literal_value(literals)),
            NodeKind::Paren(inner) => self.string_value(inner),
            NodeKind::Binary { first, rest } => {
                if rest.iter().all(|(op, _)| *op == BinOp::Add) {
                    self.concatenation(first, rest)
                } else if rest.iter().all(|(op, _)| *op == BinOp::Mod) {
                    let mut value = self.string_value(first)?;
                    for (_, rhs) in rest {
                        value = self.percent_format(value, rhs);
                    }
                    Some(value)
                } else {
                    None
                }
            }
            NodeKind::Call { func, args } => match &func.kind {
                NodeKind::Attribute { value, attr } if attr == "format" => {
                    let template = self.string_value(value)?;
                    Some(self.method_format(template, args))
                }
                _ => None,
            },
            _ => None,
        }
    }

    fn concatenation<'n>(
        &self,
        first: &'n Node,
        rest: &'n [(BinOp, Node)],
    ) -> Option<StrValue<'n>> {
        let operands: Vec<&Node> = std::iter::once(first)
            .chain(rest.iter().map(|(_, operand)| operand))
            .collect();

        let values: Vec<Option<StrValue<'n>>> =
            operands.iter().map(|&op| self.string_value(op)).collect();
        if values.iter().all(Option::is_none) {
            return None;
        }

        let mut out = StrValue {
            parts: Vec::new(),
            origin: OriginKind::Concatenation,
            opaque: Vec::new(),
        };
        for (operand, value) in operands.into_iter().zip(values) {
            match value {
                Some(value) => out.absorb(value),
                None => {
                    out.parts.push(Part::Hole {
                        kind: PlaceholderKind::Unknown,
                        expression: Some(self.source_text(operand)),
                    });
                    out.opaque.push(operand);
                }
            }
        }
        Some(out)
    }

    /// `template % rhs`: a tuple supplies positional values, a dict literal
    /// supplies named ones, anything else is a single value.
    fn percent_format<'n>(&self, template: StrValue<'n>, rhs: &'n Node) -> StrValue<'n> {
        let (positional, named): (Vec<&Node>, HashMap<String, &Node>) = match &rhs.kind {
            NodeKind::Collection { open: '(', items } => (items.iter().collect(), HashMap::new()),
            NodeKind::Collection { open: '{', items } => (Vec::new(), dict_literal_keys(items)),
            _ => (vec![rhs], HashMap::new()),
        };
        let tuple_rhs = matches!(rhs.kind, NodeKind::Collection { open: '(', .. });
        let dict_rhs = matches!(rhs.kind, NodeKind::Collection { open: '{', .. });

        let mut out = StrValue {
            parts: Vec::new(),
            origin: template.origin.merge(OriginKind::FormattedTemplate),
            opaque: template.opaque,
        };
        let mut next = 0;
        let mut aligned = true;

        for part in template.parts {
            let Part::Text(text) = part else {
                out.parts.push(part);
                continue;
            };
            for piece in templates::split_percent_template(&text) {
                match piece {
                    TemplatePart::Text(t) => out.parts.push(Part::Text(t)),
                    TemplatePart::Field(field) => {
                        let arg = match &field.key {
                            FieldKey::Name(name) => {
                                if !dict_rhs {
                                    aligned = false;
                                }
                                named.get(name).copied()
                            }
                            _ => {
                                let arg = positional.get(next).copied();
                                next += 1;
                                arg
                            }
                        };
                        if arg.is_none() {
                            aligned = false;
                        }
                        out.parts.push(Part::Hole {
                            kind: field.kind,
                            expression: arg.map(|a| self.source_text(a)),
                        });
                    }
                }
            }
        }
        if tuple_rhs && next != positional.len() {
            aligned = false;
        }
        if !aligned {
            out.origin = out.origin.merge(OriginKind::UnknownDynamic);
        }
        out.opaque.push(rhs);
        out
    }

    fn method_format<'n>(&self, template: StrValue<'n>, args: &'n [Arg]) -> StrValue<'n> {
        let mut positional = Vec::new();
        let mut named = HashMap::new();
        let mut unpacked = false;
        for arg in args {
            match &arg.kind {
                ArgKind::Positional => positional.push(&arg.value),
                ArgKind::Keyword(name) => {
                    named.insert(name.as_str(), &arg.value);
                }
                ArgKind::Star | ArgKind::DoubleStar => unpacked = true,
            }
        }

        let mut out = StrValue {
            parts: Vec::new(),
            origin: template.origin.merge(OriginKind::FormattedTemplate),
            opaque: template.opaque,
        };
        let mut next = 0;
        let mut aligned = !unpacked;

        for part in template.parts {
            let Part::Text(text) = part else {
                out.parts.push(part);
                continue;
            };
            let Some(pieces) = templates::split_brace_template(&text) else {
                aligned = false;
                out.parts.push(Part::Text(text));
                continue;
            };
            for piece in pieces {
                match piece {
                    TemplatePart::Text(t) => out.parts.push(Part::Text(t)),
                    TemplatePart::Field(field) => {
                        let arg = match &field.key {
                            FieldKey::Auto => {
                                let arg = positional.get(next).copied();
                                next += 1;
                                arg
                            }
                            FieldKey::Index(i) => positional.get(*i).copied(),
                            FieldKey::Name(name) => named.get(name.as_str()).copied(),
                            FieldKey::Inline(_) => None,
                        };
                        if arg.is_none() {
                            aligned = false;
                        }
                        out.parts.push(Part::Hole {
                            kind: field.kind,
                            expression: arg.map(|a| self.source_text(a)),
                        });
                    }
                }
            }
        }
        if !aligned {
            out.origin = out.origin.merge(OriginKind::UnknownDynamic);
        }
        for arg in args {
            out.opaque.push(&arg.value);
            out.opaque.extend(arg.extra.iter());
        }
        out
    }
}

fn literal_value<'n>(literals: &[StrLit]) -> StrValue<'n> {
    let mut value = StrValue {
        parts: Vec::new(),
        origin: OriginKind::Literal,
        opaque: Vec::new(),
    };
    for lit in literals {
        if !lit.format {
            value.parts.push(Part::Text(lit.value()));
            continue;
        }
        match templates::split_fstring(&lit.body, lit.raw) {
            Some(pieces) => {
                if templates::has_fields(&pieces) {
                    value.origin = value.origin.merge(OriginKind::FormattedTemplate);
                }
                for piece in pieces {
                    value.parts.push(match piece {
                        TemplatePart::Text(t) => Part::Text(t),
                        TemplatePart::Field(field) => Part::Hole {
                            kind: field.kind,
                            expression: match field.key {
                                FieldKey::Inline(expr) => Some(expr),
                                _ => None,
                            },
                        },
                    });
                }
            }
            None => value.parts.push(Part::Text(lit.value())),
        }
    }
    value
}

/// Keys of a dict display whose keys are plain string literals.
///
/// The parser flattens `{k: v, ...}` into `[k, v, ...]`.
fn dict_literal_keys(items: &[Node]) -> HashMap<String, &Node> {
    let mut keys = HashMap::new();
    for pair in items.chunks(2) {
        if let [key, value] = pair
            && let NodeKind::Str(lits) = &key.kind
            && lits.iter().all(|l| !l.format)
        {
            let text: String = lits.iter().map(StrLit::value).collect();
            keys.insert(text, value);
        }
    }
    keys
}
