//! Rust candidate extraction using syn.
//!
//! Recognized string-producing expressions:
//! - string and byte-string literals (raw or not)
//! - `concat!`
//! - `+` chains with at least one string operand
//! - `format!` and friends, including inline captures
//! - pass-through conversions: `String::from`, `.to_string()`, `&`, parens

mod format;

use proc_macro2::{Delimiter, Span, TokenStream, TokenTree};
use quote::ToTokens;
use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::visit::{self, Visit};
use syn::{BinOp, Expr, Lit, Macro, Token};

use super::{ExtractOptions, Extractor, Language, SourceFile};
use crate::candidate::{CandidateBuilder, CandidateString, OriginKind, SourceLocation};
use crate::error::{SiftError, SiftResult};
use crate::placeholder::PlaceholderKind;
use format::{ArgRef, FormatPart};

/// Macros whose first argument (after the writer, for `write!`) is a
/// format string.
const FORMAT_MACROS: &[&str] = &[
    "format",
    "format_args",
    "print",
    "println",
    "eprint",
    "eprintln",
    "panic",
    "write",
    "writeln",
];

/// Deepest bracket nesting accepted before handing a file to syn.
const MAX_NESTING: usize = 128;

/// Most binary operators or `.` trailers accepted in one run between `,`,
/// `;` and blocks.
const MAX_OPERATOR_RUN: usize = 1024;

/// Zero-argument methods that return their receiver's text unchanged.
const PASSTHROUGH_METHODS: &[&str] = &["to_string", "to_owned", "into", "as_str", "as_ref"];

pub struct RustExtractor {
    options: ExtractOptions,
}

impl RustExtractor {
    pub fn new(options: ExtractOptions) -> Self {
        Self { options }
    }
}

impl Extractor for RustExtractor {
    fn language(&self) -> Language {
        Language::Rust
    }

    fn extract(&self, file: &SourceFile) -> SiftResult<Vec<CandidateString>> {
        check_shape(&file.text)?;
        let syntax = syn::parse_file(&file.text).map_err(|e| {
            let start = e.span().start();
            SiftError::parse(start.line, start.column + 1, e.to_string())
        })?;

        let mut visitor = CandidateVisitor {
            file,
            options: &self.options,
            sink_depth: 0,
            matches: Vec::new(),
            error: None,
        };
        visitor.visit_file(&syntax);
        if let Some(err) = visitor.error {
            return Err(err);
        }
        tracing::trace!(
            file = %file.path.display(),
            candidates = visitor.matches.len(),
            "rust extraction done"
        );
        Ok(visitor.matches)
    }
}

/// Refuse token trees too deep or operator runs too long for syn's
/// recursive parser and visitor. Lexing failures are left to syn.
fn check_shape(text: &str) -> SiftResult<()> {
    let Ok(tokens) = text.parse::<TokenStream>() else {
        return Ok(());
    };
    let refuse = |span: Span, message: String| {
        let start = span.start();
        SiftError::parse(start.line, start.column + 1, message)
    };

    let mut stack = vec![tokens.into_iter()];
    let mut runs = vec![0usize];
    while let Some(level) = stack.last_mut() {
        match level.next() {
            None => {
                stack.pop();
                runs.pop();
            }
            Some(TokenTree::Group(group)) => {
                if stack.len() > MAX_NESTING {
                    return Err(refuse(
                        group.span(),
                        format!("brackets nested deeper than {MAX_NESTING}"),
                    ));
                }
                // A block ends the expression around it.
                if group.delimiter() == Delimiter::Brace
                    && let Some(run) = runs.last_mut()
                {
                    *run = 0;
                }
                stack.push(group.stream().into_iter());
                runs.push(0);
            }
            Some(TokenTree::Punct(punct)) => {
                let Some(run) = runs.last_mut() else { continue };
                match punct.as_char() {
                    ',' | ';' => *run = 0,
                    '+' | '-' | '*' | '/' | '%' | '&' | '|' | '^' | '.' => {
                        *run += 1;
                        if *run > MAX_OPERATOR_RUN {
                            return Err(refuse(
                                punct.span(),
                                format!("more than {MAX_OPERATOR_RUN} chained operators"),
                            ));
                        }
                    }
                    _ => {}
                }
            }
            Some(_) => {}
        }
    }
    Ok(())
}

#[derive(Debug, Clone)]
enum Part {
    Text(String),
    Hole {
        kind: PlaceholderKind,
        expression: Option<String>,
    },
}

/// A string-valued expression, flattened. Sub-expressions that are not
/// strings are kept for a later walk.
struct StrValue {
    parts: Vec<Part>,
    origin: OriginKind,
    opaque: Vec<Expr>,
}

impl StrValue {
    fn new(origin: OriginKind) -> Self {
        Self {
            parts: Vec::new(),
            origin,
            opaque: Vec::new(),
        }
    }

    fn text(origin: OriginKind, text: String) -> Self {
        Self {
            parts: vec![Part::Text(text)],
            origin,
            opaque: Vec::new(),
        }
    }

    fn absorb(&mut self, other: StrValue) {
        self.parts.extend(other.parts);
        self.origin = self.origin.merge(other.origin);
        self.opaque.extend(other.opaque);
    }
}

/// Visitor that collects candidate strings.
struct CandidateVisitor<'a> {
    file: &'a SourceFile,
    options: &'a ExtractOptions,
    sink_depth: usize,
    matches: Vec<CandidateString>,
    /// First hard error; the walk stops once set.
    error: Option<SiftError>,
}

impl CandidateVisitor<'_> {
    /// Walk an operator tree that is not a string with an explicit stack.
    fn visit_operands(&mut self, expr: &Expr) {
        let mut stack = vec![expr];
        while let Some(expr) = stack.pop() {
            match expr {
                Expr::Binary(bin) if string_value(expr).is_none() => {
                    stack.push(&bin.right);
                    stack.push(&bin.left);
                }
                _ => self.visit_expr(expr),
            }
        }
    }

    fn emit(&mut self, span: Span, value: StrValue) -> SiftResult<()> {
        if self.options.filters_sinks() && self.sink_depth == 0 {
            return Ok(());
        }
        let start = span.start();
        let end = span.end();
        let mut builder = CandidateBuilder::new(value.origin, start.line, start.column + 1);
        for part in value.parts {
            match part {
                Part::Text(text) => {
                    builder.text(&text);
                }
                Part::Hole { kind, expression } => {
                    builder.placeholder(kind, expression)?;
                }
            }
        }
        let location = SourceLocation::new(
            &self.file.path,
            (start.line, start.column + 1),
            (end.line, end.column + 1),
        );
        self.matches.push(builder.finish(location)?);
        Ok(())
    }

    fn emit_and_descend(&mut self, span: Span, mut value: StrValue) {
        let opaque = std::mem::take(&mut value.opaque);
        if let Err(err) = self.emit(span, value) {
            self.error = Some(err);
            return;
        }
        for expr in &opaque {
            self.visit_expr(expr);
        }
    }

    fn with_sink<F: FnOnce(&mut Self)>(&mut self, sink: bool, f: F) {
        if sink {
            self.sink_depth += 1;
        }
        f(self);
        if sink {
            self.sink_depth -= 1;
        }
    }
}

impl<'ast> Visit<'ast> for CandidateVisitor<'_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if self.error.is_some() {
            return;
        }
        if let Some(value) = string_value(expr) {
            self.emit_and_descend(expr.span(), value);
            return;
        }

        match expr {
            Expr::Call(call) => {
                self.visit_expr(&call.func);
                let sink = match &*call.func {
                    Expr::Path(path) => self.options.is_sink(&path_to_string(&path.path)),
                    _ => false,
                };
                self.with_sink(sink, |v| {
                    for arg in &call.args {
                        v.visit_expr(arg);
                    }
                });
            }
            Expr::MethodCall(method) => {
                self.visit_expr(&method.receiver);
                let sink = self.options.is_sink(&method.method.to_string());
                self.with_sink(sink, |v| {
                    for arg in &method.args {
                        v.visit_expr(arg);
                    }
                });
            }
            Expr::Binary(_) => self.visit_operands(expr),
            _ => visit::visit_expr(self, expr),
        }
    }

    fn visit_macro(&mut self, mac: &'ast Macro) {
        if self.error.is_some() {
            return;
        }
        if let Some(value) = macro_value(mac) {
            self.emit_and_descend(mac.span(), value);
            return;
        }
        // Unknown macros: walk the body when it reads as an argument list.
        let sink = self.options.is_sink(&path_to_string(&mac.path));
        if let Ok(args) = mac.parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
            self.with_sink(sink, |v| {
                for arg in &args {
                    v.visit_expr(arg);
                }
            });
        }
    }
}

/// Convert syn path to string
fn path_to_string(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|seg| seg.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

/// Source text of an expression, whitespace collapsed.
fn expr_to_source(expr: &Expr) -> String {
    let expr = strip_wrappers(expr);
    let text = expr
        .span()
        .source_text()
        .unwrap_or_else(|| expr.to_token_stream().to_string());
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_wrappers(expr: &Expr) -> &Expr {
    match expr {
        Expr::Reference(r) => strip_wrappers(&r.expr),
        Expr::Paren(p) => strip_wrappers(&p.expr),
        Expr::Group(g) => strip_wrappers(&g.expr),
        _ => expr,
    }
}

fn hole(expr: &Expr, value: &mut StrValue) {
    value.parts.push(Part::Hole {
        kind: PlaceholderKind::Unknown,
        expression: Some(expr_to_source(expr)),
    });
    value.opaque.push(expr.clone());
}

fn string_value(expr: &Expr) -> Option<StrValue> {
    match expr {
        Expr::Lit(lit) => lit_value(&lit.lit),
        Expr::Paren(p) => string_value(&p.expr),
        Expr::Group(g) => string_value(&g.expr),
        Expr::Reference(r) => string_value(&r.expr),
        Expr::Binary(bin) if matches!(bin.op, BinOp::Add(_)) => concatenation(expr),
        Expr::MethodCall(method)
            if method.args.is_empty()
                && PASSTHROUGH_METHODS.contains(&method.method.to_string().as_str()) =>
        {
            string_value(&method.receiver)
        }
        Expr::Call(call) if call.args.len() == 1 => {
            let Expr::Path(path) = &*call.func else {
                return None;
            };
            let name = path_to_string(&path.path);
            if name.ends_with("String::from") || name.ends_with("Cow::from") || name == "Cow::Borrowed"
            {
                call.args.first().and_then(string_value)
            } else {
                None
            }
        }
        Expr::Macro(m) => macro_value(&m.mac),
        _ => None,
    }
}

fn lit_value(lit: &Lit) -> Option<StrValue> {
    match lit {
        Lit::Str(s) => Some(StrValue::text(OriginKind::Literal, s.value())),
        Lit::ByteStr(b) => Some(StrValue::text(
            OriginKind::Literal,
            String::from_utf8_lossy(&b.value()).into_owned(),
        )),
        _ => None,
    }
}

fn flatten_add<'e>(expr: &'e Expr, out: &mut Vec<&'e Expr>) {
    let mut stack = vec![expr];
    while let Some(expr) = stack.pop() {
        match expr {
            Expr::Binary(bin) if matches!(bin.op, BinOp::Add(_)) => {
                stack.push(&bin.right);
                stack.push(&bin.left);
            }
            _ => out.push(expr),
        }
    }
}

fn concatenation(expr: &Expr) -> Option<StrValue> {
    let mut operands = Vec::new();
    flatten_add(expr, &mut operands);
    let values: Vec<Option<StrValue>> = operands.iter().copied().map(string_value).collect();
    if values.iter().all(Option::is_none) {
        return None;
    }

    let mut out = StrValue::new(OriginKind::Concatenation);
    for (operand, value) in operands.into_iter().zip(values) {
        match value {
            Some(value) => out.absorb(value),
            None => hole(operand, &mut out),
        }
    }
    Some(out)
}

fn macro_name(mac: &Macro) -> String {
    mac.path
        .segments
        .last()
        .map(|seg| seg.ident.to_string())
        .unwrap_or_default()
}

fn macro_value(mac: &Macro) -> Option<StrValue> {
    let name = macro_name(mac);
    if name == "concat" {
        return concat_value(mac);
    }
    if !FORMAT_MACROS.contains(&name.as_str()) {
        return None;
    }

    let args = mac
        .parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated)
        .ok()?;
    let mut args = args.into_iter();
    if name == "write" || name == "writeln" {
        args.next()?;
    }
    let template = match args.next()? {
        Expr::Lit(syn::ExprLit {
            lit: Lit::Str(s), ..
        }) => s.value(),
        _ => return None,
    };
    Some(format_value(&template, args.collect()))
}

fn concat_value(mac: &Macro) -> Option<StrValue> {
    let args = mac
        .parse_body_with(Punctuated::<Expr, Token![,]>::parse_terminated)
        .ok()?;
    let mut out = StrValue::new(OriginKind::Concatenation);
    for arg in &args {
        match arg {
            Expr::Lit(lit) => match &lit.lit {
                Lit::Str(s) => out.parts.push(Part::Text(s.value())),
                Lit::Char(c) => out.parts.push(Part::Text(c.value().to_string())),
                Lit::Int(i) => out.parts.push(Part::Text(i.base10_digits().to_string())),
                Lit::Float(f) => out.parts.push(Part::Text(f.base10_digits().to_string())),
                Lit::Bool(b) => out.parts.push(Part::Text(b.value.to_string())),
                _ => hole(arg, &mut out),
            },
            other => match string_value(other) {
                Some(value) => out.absorb(value),
                None => hole(other, &mut out),
            },
        }
    }
    Some(out)
}

fn format_value(template: &str, args: Vec<Expr>) -> StrValue {
    let mut positional = Vec::new();
    let mut named: Vec<(String, Expr)> = Vec::new();
    for arg in args {
        match arg {
            Expr::Assign(assign) => match &*assign.left {
                Expr::Path(p) if p.path.get_ident().is_some() => {
                    named.push((path_to_string(&p.path), (*assign.right).clone()));
                }
                _ => positional.push(Expr::Assign(assign)),
            },
            other => positional.push(other),
        }
    }

    let mut out = StrValue::new(OriginKind::FormattedTemplate);
    let Some(parts) = format::split_format_string(template) else {
        out.parts.push(Part::Text(template.to_string()));
        out.origin = OriginKind::UnknownDynamic;
        return out;
    };

    let mut next = 0;
    let mut aligned = true;
    for part in parts {
        match part {
            FormatPart::Text(text) => out.parts.push(Part::Text(text)),
            FormatPart::Field {
                arg,
                kind,
                star_precision,
            } => {
                if star_precision {
                    next += 1;
                }
                let expression = match arg {
                    ArgRef::Next => {
                        let e = positional.get(next).map(expr_to_source);
                        next += 1;
                        e
                    }
                    ArgRef::Index(i) => positional.get(i).map(expr_to_source),
                    ArgRef::Named(name) => Some(
                        named
                            .iter()
                            .find(|(n, _)| *n == name)
                            .map(|(_, e)| expr_to_source(e))
                            .unwrap_or(name),
                    ),
                };
                if expression.is_none() {
                    aligned = false;
                }
                out.parts.push(Part::Hole { kind, expression });
            }
        }
    }
    if !aligned {
        out.origin = OriginKind::UnknownDynamic;
    }
    out.opaque.extend(positional);
    out.opaque.extend(named.into_iter().map(|(_, e)| e));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::Segment;

    fn extract_with(code: &str, options: ExtractOptions) -> Vec<CandidateString> {
        let file = SourceFile::new("src/db.rs", Language::Rust, code);
        RustExtractor::new(options).extract(&file).unwrap()
    }

    fn extract(code: &str) -> Vec<CandidateString> {
        extract_with(code, ExtractOptions::default())
    }

    #[test]
    fn test_detect_literal() {
        let code = r#"
fn users() -> &'static str {
    "SELECT * FROM users"
}
"#;
        let out = extract(code);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].canonical(), "SELECT * FROM users");
        assert_eq!(out[0].origin(), OriginKind::Literal);
        assert_eq!(out[0].location().line, 3);
        assert_eq!(out[0].location().column, 5);
    }

    #[test]
    fn test_raw_string() {
        let out = extract(r###"const Q: &str = r#"SELECT "id" FROM t"#;"###);
        assert_eq!(out[0].canonical(), r#"SELECT "id" FROM t"#);
    }

    #[test]
    fn test_concatenation() {
        let code = r#"
fn q(id: &str) -> String {
    "SELECT * FROM users WHERE id = ".to_string() + id
}
"#;
        let out = extract(code);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].canonical(), "SELECT * FROM users WHERE id = $01");
        assert_eq!(out[0].origin(), OriginKind::Concatenation);
        assert_eq!(out[0].display(), "SELECT * FROM users WHERE id = {id}");
    }

    #[test]
    fn test_format_macro() {
        let code = r#"
fn q(table: &str, id: i64) -> String {
    format!("SELECT * FROM {} WHERE id = {id} AND org = {org}", table, org = self.org)
}
"#;
        let out = extract(code);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].canonical(), "SELECT * FROM $01 WHERE id = $02 AND org = $03");
        assert_eq!(out[0].origin(), OriginKind::FormattedTemplate);
        assert_eq!(
            out[0].display(),
            "SELECT * FROM {table} WHERE id = {id} AND org = {self.org}"
        );
        let kinds: Vec<PlaceholderKind> = out[0]
            .segments()
            .iter()
            .filter_map(|s| match s {
                Segment::Placeholder(p) => Some(p.kind),
                Segment::Text(_) => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                PlaceholderKind::Identifier,
                PlaceholderKind::Literal,
                PlaceholderKind::Literal
            ]
        );
    }

    #[test]
    fn test_format_missing_argument_is_unknown_dynamic() {
        let code = r#"fn f() { let s = format!("SELECT {} FROM {}", a); }"#;
        let out = extract(code);
        assert_eq!(out[0].canonical(), "SELECT $01 FROM $02");
        assert_eq!(out[0].origin(), OriginKind::UnknownDynamic);
    }

    #[test]
    fn test_write_skips_destination() {
        let code = r#"fn f(w: &mut String) { write!(w, "DELETE FROM {}", t).unwrap(); }"#;
        let out = extract(code);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].canonical(), "DELETE FROM $01");
    }

    #[test]
    fn test_concat_macro() {
        let out = extract(r#"const Q: &str = concat!("SELECT ", 1, " FROM t");"#);
        assert_eq!(out[0].canonical(), "SELECT 1 FROM t");
        assert_eq!(out[0].origin(), OriginKind::Concatenation);
    }

    #[test]
    fn test_dollar_params_are_escaped() {
        let out = extract(r#"const Q: &str = "SELECT * FROM t WHERE id = $1";"#);
        assert_eq!(out[0].canonical(), "SELECT * FROM t WHERE id = $$1");
    }

    #[test]
    fn test_sink_filter() {
        let code = r#"
async fn run(pool: &PgPool) {
    log::info!("starting");
    let rows = sqlx::query("SELECT * FROM users").fetch_all(pool).await;
    conn.execute(&format!("DELETE FROM {}", t)).await;
}
"#;
        let out = extract_with(code, ExtractOptions::with_sinks(["query", "execute"]));
        let texts: Vec<&str> = out.iter().map(|c| c.canonical()).collect();
        assert_eq!(texts, vec!["SELECT * FROM users", "DELETE FROM $01"]);
    }

    #[test]
    fn test_strings_inside_unknown_macros() {
        let code = r#"fn f() { assert_eq!(q, "SELECT 1"); }"#;
        let out = extract(code);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].canonical(), "SELECT 1");
    }

    #[test]
    fn test_nested_strings_in_operands() {
        let code = r#"fn f() { let s = String::from("SELECT ") + &quote("x"); }"#;
        let texts: Vec<String> = extract(code)
            .iter()
            .map(|c| c.canonical().to_string())
            .collect();
        assert_eq!(texts, vec!["SELECT $01", "x"]);
    }

    #[test]
    fn test_parse_error() {
        let file = SourceFile::new("bad.rs", Language::Rust, "fn f( {");
        let err = RustExtractor::new(ExtractOptions::default())
            .extract(&file)
            .unwrap_err();
        assert!(matches!(err, SiftError::SourceParse { .. }));
    }

    #[test]
    fn test_placeholder_overflow() {
        let mut code = String::from("fn f() { let s = format!(\"SELECT ");
        for _ in 0..100 {
            code.push_str("{}, ");
        }
        code.push_str("\"); }");
        let file = SourceFile::new("big.rs", Language::Rust, code);
        let err = RustExtractor::new(ExtractOptions::default())
            .extract(&file)
            .unwrap_err();
        assert!(matches!(err, SiftError::PlaceholderOverflow { .. }));
    }

    fn extract_on_small_stack(code: String) -> SiftResult<Vec<CandidateString>> {
        std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || {
                let file = SourceFile::new("deep.rs", Language::Rust, code);
                RustExtractor::new(ExtractOptions::default()).extract(&file)
            })
            .unwrap()
            .join()
            .unwrap()
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let code = format!(
            "fn f() {{ let q = {}\"x\"{}; }}",
            "(".repeat(10_000),
            ")".repeat(10_000)
        );
        let err = extract_on_small_stack(code).unwrap_err();
        assert!(matches!(err, SiftError::SourceParse { line: 1, .. }), "{err}");
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_operator_runs() {
        let long = format!("fn f() {{ let n = a{}; }}", " + a".repeat(100_000));
        let err = extract_on_small_stack(long).unwrap_err();
        assert!(err.to_string().contains("chained operators"), "{err}");

        let fits = format!("fn f() {{ let n = a{}; let q = \"DELETE FROM t\"; }}", " + a".repeat(1000));
        let out = extract_on_small_stack(fits).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].canonical(), "DELETE FROM t");
    }

    #[test]
    fn test_many_items_do_not_form_a_run() {
        let code: String = (0..1500).map(|i| format!("fn f{i}() -> u8 {{ 1 }}\n")).collect();
        assert!(extract_on_small_stack(code).unwrap().is_empty());
    }

    #[test]
    fn test_mixed_operators_keep_inner_concatenation() {
        let code = r#"fn f() { let n = "a".to_string() + &b - c; }"#;
        let texts: Vec<String> = extract(code)
            .iter()
            .map(|c| c.canonical().to_string())
            .collect();
        assert_eq!(texts, vec!["a$01"]);
    }
}
