//! End-to-end scenarios: source text in, verdicts out.

use pretty_assertions::assert_eq;
use sqlsift_core::placeholder::{self, Piece};
use sqlsift_core::prelude::*;

fn validator() -> Validator {
    Validator::new(ValidatorConfig::default()).unwrap()
}

fn analyze(path: &str, language: Language, text: &str) -> FileReport {
    let file = SourceFile::new(path, language, text);
    let extractor = extractor_for(language, ExtractOptions::default());
    analyze_file(&file, extractor.as_ref(), &validator(), &CancelToken::new())
}

#[test]
fn test_dollar_text_round_trips() {
    for text in ["$", "$$", "cost: $5.00", "$01", "a$$$b", "€$ü"] {
        let canonical = placeholder::escape(text);
        assert_eq!(
            placeholder::decode(&canonical).unwrap(),
            vec![Piece::Text(text.to_string())]
        );
    }
}

#[test]
fn test_concatenated_user_id_is_select() {
    let report = analyze(
        "app.py",
        Language::Python,
        "query = \"SELECT * FROM users WHERE id = \" + userId\n",
    );
    assert_eq!(report.records.len(), 1);
    let record = &report.records[0];
    assert_eq!(record.canonical, "SELECT * FROM users WHERE id = $01");
    assert_eq!(
        record.verdict,
        Verdict::Accepted {
            kind: StatementKind::Select
        }
    );
}

#[test]
fn test_greeting_is_not_sql() {
    let report = analyze("app.py", Language::Python, "print(\"Hello, world!\")\n");
    assert_eq!(report.records[0].canonical, "Hello, world!");
    assert_eq!(
        report.records[0].verdict.failure_reason(),
        Some(FailureReason::NoMatch)
    );
}

#[test]
fn test_ui_labels_are_not_sql() {
    let source = "menu.add(\"Select a file\")\nbutton(\"Select one\")\nhint(\"Table users\")\nlabel(\"Begin\")\n";
    let report = analyze("ui.py", Language::Python, source);
    assert_eq!(report.records.len(), 4);
    assert_eq!(report.accepted().count(), 0);
}

#[test]
fn test_lone_placeholder_rejected() {
    let verdict = validator().validate("$01").unwrap();
    assert!(!verdict.accepted());
}

#[test]
fn test_column_list_value_and_literal_dollar() {
    let verdict = validator()
        .validate("SELECT $01 FROM t WHERE x = $02 AND y = $$03")
        .unwrap();
    assert_eq!(verdict.statement_kind(), Some(StatementKind::Select));
}

#[test]
fn test_same_candidate_same_verdict() {
    let v = validator();
    let sql = "UPDATE accounts SET balance = balance - $01 WHERE id = $02";
    let first = v.validate(sql).unwrap();
    for _ in 0..3 {
        assert_eq!(v.validate(sql).unwrap(), first);
    }
    assert_eq!(first.statement_kind(), Some(StatementKind::Update));
}

#[test]
fn test_hundredth_placeholder_fails_the_file_only() {
    let operands = vec!["x"; 100].join(" + ',' + ");
    let source = format!("q = 'SELECT ' + {operands}\nok = 'SELECT 1'\n");
    let report = analyze("big.py", Language::Python, &source);
    assert!(matches!(report.failure, Some(FileFailure::Extraction(_))));
    assert!(report.records.is_empty());

    let operands = vec!["x"; 99].join(" + ',' + ");
    let source = format!("q = 'SELECT ' + {operands} + ' FROM t'\n");
    let report = analyze("ok.py", Language::Python, &source);
    assert!(report.failure.is_none());
    assert!(report.records[0].canonical.contains("$99"));
    assert!(report.records[0].verdict.accepted());
}

#[test]
fn test_unparseable_file_is_skipped() {
    let report = analyze("broken.rs", Language::Rust, "fn main( {");
    assert!(matches!(report.failure, Some(FileFailure::Parse(_))));
    assert!(report.records.is_empty());
}
