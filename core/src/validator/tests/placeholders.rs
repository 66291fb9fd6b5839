use super::{assert_accepts, assert_rejects, validate};
use crate::error::SiftError;
use crate::validator::{FailureReason, StatementKind, Validator, ValidatorConfig};

#[test]
fn test_placeholder_as_value() {
    assert_accepts("SELECT * FROM users WHERE id = $01", StatementKind::Select);
    assert_accepts(
        "SELECT * FROM users WHERE id IN ($01) AND created_at > $02",
        StatementKind::Select,
    );
}

#[test]
fn test_placeholder_as_in_list() {
    // "... IN " + str(tuple(ids))
    assert_accepts("SELECT * FROM users WHERE id IN $01", StatementKind::Select);
    assert_accepts(
        "DELETE FROM sessions WHERE user_id NOT IN $01 AND expired",
        StatementKind::Delete,
    );
    assert_rejects("SELECT * FROM users WHERE id IN users", FailureReason::NoMatch);
}

#[test]
fn test_placeholder_as_clause_fragment() {
    // Column list, table name, whole condition, sort key.
    for sql in [
        "SELECT $01 FROM t",
        "SELECT * FROM $01",
        "SELECT * FROM users WHERE $01",
        "SELECT * FROM users ORDER BY $01",
        "SELECT * FROM users $01",
    ] {
        assert_accepts(sql, StatementKind::Select);
    }
}

#[test]
fn test_literal_dollar_is_not_a_placeholder() {
    // $$03 decodes to the text `$03`, a driver bind parameter.
    assert_accepts(
        "SELECT $01 FROM t WHERE x = $02 AND y = $$03",
        StatementKind::Select,
    );
}

#[test]
fn test_placeholders_in_dml() {
    assert_accepts("INSERT INTO $01 ($02) VALUES ($03)", StatementKind::Insert);
    assert_accepts("UPDATE users SET $01 WHERE id = $02", StatementKind::Update);
    assert_accepts("DELETE FROM $01 WHERE $02", StatementKind::Delete);
}

#[test]
fn test_unanchored_placeholders_are_ambiguous() {
    assert_rejects("$01", FailureReason::AmbiguousPlaceholderSpan);
    assert_rejects("$01 $02", FailureReason::AmbiguousPlaceholderSpan);
    assert_rejects("$01 customers", FailureReason::AmbiguousPlaceholderSpan);
}

#[test]
fn test_placeholder_never_replaces_keyword() {
    assert_rejects("$01 * FROM users", FailureReason::NoMatch);
    assert_rejects("SELECT * $01 users", FailureReason::NoMatch);
}

#[test]
fn test_quoted_placeholder_is_lexical_error() {
    // Each text run is tokenized on its own, so the quote never closes.
    assert_rejects("SELECT * FROM t WHERE name = '$01'", FailureReason::LexicalError);
}

#[test]
fn test_ninety_nine_placeholders() {
    let columns: Vec<String> = (1..=99).map(|i| format!("${i:02}")).collect();
    let sql = format!("SELECT {} FROM t", columns.join(", "));
    assert!(validate(&sql).accepted());
}

#[test]
fn test_malformed_escape_is_an_error() {
    let validator = Validator::new(ValidatorConfig::default()).unwrap();
    for bad in ["SELECT $x", "SELECT 1 $", "SELECT $00"] {
        assert!(
            matches!(
                validator.validate(bad),
                Err(SiftError::MalformedEscape { .. })
            ),
            "{bad}"
        );
    }
}
