use super::{assert_accepts, assert_rejects, validate, validate_with};
use crate::validator::{FailureReason, StatementKind, StatementPolicy, ValidatorConfig, Verdict};

#[test]
fn test_simple_selects() {
    for sql in [
        "select * from users",
        "SELECT id, name FROM users WHERE active = TRUE ORDER BY name DESC LIMIT 10",
        "SELECT DISTINCT u.id AS user_id, u.* FROM public.users AS u",
    ] {
        assert_accepts(sql, StatementKind::Select);
    }
}

#[test]
fn test_bare_queries_need_opt_in() {
    let bare = ValidatorConfig {
        bare_queries: true,
        ..Default::default()
    };
    for sql in [
        "SELECT 1",
        "SELECT CURRENT_TIMESTAMP",
        "TABLE users",
        "VALUES (1, 'a'), (2, 'b')",
        "SELECT * FROM (VALUES (1), (2)) AS v (n)",
    ] {
        assert_rejects(sql, FailureReason::NoMatch);
        assert_eq!(
            validate_with(sql, bare.clone()),
            Verdict::Accepted { kind: StatementKind::Select },
            "{sql}"
        );
    }
}

#[test]
fn test_rejects_keyword_led_prose() {
    for text in [
        "Select a file",
        "Select an option",
        "select language",
        "Select one",
        "Select all",
        "Table users",
        "Values (1)",
        "Begin",
        "With love",
        "Order by date",
    ] {
        assert!(!validate(text).accepted(), "{text}: {:?}", validate(text));
    }
}

#[test]
fn test_joins() {
    assert_accepts(
        "SELECT u.id, o.total FROM users u JOIN orders o ON o.user_id = u.id \
         LEFT OUTER JOIN items i USING (id) CROSS JOIN regions",
        StatementKind::Select,
    );
    assert_accepts(
        "SELECT * FROM a NATURAL JOIN b, c FULL JOIN d ON c.k = d.k",
        StatementKind::Select,
    );
}

#[test]
fn test_subqueries_and_predicates() {
    for sql in [
        "SELECT * FROM t WHERE EXISTS (SELECT 1 FROM s WHERE s.id = t.id)",
        "SELECT * FROM t WHERE a IN (1, 2) AND b BETWEEN 1 AND 5 AND c LIKE 'x%' AND d IS NOT NULL",
        "SELECT * FROM t WHERE a NOT IN (SELECT a FROM s) OR b > ALL (SELECT b FROM s)",
        "SELECT (SELECT MAX(x) FROM s) AS top FROM t",
        "SELECT * FROM (SELECT id FROM t) AS sub WHERE NOT (id = 1)",
        "SELECT * FROM t WHERE a IS DISTINCT FROM b",
    ] {
        assert_accepts(sql, StatementKind::Select);
    }
}

#[test]
fn test_aggregates_and_grouping() {
    assert_accepts(
        "SELECT category, COUNT(*), MAX(price) FROM products GROUP BY category HAVING COUNT(*) > 5",
        StatementKind::Select,
    );
    assert_accepts(
        "SELECT COUNT(DISTINCT user_id) FILTER (WHERE paid) FROM orders",
        StatementKind::Select,
    );
}

#[test]
fn test_set_operations_and_ctes() {
    assert_accepts(
        "SELECT a FROM t UNION ALL SELECT a FROM s EXCEPT SELECT a FROM r",
        StatementKind::Select,
    );
    assert_accepts(
        "WITH recent AS (SELECT * FROM orders WHERE created_at > CURRENT_DATE) \
         SELECT * FROM recent",
        StatementKind::Select,
    );
}

#[test]
fn test_expressions() {
    for sql in [
        "SELECT CASE WHEN x > 0 THEN 'pos' ELSE 'neg' END FROM t",
        "SELECT CAST(y AS VARCHAR(10)), CAST(z AS DOUBLE PRECISION) FROM t",
        "SELECT price * (1 + tax) - discount, first_name || ' ' || last_name FROM t",
        "SELECT EXTRACT(YEAR FROM created_at), TRIM(BOTH ' ' FROM name) FROM t",
        "SELECT CURRENT_TIMESTAMP - INTERVAL '1' DAY FROM t",
        "SELECT ROW_NUMBER() OVER (PARTITION BY dept ORDER BY salary DESC) FROM emp",
        "SELECT -1, +2.5e3, .5, N'text', 'it''s' FROM t",
    ] {
        assert_accepts(sql, StatementKind::Select);
    }
}

#[test]
fn test_pagination_forms() {
    assert_accepts("SELECT * FROM t LIMIT 10 OFFSET 20", StatementKind::Select);
    assert_accepts(
        "SELECT * FROM t ORDER BY id OFFSET 5 ROWS FETCH FIRST 10 ROWS ONLY",
        StatementKind::Select,
    );
}

#[test]
fn test_bind_parameters_and_trivia() {
    assert_accepts(
        "select /* all */ * from users where id = ? and name = :name -- trailing",
        StatementKind::Select,
    );
    assert_accepts("SELECT * FROM users WHERE id = %s", StatementKind::Select);
    assert_accepts("  SELECT \"Mixed Case\" FROM \"My Table\";  ", StatementKind::Select);
}

#[test]
fn test_non_sql_is_rejected() {
    assert_rejects("Hello, world!", FailureReason::NoMatch);
    assert_rejects("Update your profile to continue", FailureReason::NoMatch);
    assert_rejects("SELECT FROM WHERE", FailureReason::NoMatch);
    assert_rejects("SELECT * FROM", FailureReason::NoMatch);
    assert_rejects("", FailureReason::NoMatch);
    assert_rejects("  ;  ", FailureReason::NoMatch);
}

#[test]
fn test_lexical_errors() {
    assert_rejects("SELECT 'unterminated", FailureReason::LexicalError);
    assert_rejects("SELECT # FROM t", FailureReason::LexicalError);
    match validate("SELECT \"open FROM t") {
        Verdict::Rejected { detail, .. } => {
            assert!(detail.contains("unterminated quoted identifier"), "{detail}")
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_rejection_detail_names_token() {
    match validate("SELECT * FROM users users2 users3") {
        Verdict::Rejected { reason, detail } => {
            assert_eq!(reason, FailureReason::NoMatch);
            assert!(detail.contains("'USERS3'"), "{detail}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_statement_policies() {
    let two = "SELECT a FROM t; DELETE FROM t;";
    let broken = "SELECT a FROM t; this is not sql";

    assert_eq!(validate(two), Verdict::Accepted { kind: StatementKind::Select });
    assert_eq!(validate(broken).failure_reason(), Some(FailureReason::NoMatch));

    let any = ValidatorConfig {
        statement_policy: StatementPolicy::Any,
        ..Default::default()
    };
    assert!(validate_with(broken, any.clone()).accepted());
    assert_eq!(
        validate_with("nonsense words; DELETE FROM t", any).statement_kind(),
        Some(StatementKind::Delete)
    );

    let single = ValidatorConfig {
        statement_policy: StatementPolicy::Single,
        ..Default::default()
    };
    assert!(!validate_with(two, single.clone()).accepted());
    assert!(validate_with("SELECT a FROM t;", single).accepted());
}

#[test]
fn test_item_budget_exhaustion() {
    let config = ValidatorConfig {
        max_items: 10,
        ..Default::default()
    };
    match validate_with("SELECT * FROM users WHERE id = 1", config) {
        Verdict::Rejected { reason, detail } => {
            assert_eq!(reason, FailureReason::NoMatch);
            assert!(detail.contains("budget"), "{detail}");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_time_budget_exhaustion() {
    let columns: Vec<String> = (0..40).map(|i| format!("c{i} + {i}")).collect();
    let sql = format!("SELECT {} FROM t", columns.join(", "));
    let config = ValidatorConfig {
        time_budget_ms: Some(0),
        ..Default::default()
    };
    assert_eq!(
        validate_with(&sql, config).failure_reason(),
        Some(FailureReason::NoMatch)
    );
    assert!(validate(&sql).accepted());
}

#[test]
fn test_verdicts_are_idempotent() {
    for sql in ["SELECT * FROM users WHERE id = $01", "Hello", "SELECT 'x"] {
        assert_eq!(validate(sql), validate(sql));
    }
}
