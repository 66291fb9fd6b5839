//! Grammar coverage by statement family.

mod ddl;
mod placeholders;
mod query;

use super::*;

pub(super) fn validate(sql: &str) -> Verdict {
    validate_with(sql, ValidatorConfig::default())
}

pub(super) fn validate_with(sql: &str, config: ValidatorConfig) -> Verdict {
    Validator::new(config).unwrap().validate(sql).unwrap()
}

#[track_caller]
pub(super) fn assert_accepts(sql: &str, kind: StatementKind) {
    let verdict = validate(sql);
    assert_eq!(verdict, Verdict::Accepted { kind }, "{sql}");
}

#[track_caller]
pub(super) fn assert_rejects(sql: &str, reason: FailureReason) {
    let verdict = validate(sql);
    assert_eq!(verdict.failure_reason(), Some(reason), "{sql}: {verdict:?}");
}
