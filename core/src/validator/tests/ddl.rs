use super::{assert_accepts, assert_rejects};
use crate::validator::{FailureReason, StatementKind};

#[test]
fn test_create_table() {
    for sql in [
        "CREATE TABLE users (id INTEGER PRIMARY KEY, email VARCHAR(255) NOT NULL UNIQUE, \
         created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP)",
        "CREATE TABLE IF NOT EXISTS orders (id INT, \
         user_id INT REFERENCES users (id) ON DELETE CASCADE, \
         amount NUMERIC(10, 2) CHECK (amount >= 0), \
         CONSTRAINT pk_orders PRIMARY KEY (id), \
         FOREIGN KEY (user_id) REFERENCES users (id) ON UPDATE NO ACTION)",
        "CREATE TEMPORARY TABLE scratch (v CHARACTER VARYING(20))",
        "CREATE TABLE copy AS SELECT * FROM users",
    ] {
        assert_accepts(sql, StatementKind::Ddl);
    }
}

#[test]
fn test_views_indexes_schemas() {
    for sql in [
        "CREATE VIEW active_users AS SELECT * FROM users WHERE active",
        "CREATE OR REPLACE VIEW v (a, b) AS SELECT x, y FROM t WITH CHECK OPTION",
        "CREATE UNIQUE INDEX idx_email ON users (email)",
        "CREATE INDEX IF NOT EXISTS idx_created ON orders (created_at DESC)",
        "CREATE SCHEMA reporting",
        "CREATE SCHEMA IF NOT EXISTS AUTHORIZATION admin",
    ] {
        assert_accepts(sql, StatementKind::Ddl);
    }
}

#[test]
fn test_drop_alter_truncate() {
    for sql in [
        "DROP TABLE IF EXISTS users, orders CASCADE",
        "DROP VIEW active_users",
        "ALTER TABLE users ADD COLUMN age INTEGER DEFAULT 0",
        "ALTER TABLE users RENAME COLUMN a TO b",
        "ALTER TABLE users ALTER COLUMN age SET NOT NULL",
        "ALTER TABLE users ALTER age TYPE BIGINT, DROP COLUMN IF EXISTS legacy",
        "ALTER TABLE users ADD CONSTRAINT uq_email UNIQUE (email)",
        "TRUNCATE TABLE logs RESTART IDENTITY",
    ] {
        assert_accepts(sql, StatementKind::Ddl);
    }
}

#[test]
fn test_malformed_ddl_rejected() {
    assert_rejects("CREATE TABLE", FailureReason::NoMatch);
    assert_rejects("DROP users", FailureReason::NoMatch);
    assert_rejects("CREATE TABLE t (id INTEGER,)", FailureReason::NoMatch);
}
