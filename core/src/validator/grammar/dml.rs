//! Data manipulation, transaction control and access control statements.

pub const DML: &str = r#"
!insert_statement = INSERT INTO table_name [ '(' column_list ')' ] insert_source ;
insert_source = query_expression
              | DEFAULT VALUES
              | VALUES insert_row { ',' insert_row } ;
insert_row = '(' insert_value { ',' insert_value } ')' ;
insert_value = value_expression | DEFAULT ;

!update_statement = UPDATE table_name [correlation] SET set_clause { ',' set_clause } [target_filter] ;
set_clause = column_reference '=' update_source
           | '(' column_list ')' '=' (row_value | '(' query_expression ')') ;
update_source = value_expression | DEFAULT ;

!delete_statement = DELETE FROM table_name [correlation] [target_filter] ;

target_filter = WHERE (search_condition | CURRENT OF identifier) ;
"#;

pub const TRANSACTIONS: &str = r#"
!transaction_statement = START TRANSACTION [transaction_mode { ',' transaction_mode }]
                       | BEGIN (WORK | TRANSACTION)
                       | COMMIT [WORK] [AND [NO] CHAIN]
                       | ROLLBACK [WORK] [AND [NO] CHAIN] [TO SAVEPOINT identifier]
                       | SAVEPOINT identifier
                       | RELEASE SAVEPOINT identifier
                       | SET TRANSACTION transaction_mode { ',' transaction_mode } ;

transaction_mode = ISOLATION LEVEL isolation_level
                 | READ ONLY
                 | READ WRITE ;
isolation_level = READ UNCOMMITTED | READ COMMITTED | REPEATABLE READ | SERIALIZABLE ;
"#;

pub const ACCESS: &str = r#"
!access_statement = grant_statement | revoke_statement ;

!grant_statement = GRANT privileges ON [TABLE] table_name TO grantee { ',' grantee } [WITH GRANT OPTION] ;
!revoke_statement = REVOKE [GRANT OPTION FOR] privileges ON [TABLE] table_name
                    FROM grantee { ',' grantee } [CASCADE | RESTRICT] ;

privileges = ALL [PRIVILEGES] | privilege_action { ',' privilege_action } ;
privilege_action = SELECT [ '(' column_list ')' ]
                 | INSERT [ '(' column_list ')' ]
                 | UPDATE [ '(' column_list ')' ]
                 | REFERENCES [ '(' column_list ')' ]
                 | DELETE
                 | USAGE
                 | TRIGGER ;
grantee = PUBLIC | identifier ;
"#;
