//! Schema definition and manipulation statements.

pub const DDL: &str = r#"
!ddl_statement = create_table_statement
               | create_view_statement
               | create_index_statement
               | create_schema_statement
               | drop_statement
               | alter_table_statement
               | truncate_statement ;

!create_table_statement = CREATE [table_scope] TABLE [IF NOT EXISTS] table_name table_contents ;
table_scope = (GLOBAL | LOCAL) TEMPORARY | TEMPORARY ;
table_contents = '(' table_element { ',' table_element } ')'
               | AS '(' query_expression ')' [WITH [NO] DATA]
               | AS query_expression [WITH [NO] DATA] ;

table_element = column_definition | table_constraint ;
column_definition = identifier data_type { column_option } ;
column_option = DEFAULT comparison_operand
              | [CONSTRAINT identifier] column_constraint ;
column_constraint = NOT NULL
                  | NULL
                  | UNIQUE
                  | PRIMARY KEY
                  | CHECK '(' search_condition ')'
                  | references_specification ;

table_constraint = [CONSTRAINT identifier] table_constraint_body ;
table_constraint_body = UNIQUE '(' column_list ')'
                      | PRIMARY KEY '(' column_list ')'
                      | FOREIGN KEY '(' column_list ')' references_specification
                      | CHECK '(' search_condition ')' ;

references_specification = REFERENCES table_name [ '(' column_list ')' ]
                           [MATCH (FULL | PARTIAL | SIMPLE)]
                           { referential_action } ;
referential_action = ON (DELETE | UPDATE) (CASCADE | SET NULL | SET DEFAULT | RESTRICT | NO ACTION) ;

!create_view_statement = CREATE [OR REPLACE] VIEW table_name [ '(' column_list ')' ]
                         AS query_expression [WITH [CASCADED | LOCAL] CHECK OPTION] ;

!create_index_statement = CREATE [UNIQUE] INDEX [IF NOT EXISTS] identifier
                          ON table_name '(' index_column { ',' index_column } ')' ;
index_column = value_expression [ASC | DESC] ;

!create_schema_statement = CREATE SCHEMA [IF NOT EXISTS] schema_name_clause ;
schema_name_clause = identifier [AUTHORIZATION identifier] | AUTHORIZATION identifier ;

!drop_statement = DROP (TABLE | VIEW | SCHEMA | INDEX) [IF EXISTS]
                  table_name { ',' table_name } [CASCADE | RESTRICT] ;

!alter_table_statement = ALTER TABLE [IF EXISTS] table_name alter_table_action { ',' alter_table_action } ;
alter_table_action = ADD [COLUMN] [IF NOT EXISTS] column_definition
                   | ADD table_constraint
                   | DROP [COLUMN] [IF EXISTS] identifier [CASCADE | RESTRICT]
                   | DROP CONSTRAINT identifier [CASCADE | RESTRICT]
                   | ALTER [COLUMN] identifier alter_column_action
                   | RENAME [COLUMN] identifier TO identifier
                   | RENAME TO identifier ;
alter_column_action = SET DEFAULT comparison_operand
                    | DROP DEFAULT
                    | SET NOT NULL
                    | DROP NOT NULL
                    | [SET DATA] TYPE data_type ;

!truncate_statement = TRUNCATE [TABLE] table_name [(CONTINUE | RESTART) IDENTITY] [CASCADE | RESTRICT] ;
"#;
