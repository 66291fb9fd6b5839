//! Statement entry point and query expressions.

pub const STATEMENTS: &str = r#"
# Every alternative is one statement family; the first that derives names
# the statement kind.
!sql_statement = query_statement
               | insert_statement
               | update_statement
               | delete_statement
               | ddl_statement
               | transaction_statement
               | access_statement ;

!query_statement = query_expression ;
"#;

pub const QUERY: &str = r#"
!query_expression = [with_clause] query_body [order_by_clause] [limit_clause] ;

with_clause = WITH [RECURSIVE] common_table_expression { ',' common_table_expression } ;
common_table_expression = identifier [ '(' column_list ')' ] AS '(' query_expression ')' ;

!query_body = query_term { (UNION | EXCEPT) [ALL | DISTINCT] query_term } ;
!query_term = query_primary { INTERSECT [ALL | DISTINCT] query_primary } ;

set_quantifier = DISTINCT | ALL ;

select_list = '*' | select_item { ',' select_item } ;
select_item = value_expression [ [AS] identifier ] | qualified_asterisk ;
qualified_asterisk = identifier { '.' identifier } '.' '*' ;

from_clause = FROM table_reference { ',' table_reference } ;
table_reference = table_primary { joined_table } ;
joined_table = CROSS JOIN table_primary
             | NATURAL [join_type] JOIN table_primary
             | [join_type] JOIN table_primary join_specification ;
join_type = INNER | (LEFT | RIGHT | FULL) [OUTER] ;
join_specification = ON search_condition | USING '(' column_list ')' ;

table_primary = table_name [correlation]
              | [LATERAL] '(' query_expression ')' [correlation]
              | '(' table_reference ')'
              | function_call [correlation] ;
correlation = [AS] identifier [ '(' column_list ')' ] ;

table_name = identifier { '.' identifier } ;
column_list = identifier { ',' identifier } ;

where_clause = WHERE search_condition ;

group_by_clause = GROUP BY [set_quantifier] grouping_element { ',' grouping_element } ;
grouping_element = value_expression
                 | ROLLUP '(' expression_list ')'
                 | CUBE '(' expression_list ')'
                 | GROUPING SETS '(' grouping_element { ',' grouping_element } ')'
                 | '(' ')' ;

having_clause = HAVING search_condition ;

window_clause = WINDOW window_definition { ',' window_definition } ;
window_definition = identifier AS '(' window_specification ')' ;

order_by_clause = ORDER BY sort_item { ',' sort_item } ;
sort_item = value_expression [ASC | DESC] [NULLS (FIRST | LAST)] ;

# LIMIT/OFFSET is not ANSI but every engine in practice accepts it.
limit_clause = LIMIT (value_expression | ALL) [OFFSET value_expression]
             | OFFSET value_expression [ROW | ROWS] [fetch_clause]
             | fetch_clause ;
fetch_clause = FETCH (FIRST | NEXT) [value_expression] (ROW | ROWS) ONLY ;

row_value = '(' expression_list ')' ;
expression_list = value_expression { ',' value_expression } ;
"#;

/// Query forms that need a FROM clause.
pub const QUERY_PRIMARY: &str = r#"
!query_primary = query_specification | '(' query_expression ')' ;

!query_specification = SELECT [set_quantifier] select_list
                       from_clause
                       [where_clause]
                       [group_by_clause]
                       [having_clause]
                       [window_clause] ;
"#;

/// FROM-less SELECT, `TABLE t` and top-level `VALUES`. Short English phrases
/// such as "Select one" derive from these, so they are opt-in.
pub const BARE_QUERY_PRIMARY: &str = r#"
!query_primary = query_specification
               | table_value_constructor
               | TABLE table_name
               | '(' query_expression ')' ;

!query_specification = SELECT [set_quantifier] select_list
                       [from_clause]
                       [where_clause]
                       [group_by_clause]
                       [having_clause]
                       [window_clause] ;

table_value_constructor = VALUES row_value { ',' row_value } ;
"#;
