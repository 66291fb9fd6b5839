//! Value expressions, predicates and data types.

pub const EXPRESSIONS: &str = r#"
search_condition = value_expression ;

value_expression = or_expression ;
or_expression = and_expression { OR and_expression } ;
and_expression = not_expression { AND not_expression } ;
not_expression = NOT not_expression | predicate ;

predicate = comparison_operand [predicate_tail]
          | EXISTS '(' query_expression ')'
          | UNIQUE '(' query_expression ')' ;

predicate_tail = comparison_operator comparison_operand
               | comparison_operator quantifier '(' query_expression ')'
               | [NOT] BETWEEN [SYMMETRIC | ASYMMETRIC] comparison_operand AND comparison_operand
               | [NOT] IN in_value_list
               | [NOT] (LIKE | SIMILAR TO) comparison_operand [ESCAPE comparison_operand]
               | IS [NOT] (NULL | TRUE | FALSE | UNKNOWN)
               | IS [NOT] DISTINCT FROM comparison_operand ;

# A placeholder may stand for the whole parenthesized list.
in_value_list = '(' (query_expression | expression_list) ')' ;

comparison_operator = '=' | '<>' | '!=' | '<' | '>' | '<=' | '>=' ;
quantifier = ALL | ANY | SOME ;

comparison_operand = additive_expression ;
additive_expression = multiplicative_expression { ('+' | '-' | '||') multiplicative_expression } ;
multiplicative_expression = unary_expression { ('*' | '/' | '%') unary_expression } ;
unary_expression = ('+' | '-') unary_expression | primary_expression ;

primary_expression = literal
                   | column_reference
                   | @param
                   | '(' value_expression ')'
                   | '(' value_expression ',' expression_list ')'
                   | ROW '(' expression_list ')'
                   | '(' query_expression ')'
                   | case_expression
                   | cast_expression
                   | function_call
                   | special_function
                   | datetime_value_function ;

column_reference = identifier { '.' identifier } ;
identifier = @ident ;

literal = @number
        | @string
        | NULL
        | TRUE
        | FALSE
        | (DATE | TIME | TIMESTAMP) @string
        | INTERVAL ['+' | '-'] @string [interval_qualifier] ;

interval_qualifier = datetime_field [TO datetime_field] ;
datetime_field = YEAR | MONTH | DAY | HOUR | MINUTE | SECOND ;

case_expression = CASE [value_expression] when_clause { when_clause } [ELSE value_expression] END ;
when_clause = WHEN search_condition THEN value_expression ;

cast_expression = CAST '(' value_expression AS data_type ')' ;

function_call = function_name '(' [function_arguments] ')' [filter_clause] [over_clause] ;
function_name = identifier { '.' identifier } | LEFT | RIGHT ;
function_arguments = '*' | [set_quantifier] expression_list [order_by_clause] ;
filter_clause = FILTER '(' WHERE search_condition ')' ;
over_clause = OVER (identifier | '(' window_specification ')') ;
window_specification = [identifier] [PARTITION BY expression_list] [order_by_clause] [frame_clause] ;
frame_clause = (ROWS | RANGE) (frame_bound | BETWEEN frame_bound AND frame_bound) ;
frame_bound = UNBOUNDED (PRECEDING | FOLLOWING)
            | CURRENT ROW
            | comparison_operand (PRECEDING | FOLLOWING) ;

special_function = EXTRACT '(' datetime_field FROM value_expression ')'
                 | SUBSTRING '(' value_expression FROM value_expression [FOR value_expression] ')'
                 | POSITION '(' comparison_operand IN value_expression ')'
                 | TRIM '(' [ [LEADING | TRAILING | BOTH] [comparison_operand] FROM ] value_expression ')' ;

datetime_value_function = CURRENT_DATE
                        | (CURRENT_TIME | CURRENT_TIMESTAMP | LOCALTIME | LOCALTIMESTAMP) [ '(' @number ')' ]
                        | CURRENT_USER
                        | SESSION_USER ;

data_type = DOUBLE PRECISION
          | (CHARACTER | CHAR) [VARYING] [ '(' @number ')' ]
          | (TIME | TIMESTAMP) [ '(' @number ')' ] [ (WITH | WITHOUT) TIME ZONE ]
          | INTERVAL [interval_qualifier]
          | identifier [ '(' @number { ',' @number } ')' ] ;
"#;
