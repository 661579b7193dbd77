// SQL Parser Core
//
// Recursive-descent building blocks shared by the statement parsers:
// token matching, expressions, aliases, table references and WHERE
// conditions. Expressions are only understood as far as routing needs;
// anything composite is skipped and yields `SqlExpression::Ignore`.

use std::ops::Range;

use crate::error::{Result, ShardingError};
use crate::models::{
    unquote_identifier, Column, Condition, Limit, LimitValue, ShardingRule, SqlExpression, SqlStatement, SqlToken,
    SqlValue, StatementKind, Table,
};

use super::dialect::DatabaseType;
use super::lexer::Lexer;
use super::token::{Assist, Keyword, Literal, Symbol, Token, TokenType};

const COMPOSITE_OPERATORS: [TokenType; 11] = [
    TokenType::Symbol(Symbol::Plus),
    TokenType::Symbol(Symbol::Sub),
    TokenType::Symbol(Symbol::Star),
    TokenType::Symbol(Symbol::Slash),
    TokenType::Symbol(Symbol::Percent),
    TokenType::Symbol(Symbol::Amp),
    TokenType::Symbol(Symbol::Bar),
    TokenType::Symbol(Symbol::DoubleAmp),
    TokenType::Symbol(Symbol::DoubleBar),
    TokenType::Symbol(Symbol::Caret),
    TokenType::Symbol(Symbol::Dot),
];

/// Keywords closing a WHERE clause
const WHERE_TERMINATORS: [TokenType; 12] = [
    TokenType::Keyword(Keyword::Group),
    TokenType::Keyword(Keyword::Order),
    TokenType::Keyword(Keyword::Having),
    TokenType::Keyword(Keyword::Limit),
    TokenType::Keyword(Keyword::Offset),
    TokenType::Keyword(Keyword::Fetch),
    TokenType::Keyword(Keyword::Union),
    TokenType::Keyword(Keyword::Intersect),
    TokenType::Keyword(Keyword::Except),
    TokenType::Keyword(Keyword::Minus),
    TokenType::Keyword(Keyword::For),
    TokenType::Keyword(Keyword::Lock),
];

pub struct SqlParser<'a> {
    lexer: Lexer<'a>,
    sharding_rule: &'a ShardingRule,
    parameters_index: usize,
    last_end_position: usize,
    row_number_alias: Option<String>,
}

impl<'a> SqlParser<'a> {
    pub fn new(sql: &'a str, database_type: DatabaseType, sharding_rule: &'a ShardingRule) -> Self {
        Self {
            lexer: Lexer::new(sql, database_type),
            sharding_rule,
            parameters_index: 0,
            last_end_position: 0,
            row_number_alias: None,
        }
    }

    pub fn sharding_rule(&self) -> &'a ShardingRule {
        self.sharding_rule
    }

    pub fn database_type(&self) -> DatabaseType {
        self.lexer.database_type()
    }

    pub fn input(&self) -> &'a str {
        self.lexer.input()
    }

    pub fn token(&self) -> &Token {
        self.lexer.current_token()
    }

    /// Source text of the current token, quotes included
    pub fn raw_literals(&self) -> &'a str {
        let token = self.lexer.current_token();
        self.input()
            .get(token.begin_position..token.end_position)
            .unwrap_or_default()
    }

    /// End offset of the last consumed token
    pub fn last_end_position(&self) -> usize {
        self.last_end_position
    }

    /// Number of placeholders consumed so far
    pub fn parameters_index(&self) -> usize {
        self.parameters_index
    }

    /// Claim the next placeholder index
    pub fn increase_parameters_index(&mut self) -> usize {
        self.parameters_index += 1;
        self.parameters_index - 1
    }

    pub fn next(&mut self) {
        self.last_end_position = self.lexer.current_token().end_position;
        self.lexer.next_token();
    }

    pub fn is(&self, token_type: impl Into<TokenType>) -> bool {
        self.token().token_type == token_type.into()
    }

    pub fn is_any(&self, token_types: &[TokenType]) -> bool {
        token_types.contains(&self.token().token_type)
    }

    pub fn is_end(&self) -> bool {
        self.token().is_end() || self.is(Symbol::Semi)
    }

    pub fn skip_if(&mut self, token_type: impl Into<TokenType>) -> bool {
        if self.is(token_type) {
            self.next();
            return true;
        }
        false
    }

    pub fn skip_if_any(&mut self, token_types: &[TokenType]) -> bool {
        if self.is_any(token_types) {
            self.next();
            return true;
        }
        false
    }

    /// Consume the expected token or fail with a syntax error
    pub fn accept(&mut self, token_type: impl Into<TokenType>) -> Result<()> {
        let expected = token_type.into();
        if self.is(expected) {
            self.next();
            return Ok(());
        }
        Err(self.syntax_error(&expected.to_string()))
    }

    pub fn syntax_error(&self, expected: &str) -> ShardingError {
        let token = self.token();
        if token.token_type == TokenType::Assist(Assist::Error) {
            return ShardingError::Parsing(format!(
                "SQL syntax error, unrecognized input '{}' at position {}",
                token.literals, token.begin_position
            ));
        }
        ShardingError::Parsing(format!(
            "SQL syntax error, expected token is {}, actual token is {}, literals is '{}'",
            expected, token.token_type, token.literals
        ))
    }

    pub fn unsupported(&self) -> ShardingError {
        ShardingError::UnsupportedSql(format!("Not supported token '{}'", self.token().literals))
    }

    /// Identifier, or a keyword this dialect does not reserve
    pub fn is_identifier(&self) -> bool {
        match self.token().token_type {
            TokenType::Literal(Literal::Identifier) => true,
            TokenType::Keyword(keyword) => !keyword.is_reserved(),
            _ => false,
        }
    }

    /// Anything that can name a table, column or alias
    pub fn is_name(&self) -> bool {
        self.is_identifier() || self.is(Literal::Chars)
    }

    pub fn skip_until(&mut self, token_types: &[TokenType]) {
        while !self.token().is_end() && !self.is_any(token_types) {
            if self.is(Symbol::Question) {
                self.increase_parameters_index();
            }
            self.next();
        }
    }

    /// Skip a balanced parenthesis group, counting placeholders inside it.
    ///
    /// # Returns
    /// The skipped source text including both parentheses, or an empty
    /// string when the current token is not `(`
    pub fn skip_parentheses(&mut self) -> String {
        // never fails when OR is allowed
        self.skip_parentheses_checked(false).unwrap_or_default()
    }

    fn skip_parentheses_checked(&mut self, reject_or: bool) -> Result<String> {
        if !self.is(Symbol::LeftParen) {
            return Ok(String::new());
        }
        let begin = self.token().begin_position;
        let mut depth = 0usize;
        loop {
            if self.token().is_end() {
                return Ok(self.input().get(begin..).unwrap_or_default().to_string());
            }
            if self.is(Symbol::LeftParen) {
                depth += 1;
            } else if self.is(Symbol::RightParen) {
                depth -= 1;
                if depth == 0 {
                    let end = self.token().end_position;
                    self.next();
                    return Ok(self.input().get(begin..end).unwrap_or_default().to_string());
                }
            } else if self.is(Symbol::Question) {
                self.increase_parameters_index();
            } else if reject_or && self.is(Keyword::Or) {
                return Err(self.unsupported());
            }
            self.next();
        }
    }

    /// Parse an expression, marking `table.column` owners for rewriting
    pub fn parse_expression(&mut self, statement: &mut SqlStatement) -> SqlExpression {
        let begin_position = self.token().begin_position;
        let owner_literals = self.raw_literals();
        let result = self.parse_expression_without_tokens();
        if let SqlExpression::Property { owner, .. } = &result {
            if statement.tables.contains_name(owner) {
                statement.sql_tokens.push(SqlToken::Table {
                    begin_position,
                    original_literals: owner_literals.to_string(),
                });
            }
        }
        result
    }

    fn parse_expression_without_tokens(&mut self) -> SqlExpression {
        let expression = self.current_expression();
        if self.is_identifier() {
            let owner = unquote_identifier(self.raw_literals());
            self.next();
            if self.skip_if(Symbol::Dot) {
                let name = unquote_identifier(self.raw_literals());
                self.next();
                if self.skip_if_composite() {
                    return SqlExpression::Ignore;
                }
                return SqlExpression::Property { owner, name };
            }
            if self.is(Symbol::LeftParen) {
                self.skip_parentheses();
                self.skip_rest_composite();
                return SqlExpression::Ignore;
            }
            return if self.skip_if_composite() {
                SqlExpression::Ignore
            } else {
                expression
            };
        }
        self.next();
        if self.skip_if_composite() {
            SqlExpression::Ignore
        } else {
            expression
        }
    }

    fn current_expression(&mut self) -> SqlExpression {
        let literals = self.token().literals.clone();
        match self.token().token_type {
            TokenType::Symbol(Symbol::Question) => SqlExpression::Placeholder(self.increase_parameters_index()),
            TokenType::Literal(Literal::Chars) => SqlExpression::Text(literals),
            TokenType::Literal(Literal::Int) | TokenType::Literal(Literal::Float) => {
                match SqlValue::parse_literal(literals.trim_end_matches(['f', 'F', 'd', 'D'])) {
                    value @ (SqlValue::Int(_) | SqlValue::Float(_)) => SqlExpression::Number(value),
                    _ => SqlExpression::Ignore,
                }
            }
            TokenType::Literal(Literal::Hex) => match i64::from_str_radix(&literals[2..], 16) {
                Ok(value) => SqlExpression::Number(SqlValue::Int(value)),
                Err(_) => SqlExpression::Ignore,
            },
            _ if self.is_identifier() => SqlExpression::Identifier(unquote_identifier(&literals)),
            _ => SqlExpression::Ignore,
        }
    }

    fn skip_if_composite(&mut self) -> bool {
        if self.is_any(&COMPOSITE_OPERATORS) || self.is(Symbol::LeftParen) {
            self.skip_parentheses();
            self.skip_rest_composite();
            return true;
        }
        false
    }

    fn skip_rest_composite(&mut self) {
        while self.skip_if_any(&COMPOSITE_OPERATORS) {
            if self.is(Symbol::Question) {
                self.increase_parameters_index();
            }
            self.next();
            self.skip_parentheses();
        }
    }

    /// `AS alias`, or a bare alias
    pub fn parse_alias(&mut self) -> Option<String> {
        if self.skip_if(Keyword::As) {
            if matches!(self.token().token_type, TokenType::Symbol(_)) || self.token().is_end() {
                return None;
            }
            let alias = unquote_identifier(&self.token().literals);
            self.next();
            return Some(alias);
        }
        if self.is_name() {
            let alias = unquote_identifier(&self.token().literals);
            self.next();
            return Some(alias);
        }
        None
    }

    /// Parse a possibly schema-qualified table name and mark it for rewriting.
    ///
    /// # Returns
    /// The unquoted table name, without the schema
    pub fn parse_table_name(&mut self, statement: &mut SqlStatement) -> Result<String> {
        if !self.is_name() {
            return Err(self.syntax_error("table name"));
        }
        let mut begin_position = self.token().begin_position;
        let mut literals = self.raw_literals();
        self.next();
        if self.skip_if(Symbol::Dot) {
            if !self.is_name() {
                return Err(self.syntax_error("table name"));
            }
            begin_position = self.token().begin_position;
            literals = self.raw_literals();
            self.next();
        }
        statement.sql_tokens.push(SqlToken::Table {
            begin_position,
            original_literals: literals.to_string(),
        });
        Ok(unquote_identifier(literals))
    }

    /// The only table of an UPDATE, DELETE or INSERT
    pub fn parse_single_table(&mut self, statement: &mut SqlStatement) -> Result<()> {
        let has_parentheses = self.skip_if(Symbol::LeftParen);
        if has_parentheses && self.is(Keyword::Select) {
            return Err(ShardingError::UnsupportedSql("Cannot support subquery".to_string()));
        }
        let name = self.parse_table_name(statement)?;
        if has_parentheses {
            self.accept(Symbol::RightParen)?;
        }
        let alias = self.parse_alias();
        if self.skip_join()? {
            return Err(ShardingError::UnsupportedSql("Cannot support Multiple-Table.".to_string()));
        }
        statement.tables.add(Table::new(name, alias));
        Ok(())
    }

    /// Skip a join keyword sequence, including the comma of an implicit join
    pub fn skip_join(&mut self) -> Result<bool> {
        if self.skip_if_any(&[Keyword::Left.into(), Keyword::Right.into(), Keyword::Full.into()]) {
            self.skip_if(Keyword::Outer);
            self.accept(Keyword::Join)?;
            return Ok(true);
        }
        if self.skip_if(Keyword::Inner) {
            self.accept(Keyword::Join)?;
            return Ok(true);
        }
        if self.skip_if(Keyword::Natural) {
            self.skip_if_any(&[Keyword::Left.into(), Keyword::Right.into(), Keyword::Inner.into()]);
            self.skip_if(Keyword::Outer);
            self.accept(Keyword::Join)?;
            return Ok(true);
        }
        if self.skip_if_any(&[Keyword::Join.into(), Symbol::Comma.into(), Keyword::StraightJoin.into()]) {
            return Ok(true);
        }
        if self.skip_if(Keyword::Cross) {
            if self.skip_if_any(&[Keyword::Join.into(), Keyword::Apply.into()]) {
                return Ok(true);
            }
            return Err(self.syntax_error("JOIN"));
        }
        if self.is(Keyword::Outer) {
            self.next();
            self.accept(Keyword::Apply)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// WHERE clause: AND-chained `=`, `IN` and `BETWEEN` conditions.
    ///
    /// # Errors
    /// Returns an unsupported-SQL error when `OR` appears anywhere in the clause
    pub fn parse_where(&mut self, statement: &mut SqlStatement) -> Result<()> {
        if !self.skip_if(Keyword::Where) {
            return Ok(());
        }
        let mut open_parentheses = 0usize;
        loop {
            while self.skip_if(Symbol::LeftParen) {
                open_parentheses += 1;
            }
            if self.is_condition_operand() {
                self.parse_comparison_condition(statement)?;
            }
            while open_parentheses > 0 && self.skip_if(Symbol::RightParen) {
                open_parentheses -= 1;
            }
            self.skip_rest_of_predicate(&mut open_parentheses)?;
            if self.is(Keyword::Or) {
                return Err(self.unsupported());
            }
            if !self.skip_if(Keyword::And) {
                break;
            }
        }
        Ok(())
    }

    /// Skip a predicate this parser does not interpret (IS NULL, NOT IN, EXISTS, ...)
    fn skip_rest_of_predicate(&mut self, open_parentheses: &mut usize) -> Result<()> {
        let mut in_between = false;
        loop {
            if self.is_end() || self.is_any(&WHERE_TERMINATORS) {
                return Ok(());
            }
            match self.token().token_type {
                TokenType::Keyword(Keyword::Or) => return Err(self.unsupported()),
                TokenType::Keyword(Keyword::And) if in_between => in_between = false,
                TokenType::Keyword(Keyword::And) => return Ok(()),
                TokenType::Keyword(Keyword::Between) => in_between = true,
                TokenType::Symbol(Symbol::RightParen) => {
                    if *open_parentheses == 0 {
                        return Ok(());
                    }
                    *open_parentheses -= 1;
                }
                TokenType::Symbol(Symbol::LeftParen) => {
                    self.skip_parentheses_checked(true)?;
                    continue;
                }
                TokenType::Symbol(Symbol::Question) => {
                    self.increase_parameters_index();
                }
                _ => {}
            }
            self.next();
        }
    }

    /// NOT, EXISTS and other prefixed predicates are skipped, not parsed
    fn is_condition_operand(&self) -> bool {
        (self.is_identifier() && !self.is(Keyword::Exists))
            || self.is_any(&[
                Literal::Chars.into(),
                Literal::Int.into(),
                Literal::Float.into(),
                Literal::Hex.into(),
                Symbol::Question.into(),
            ])
    }

    fn parse_comparison_condition(&mut self, statement: &mut SqlStatement) -> Result<()> {
        let left = self.parse_expression(statement);
        if self.is(Symbol::Eq) {
            return self.parse_equal_condition(statement, &left);
        }
        if self.is(Keyword::In) {
            return self.parse_in_condition(statement, &left);
        }
        if self.is(Keyword::Between) {
            return self.parse_between_condition(statement, &left);
        }
        if self.is_any(&[Symbol::Lt.into(), Symbol::Gt.into(), Symbol::LtEq.into(), Symbol::GtEq.into()]) {
            let column_name = match &left {
                SqlExpression::Identifier(name) => Some(name.as_str()),
                SqlExpression::Property { name, .. } => Some(name.as_str()),
                _ => None,
            };
            if statement.kind == StatementKind::Select && column_name.map(|n| self.is_row_number_column(n)).unwrap_or(false) {
                return self.parse_row_number_condition(statement);
            }
            self.next();
            self.parse_expression(statement);
        } else if self.is_any(&[Symbol::LtGt.into(), Symbol::BangEq.into(), Keyword::Like.into()]) {
            self.next();
            self.parse_expression(statement);
        }
        Ok(())
    }

    fn parse_equal_condition(&mut self, statement: &mut SqlStatement, left: &SqlExpression) -> Result<()> {
        self.next();
        let right = self.parse_expression(statement);
        let qualified = matches!(left, SqlExpression::Property { .. });
        if (statement.tables.is_single_table() || qualified) && right.is_value() {
            if let Some(column) = self.find_column(statement, left) {
                statement.conditions.add(Condition::equal(column, right));
            }
        }
        Ok(())
    }

    fn parse_in_condition(&mut self, statement: &mut SqlStatement, left: &SqlExpression) -> Result<()> {
        self.next();
        self.accept(Symbol::LeftParen)?;
        if self.is(Keyword::Select) {
            return Err(ShardingError::UnsupportedSql("Cannot support subquery".to_string()));
        }
        let mut rights = Vec::new();
        loop {
            if self.skip_if(Symbol::RightParen) {
                break;
            }
            if self.token().is_end() {
                return Err(self.syntax_error("')'"));
            }
            if self.skip_if(Symbol::Comma) {
                continue;
            }
            rights.push(self.parse_expression(statement));
        }
        if !rights.is_empty() && rights.iter().all(SqlExpression::is_value) {
            if let Some(column) = self.find_column(statement, left) {
                statement.conditions.add(Condition::in_list(column, rights));
            }
        }
        Ok(())
    }

    fn parse_between_condition(&mut self, statement: &mut SqlStatement, left: &SqlExpression) -> Result<()> {
        self.next();
        let lower = self.parse_expression(statement);
        self.accept(Keyword::And)?;
        let upper = self.parse_expression(statement);
        if lower.is_value() && upper.is_value() {
            if let Some(column) = self.find_column(statement, left) {
                statement.conditions.add(Condition::between(column, lower, upper));
            }
        }
        Ok(())
    }

    /// Resolve the column of a condition; only sharding columns are kept
    fn find_column(&self, statement: &SqlStatement, expression: &SqlExpression) -> Option<Column> {
        let column = match expression {
            SqlExpression::Property { owner, name } => {
                let table = statement.tables.find(owner)?;
                Column::new(name.clone(), table.name.clone())
            }
            SqlExpression::Identifier(name) => {
                Column::new(name.clone(), statement.tables.single_table_name()?)
            }
            _ => return None,
        };
        if self.sharding_rule.is_sharding_column(&column) {
            Some(column)
        } else {
            None
        }
    }

    /// Remember the alias a select list gives the row-number pseudo column
    pub fn set_row_number_alias(&mut self, alias: String) {
        self.row_number_alias = Some(alias);
    }

    pub fn is_row_number_column(&self, column_label: &str) -> bool {
        let is_pseudo_column = self
            .database_type()
            .row_number_column()
            .map(|c| c.eq_ignore_ascii_case(column_label))
            .unwrap_or(false);
        let is_alias = self
            .row_number_alias
            .as_deref()
            .map(|a| a.eq_ignore_ascii_case(column_label))
            .unwrap_or(false);
        is_pseudo_column || is_alias
    }

    /// `ROWNUM <= n` bounds the row count, `ROWNUM > n` the offset
    fn parse_row_number_condition(&mut self, statement: &mut SqlStatement) -> Result<()> {
        let symbol = self.token().token_type;
        self.next();
        let begin_position = self.token().begin_position;
        let expression = self.parse_expression(statement);
        let value = match expression {
            SqlExpression::Number(number) => match number.as_i64() {
                Some(n) => LimitValue::literal(n),
                None => return Ok(()),
            },
            SqlExpression::Placeholder(index) => LimitValue::placeholder(index),
            _ => return Ok(()),
        };
        let length = self.last_end_position() - begin_position;
        let limit = statement.limit.get_or_insert_with(|| Limit::new(false));
        match symbol {
            TokenType::Symbol(Symbol::Lt) | TokenType::Symbol(Symbol::LtEq) => {
                limit.row_count = Some(value);
                if value.parameter_index.is_none() {
                    statement.sql_tokens.push(SqlToken::RowCount {
                        begin_position,
                        length,
                        row_count: value.value,
                    });
                }
            }
            _ => {
                limit.offset = Some(value);
                if value.parameter_index.is_none() {
                    statement.sql_tokens.push(SqlToken::Offset {
                        begin_position,
                        length,
                        offset: value.value,
                    });
                }
            }
        }
        Ok(())
    }

    /// One LIMIT operand: an integer literal or a placeholder.
    ///
    /// # Returns
    /// The operand and its source span
    pub fn parse_limit_value(&mut self) -> Result<(LimitValue, Range<usize>)> {
        let span = self.token().begin_position..self.token().end_position;
        if self.is(Literal::Int) {
            let value = self
                .token()
                .literals
                .parse::<i64>()
                .map_err(|e| ShardingError::Parsing(format!("Invalid LIMIT value '{}': {}", self.token().literals, e)))?;
            if value < 0 {
                return Err(ShardingError::Parsing(
                    "LIMIT offset and row count can not be a negative value.".to_string(),
                ));
            }
            self.next();
            return Ok((LimitValue::literal(value), span));
        }
        if self.is(Symbol::Question) {
            let index = self.increase_parameters_index();
            self.next();
            return Ok((LimitValue::placeholder(index), span));
        }
        Err(self.syntax_error("LIMIT value"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::order_rule;
    use crate::models::ShardingOperator;

    fn order_statement() -> SqlStatement {
        let mut statement = SqlStatement::new(StatementKind::Select);
        statement.tables.add(Table::new("t_order", Some("o".to_string())));
        statement
    }

    #[test]
    fn test_parse_expression_kinds() {
        let rule = order_rule();
        let mut statement = order_statement();
        let mut parser = SqlParser::new("? 'a' 10 1.5 0x10 user_id o.user_id a + b f(x) ?", DatabaseType::MySQL, &rule);
        assert_eq!(parser.parse_expression(&mut statement), SqlExpression::Placeholder(0));
        assert_eq!(parser.parse_expression(&mut statement), SqlExpression::Text("a".to_string()));
        assert_eq!(parser.parse_expression(&mut statement), SqlExpression::Number(SqlValue::Int(10)));
        assert_eq!(parser.parse_expression(&mut statement), SqlExpression::Number(SqlValue::Float(1.5)));
        assert_eq!(parser.parse_expression(&mut statement), SqlExpression::Number(SqlValue::Int(16)));
        assert_eq!(
            parser.parse_expression(&mut statement),
            SqlExpression::Identifier("user_id".to_string())
        );
        assert_eq!(
            parser.parse_expression(&mut statement),
            SqlExpression::Property {
                owner: "o".to_string(),
                name: "user_id".to_string()
            }
        );
        assert_eq!(parser.parse_expression(&mut statement), SqlExpression::Ignore);
        assert_eq!(parser.parse_expression(&mut statement), SqlExpression::Ignore);
        assert_eq!(parser.parse_expression(&mut statement), SqlExpression::Placeholder(1));
        // the alias owner is not a table name, so nothing to rewrite
        assert!(statement.sql_tokens.is_empty());
    }

    #[test]
    fn test_property_owner_marked_for_rewrite() {
        let rule = order_rule();
        let mut statement = order_statement();
        let mut parser = SqlParser::new("t_order.user_id", DatabaseType::MySQL, &rule);
        parser.parse_expression(&mut statement);
        assert_eq!(
            statement.sql_tokens,
            vec![SqlToken::Table {
                begin_position: 0,
                original_literals: "t_order".to_string()
            }]
        );
    }

    #[test]
    fn test_skip_parentheses_counts_placeholders() {
        let rule = order_rule();
        let mut parser = SqlParser::new("(a, (?, ?)) x", DatabaseType::MySQL, &rule);
        assert_eq!(parser.skip_parentheses(), "(a, (?, ?))");
        assert_eq!(parser.parameters_index(), 2);
        assert_eq!(parser.token().literals, "x");
    }

    #[test]
    fn test_parse_alias() {
        let rule = order_rule();
        let mut parser = SqlParser::new("AS `total` cnt FROM", DatabaseType::MySQL, &rule);
        assert_eq!(parser.parse_alias(), Some("total".to_string()));
        assert_eq!(parser.parse_alias(), Some("cnt".to_string()));
        assert_eq!(parser.parse_alias(), None);
    }

    #[test]
    fn test_where_conditions() {
        let rule = order_rule();
        let mut statement = SqlStatement::new(StatementKind::Select);
        statement.tables.add(Table::new("t_order", None));
        let sql = "WHERE user_id = ? AND (order_id IN (1, 2)) AND status = 'x' AND remark IS NOT NULL";
        let mut parser = SqlParser::new(sql, DatabaseType::MySQL, &rule);
        parser.parse_where(&mut statement).unwrap();

        assert_eq!(statement.conditions.len(), 2);
        let user = statement.conditions.find("user_id", "t_order").unwrap();
        assert_eq!(user.expressions, vec![SqlExpression::Placeholder(0)]);
        let order = statement.conditions.find("order_id", "t_order").unwrap();
        assert_eq!(order.operator, ShardingOperator::In);
        assert_eq!(order.expressions.len(), 2);
        assert!(parser.token().is_end());
    }

    #[test]
    fn test_where_between_and_skipped_predicates() {
        let rule = order_rule();
        let mut statement = order_statement();
        let sql = "WHERE o.status NOT BETWEEN 1 AND 2 AND o.order_id BETWEEN ? AND ? AND o.user_id > 3 ORDER BY x";
        let mut parser = SqlParser::new(sql, DatabaseType::MySQL, &rule);
        parser.parse_where(&mut statement).unwrap();

        assert_eq!(statement.conditions.len(), 1);
        let order = statement.conditions.find("order_id", "t_order").unwrap();
        assert_eq!(order.operator, ShardingOperator::Between);
        assert_eq!(parser.parameters_index(), 2);
        assert!(parser.is(Keyword::Order));
    }

    #[test]
    fn test_where_rejects_or() {
        let rule = order_rule();
        for sql in [
            "WHERE user_id = 1 OR order_id = 2",
            "WHERE user_id = 1 AND (status = 'a' OR status = 'b')",
            "WHERE NOT (user_id = 1 OR user_id = 2)",
        ] {
            let mut statement = order_statement();
            let mut parser = SqlParser::new(sql, DatabaseType::MySQL, &rule);
            let result = parser.parse_where(&mut statement);
            assert!(matches!(result, Err(ShardingError::UnsupportedSql(_))), "{}", sql);
        }
    }

    #[test]
    fn test_multi_table_needs_owner() {
        let rule = order_rule();
        let mut statement = order_statement();
        statement.tables.add(Table::new("t_order_item", Some("i".to_string())));
        let mut parser = SqlParser::new("WHERE user_id = 1 AND i.order_id = 2 AND o.user_id = i.user_id", DatabaseType::MySQL, &rule);
        parser.parse_where(&mut statement).unwrap();

        assert_eq!(statement.conditions.len(), 1);
        assert!(statement.conditions.find("order_id", "t_order_item").is_some());
    }

    #[test]
    fn test_single_table_rejects_join() {
        let rule = order_rule();
        let mut statement = SqlStatement::new(StatementKind::Update);
        let mut parser = SqlParser::new("t_order o JOIN t_order_item i", DatabaseType::MySQL, &rule);
        assert!(matches!(
            parser.parse_single_table(&mut statement),
            Err(ShardingError::UnsupportedSql(_))
        ));
    }

    #[test]
    fn test_schema_qualified_table() {
        let rule = order_rule();
        let mut statement = SqlStatement::new(StatementKind::Delete);
        let mut parser = SqlParser::new("db.`t_order` WHERE", DatabaseType::MySQL, &rule);
        parser.parse_single_table(&mut statement).unwrap();
        assert_eq!(statement.tables.single_table_name(), Some("t_order"));
        assert_eq!(
            statement.sql_tokens,
            vec![SqlToken::Table {
                begin_position: 3,
                original_literals: "`t_order`".to_string()
            }]
        );
    }

    #[test]
    fn test_limit_value() {
        let rule = order_rule();
        let mut parser = SqlParser::new("10 ? x", DatabaseType::MySQL, &rule);
        assert_eq!(parser.parse_limit_value().unwrap(), (LimitValue::literal(10), 0..2));
        assert_eq!(parser.parse_limit_value().unwrap(), (LimitValue::placeholder(0), 3..4));
        assert!(parser.parse_limit_value().is_err());

        let mut parser = SqlParser::new("007", DatabaseType::MySQL, &rule);
        assert_eq!(parser.parse_limit_value().unwrap(), (LimitValue::literal(7), 0..3));
        let mut parser = SqlParser::new("x", DatabaseType::MySQL, &rule);
        assert!(parser.parse_limit_value().is_err());
    }
}
