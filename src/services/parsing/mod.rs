// SQL Parsing
//
// Entry points of the parsing layer. `SqlParsingEngine` turns one logical
// SQL into a `SqlStatement` for routing and rewriting; `SqlJudgeEngine`
// only classifies a statement, for the hint router which never rewrites.

pub mod dialect;
pub mod lexer;
pub mod parser;
pub mod token;

mod ddl;
mod dml;
mod insert;
mod select;

pub use dialect::DatabaseType;
pub use lexer::Lexer;
pub use parser::SqlParser;
pub use token::{Keyword, Literal, Symbol, Token, TokenType};

use crate::error::{Result, ShardingError};
use crate::models::{ShardingRule, SqlStatement, StatementKind};

/// Full parser over one logical SQL
pub struct SqlParsingEngine<'a> {
    database_type: DatabaseType,
    sql: &'a str,
    sharding_rule: &'a ShardingRule,
}

impl<'a> SqlParsingEngine<'a> {
    pub fn new(database_type: DatabaseType, sql: &'a str, sharding_rule: &'a ShardingRule) -> Self {
        Self {
            database_type,
            sql,
            sharding_rule,
        }
    }

    /// Parse the statement.
    ///
    /// # Arguments
    /// * `parameters_size` - Number of bound parameters; a non-zero count makes
    ///   INSERT key generation deferred to a `?`
    ///
    /// # Errors
    /// Syntax errors, unsupported constructs (OR, subqueries, HAVING, ...) and
    /// statements other than SELECT/INSERT/UPDATE/DELETE/CREATE/ALTER/DROP/TRUNCATE
    pub fn parse(&self, parameters_size: usize) -> Result<SqlStatement> {
        let mut parser = SqlParser::new(self.sql, self.database_type, self.sharding_rule);
        while parser.skip_if(Symbol::Semi) {}
        skip_with_clause(&mut parser)?;
        let statement = match parser.token().token_type {
            TokenType::Keyword(Keyword::Select) => select::parse(&mut parser)?,
            TokenType::Keyword(Keyword::Insert) => insert::parse(&mut parser, parameters_size)?,
            TokenType::Keyword(Keyword::Update) => dml::parse_update(&mut parser)?,
            TokenType::Keyword(Keyword::Delete) => dml::parse_delete(&mut parser)?,
            TokenType::Keyword(Keyword::Create) => ddl::parse_create(&mut parser)?,
            TokenType::Keyword(Keyword::Alter) => ddl::parse_alter(&mut parser)?,
            TokenType::Keyword(Keyword::Drop) => ddl::parse_drop(&mut parser)?,
            TokenType::Keyword(Keyword::Truncate) => ddl::parse_truncate(&mut parser)?,
            _ => {
                return Err(ShardingError::UnsupportedSql(format!(
                    "Unsupported SQL statement: [{}]",
                    self.sql
                )))
            }
        };
        tracing::debug!(
            "Parsed {} on tables {:?} with {} sharding conditions",
            statement.kind.as_str(),
            statement.tables.table_names(),
            statement.conditions.len()
        );
        Ok(statement)
    }
}

/// `WITH name [(columns)] AS (...) [, ...]`; CTE bodies are not analysed
fn skip_with_clause(parser: &mut SqlParser<'_>) -> Result<()> {
    if !parser.skip_if(Keyword::With) {
        return Ok(());
    }
    loop {
        if !parser.is_name() {
            return Err(parser.syntax_error("CTE name"));
        }
        parser.next();
        parser.skip_parentheses();
        parser.accept(Keyword::As)?;
        if !parser.is(Symbol::LeftParen) {
            return Err(parser.syntax_error("'('"));
        }
        parser.skip_parentheses();
        if !parser.skip_if(Symbol::Comma) {
            return Ok(());
        }
    }
}

/// Lexer-only classification of a statement
pub struct SqlJudgeEngine<'a> {
    database_type: DatabaseType,
    sql: &'a str,
}

impl<'a> SqlJudgeEngine<'a> {
    pub fn new(database_type: DatabaseType, sql: &'a str) -> Self {
        Self { database_type, sql }
    }

    /// Statement with only its kind set
    pub fn judge(&self) -> Result<SqlStatement> {
        let mut lexer = Lexer::new(self.sql, self.database_type);
        loop {
            let token_type = lexer.current_token().token_type;
            let kind = match token_type {
                TokenType::Keyword(Keyword::Select) => StatementKind::Select,
                TokenType::Keyword(Keyword::Insert) => StatementKind::Insert,
                TokenType::Keyword(Keyword::Update) => StatementKind::Update,
                TokenType::Keyword(Keyword::Delete) => StatementKind::Delete,
                TokenType::Keyword(Keyword::Create) => StatementKind::Create,
                TokenType::Keyword(Keyword::Alter) => StatementKind::Alter,
                TokenType::Keyword(Keyword::Drop) => StatementKind::Drop,
                TokenType::Keyword(Keyword::Truncate) => StatementKind::Truncate,
                TokenType::Assist(_) => {
                    return Err(ShardingError::UnsupportedSql(format!(
                        "Unsupported SQL statement: [{}]",
                        self.sql
                    )))
                }
                _ => {
                    lexer.next_token();
                    continue;
                }
            };
            return Ok(SqlStatement::new(kind));
        }
    }
}
