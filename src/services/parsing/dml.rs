// UPDATE and DELETE Parsers
//
// Both statements address exactly one table; joins and multi-table forms
// are rejected so every routed statement stays self-contained.

use crate::error::{Result, ShardingError};
use crate::models::{SqlStatement, StatementKind};

use super::parser::SqlParser;
use super::token::{Keyword, Symbol, TokenType};

const ASSIGNMENT_TERMINATORS: [TokenType; 4] = [
    TokenType::Symbol(Symbol::Comma),
    TokenType::Keyword(Keyword::Where),
    TokenType::Keyword(Keyword::Order),
    TokenType::Keyword(Keyword::Limit),
];

pub fn parse_update(parser: &mut SqlParser<'_>) -> Result<SqlStatement> {
    let mut statement = SqlStatement::new(StatementKind::Update);
    parser.accept(Keyword::Update)?;
    parser.skip_if_any(&[Keyword::LowPriority.into(), Keyword::Ignore.into(), Keyword::Only.into()]);
    skip_top(parser)?;
    parser.parse_single_table(&mut statement)?;
    parser.accept(Keyword::Set)?;
    loop {
        parser.parse_expression(&mut statement);
        parser.accept(Symbol::Eq)?;
        parser.parse_expression(&mut statement);
        skip_rest_of_assignment(parser);
        if !parser.skip_if(Symbol::Comma) {
            break;
        }
    }
    if parser.is(Keyword::From) {
        return Err(ShardingError::UnsupportedSql("Cannot support Multiple-Table.".to_string()));
    }
    parser.parse_where(&mut statement)?;
    Ok(statement)
}

pub fn parse_delete(parser: &mut SqlParser<'_>) -> Result<SqlStatement> {
    let mut statement = SqlStatement::new(StatementKind::Delete);
    parser.accept(Keyword::Delete)?;
    parser.skip_if_any(&[Keyword::LowPriority.into(), Keyword::Quick.into(), Keyword::Ignore.into()]);
    skip_top(parser)?;
    parser.skip_if(Keyword::From);
    parser.skip_if(Keyword::Only);
    parser.parse_single_table(&mut statement)?;
    if parser.is_any(&[Keyword::From.into(), Keyword::Using.into()]) {
        return Err(ShardingError::UnsupportedSql("Cannot support Multiple-Table.".to_string()));
    }
    parser.parse_where(&mut statement)?;
    Ok(statement)
}

/// SQL Server `TOP n` / `TOP (n)`
fn skip_top(parser: &mut SqlParser<'_>) -> Result<()> {
    if !parser.skip_if(Keyword::Top) {
        return Ok(());
    }
    let has_parentheses = parser.skip_if(Symbol::LeftParen);
    parser.parse_limit_value()?;
    if has_parentheses {
        parser.accept(Symbol::RightParen)?;
    }
    Ok(())
}

/// Assigned values such as `CASE ... END` are not single expressions
fn skip_rest_of_assignment(parser: &mut SqlParser<'_>) {
    while !parser.is_end() && !parser.is_any(&ASSIGNMENT_TERMINATORS) {
        if parser.is(Symbol::LeftParen) {
            parser.skip_parentheses();
            continue;
        }
        if parser.is(Symbol::Question) {
            parser.increase_parameters_index();
        }
        parser.next();
    }
}
