// INSERT Parser
//
// Single-row INSERT with a column list and VALUES, or the MySQL SET form.
// Sharding conditions come from column/value pairs. When the table has a
// generated key column that the statement omits, the key is appended as an
// extra column: a `?` for prepared statements, a freshly generated literal
// otherwise. The added `?` sits right after the last VALUES placeholder, so
// its index is the number of placeholders seen up to there.

use crate::error::{Result, ShardingError};
use crate::models::{
    unquote_identifier, Column, Condition, GeneratedKey, SqlExpression, SqlStatement, SqlToken, SqlValue,
    StatementKind,
};

use super::parser::SqlParser;
use super::token::{Keyword, Symbol};

/// Parse an INSERT; `parameters_size` is the number of bound parameters
pub fn parse(parser: &mut SqlParser<'_>, parameters_size: usize) -> Result<SqlStatement> {
    let mut statement = SqlStatement::new(StatementKind::Insert);
    parser.accept(Keyword::Insert)?;
    parser.skip_if_any(&[Keyword::LowPriority.into(), Keyword::Ignore.into()]);
    parser.skip_if(Keyword::Into);
    parser.parse_single_table(&mut statement)?;
    let table_name = statement.tables.single_table_name().unwrap_or_default().to_string();

    let columns_end = parse_columns(parser, &mut statement, &table_name)?;
    let mut values = Vec::new();
    let mut values_end = None;
    let mut values_parameters = 0;
    if parser.skip_if_any(&[Keyword::Values.into(), Keyword::Value.into()]) {
        parser.accept(Symbol::LeftParen)?;
        loop {
            values.push(parser.parse_expression(&mut statement));
            if parser.is(Symbol::RightParen) {
                values_end = Some(parser.token().begin_position);
                values_parameters = parser.parameters_index();
                parser.next();
                break;
            }
            parser.accept(Symbol::Comma)?;
        }
        if parser.is(Symbol::Comma) {
            return Err(ShardingError::UnsupportedSql(
                "Cannot support multiple-row INSERT".to_string(),
            ));
        }
        if statement.insert_columns.len() != values.len() && !statement.insert_columns.is_empty() {
            return Err(ShardingError::Parsing(format!(
                "Column count {} does not match value count {}",
                statement.insert_columns.len(),
                values.len()
            )));
        }
    } else if parser.is(Keyword::Select) || parser.is(Symbol::LeftParen) {
        return Err(ShardingError::UnsupportedSql("Cannot support INSERT ... SELECT".to_string()));
    } else if parser.skip_if(Keyword::Set) {
        loop {
            let column = parse_column(parser, &table_name)?;
            parser.accept(Symbol::Eq)?;
            statement.insert_columns.push(column);
            values.push(parser.parse_expression(&mut statement));
            if !parser.skip_if(Symbol::Comma) {
                break;
            }
        }
    } else {
        return Err(parser.syntax_error("VALUES"));
    }
    // ON DUPLICATE KEY UPDATE and the like do not affect routing
    parser.skip_until(&[Symbol::Semi.into()]);

    let rule = parser.sharding_rule();
    for (column, value) in statement.insert_columns.iter().zip(values.iter()) {
        if value.is_value() && rule.is_sharding_column(column) {
            statement.conditions.add(Condition::equal(column.clone(), value.clone()));
        }
    }

    let Some(key_column) = rule.generate_key_column(&table_name) else {
        return Ok(statement);
    };
    let position = statement
        .insert_columns
        .iter()
        .position(|c| c.name.eq_ignore_ascii_case(key_column));
    if let Some(i) = position {
        let (parameter_index, value) = match values.get(i) {
            Some(SqlExpression::Placeholder(index)) => (Some(*index), None),
            Some(SqlExpression::Number(number)) => (None, number.as_i64()),
            _ => (None, None),
        };
        statement.generated_key = Some(GeneratedKey {
            column: key_column.to_string(),
            parameter_index,
            value,
            deferred: false,
        });
        return Ok(statement);
    }
    let (Some(columns_end), Some(values_end)) = (columns_end, values_end) else {
        return Ok(statement);
    };

    let column = Column::new(key_column, table_name.as_str());
    statement.sql_tokens.push(SqlToken::Items {
        begin_position: columns_end,
        items: vec![key_column.to_string()],
    });
    let (generated_key, expression) = if parameters_size > 0 {
        statement.sql_tokens.push(SqlToken::Items {
            begin_position: values_end,
            items: vec!["?".to_string()],
        });
        (
            GeneratedKey {
                column: key_column.to_string(),
                parameter_index: Some(values_parameters),
                value: None,
                deferred: true,
            },
            SqlExpression::Placeholder(values_parameters),
        )
    } else {
        let key = rule.generate_key(&table_name)?;
        tracing::debug!("Generated key {} for {}.{}", key, table_name, key_column);
        statement.sql_tokens.push(SqlToken::Items {
            begin_position: values_end,
            items: vec![key.to_string()],
        });
        (
            GeneratedKey {
                column: key_column.to_string(),
                parameter_index: None,
                value: Some(key),
                deferred: false,
            },
            SqlExpression::Number(SqlValue::Int(key)),
        )
    };
    if rule.is_sharding_column(&column) {
        statement.conditions.add(Condition::equal(column.clone(), expression));
    }
    statement.generated_key = Some(generated_key);
    statement.insert_columns.push(column);
    Ok(statement)
}

/// Column list in parentheses.
///
/// # Returns
/// Offset of the closing parenthesis, where extra columns are inserted
fn parse_columns(parser: &mut SqlParser<'_>, statement: &mut SqlStatement, table_name: &str) -> Result<Option<usize>> {
    if !parser.skip_if(Symbol::LeftParen) {
        return Ok(None);
    }
    if parser.is(Keyword::Select) {
        return Err(ShardingError::UnsupportedSql("Cannot support INSERT ... SELECT".to_string()));
    }
    loop {
        statement.insert_columns.push(parse_column(parser, table_name)?);
        if parser.is(Symbol::RightParen) {
            let end = parser.token().begin_position;
            parser.next();
            return Ok(Some(end));
        }
        parser.accept(Symbol::Comma)?;
    }
}

fn parse_column(parser: &mut SqlParser<'_>, table_name: &str) -> Result<Column> {
    if !parser.is_name() {
        return Err(parser.syntax_error("column name"));
    }
    let mut literals = parser.raw_literals();
    parser.next();
    if parser.skip_if(Symbol::Dot) {
        literals = parser.raw_literals();
        parser.next();
    }
    Ok(Column::new(unquote_identifier(literals), table_name))
}
