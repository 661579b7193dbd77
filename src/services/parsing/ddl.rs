// DDL Parsers
//
// CREATE, ALTER, DROP and TRUNCATE only need the table names; the rest of
// the statement is carried through untouched apart from table renaming.

use crate::error::Result;
use crate::models::{SqlStatement, StatementKind, Table};

use super::parser::SqlParser;
use super::token::{Keyword, Symbol};

pub fn parse_create(parser: &mut SqlParser<'_>) -> Result<SqlStatement> {
    let mut statement = SqlStatement::new(StatementKind::Create);
    parser.accept(Keyword::Create)?;
    parser.skip_if(Keyword::Temporary);
    accept_table(parser)?;
    if parser.skip_if(Keyword::If) {
        parser.accept(Keyword::Not)?;
        parser.accept(Keyword::Exists)?;
    }
    parse_table(parser, &mut statement)?;
    parser.skip_until(&[Symbol::Semi.into()]);
    Ok(statement)
}

pub fn parse_alter(parser: &mut SqlParser<'_>) -> Result<SqlStatement> {
    let mut statement = SqlStatement::new(StatementKind::Alter);
    parser.accept(Keyword::Alter)?;
    accept_table(parser)?;
    parser.skip_if(Keyword::Only);
    parse_table(parser, &mut statement)?;
    parser.skip_until(&[Symbol::Semi.into()]);
    Ok(statement)
}

pub fn parse_drop(parser: &mut SqlParser<'_>) -> Result<SqlStatement> {
    let mut statement = SqlStatement::new(StatementKind::Drop);
    parser.accept(Keyword::Drop)?;
    parser.skip_if(Keyword::Temporary);
    accept_table(parser)?;
    if parser.skip_if(Keyword::If) {
        parser.accept(Keyword::Exists)?;
    }
    loop {
        parse_table(parser, &mut statement)?;
        if !parser.skip_if(Symbol::Comma) {
            break;
        }
    }
    parser.skip_until(&[Symbol::Semi.into()]);
    Ok(statement)
}

pub fn parse_truncate(parser: &mut SqlParser<'_>) -> Result<SqlStatement> {
    let mut statement = SqlStatement::new(StatementKind::Truncate);
    parser.accept(Keyword::Truncate)?;
    parser.skip_if(Keyword::Table);
    parse_table(parser, &mut statement)?;
    parser.skip_until(&[Symbol::Semi.into()]);
    Ok(statement)
}

/// Only TABLE objects are sharded; indexes, views and the like are not
fn accept_table(parser: &mut SqlParser<'_>) -> Result<()> {
    if parser.skip_if(Keyword::Table) {
        return Ok(());
    }
    Err(parser.unsupported())
}

fn parse_table(parser: &mut SqlParser<'_>, statement: &mut SqlStatement) -> Result<()> {
    let name = parser.parse_table_name(statement)?;
    statement.tables.add(Table::new(name, None));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ShardingError;
    use crate::fixtures::order_rule;
    use crate::models::SqlToken;
    use crate::services::parsing::DatabaseType;

    #[test]
    fn test_create_table() {
        let rule = order_rule();
        let sql = "CREATE TABLE IF NOT EXISTS t_order (order_id BIGINT, user_id INT, PRIMARY KEY (order_id))";
        let mut parser = SqlParser::new(sql, DatabaseType::MySQL, &rule);
        let statement = parse_create(&mut parser).unwrap();
        assert_eq!(statement.tables.single_table_name(), Some("t_order"));
        assert_eq!(
            statement.sql_tokens,
            vec![SqlToken::Table {
                begin_position: sql.find("t_order").unwrap(),
                original_literals: "t_order".to_string()
            }]
        );
        assert!(parser.token().is_end());
    }

    #[test]
    fn test_drop_multiple_tables() {
        let rule = order_rule();
        let mut parser = SqlParser::new("DROP TABLE IF EXISTS t_order, t_order_item", DatabaseType::MySQL, &rule);
        let statement = parse_drop(&mut parser).unwrap();
        assert_eq!(statement.tables.table_names(), vec!["t_order", "t_order_item"]);
    }

    #[test]
    fn test_alter_and_truncate() {
        let rule = order_rule();
        let mut parser = SqlParser::new("ALTER TABLE t_order ADD COLUMN remark VARCHAR(10)", DatabaseType::MySQL, &rule);
        assert_eq!(parse_alter(&mut parser).unwrap().kind, StatementKind::Alter);

        let mut parser = SqlParser::new("TRUNCATE TABLE t_order", DatabaseType::MySQL, &rule);
        let statement = parse_truncate(&mut parser).unwrap();
        assert_eq!(statement.tables.single_table_name(), Some("t_order"));
    }

    #[test]
    fn test_create_index_unsupported() {
        let rule = order_rule();
        let mut parser = SqlParser::new("CREATE INDEX idx_user ON t_order (user_id)", DatabaseType::MySQL, &rule);
        assert!(matches!(parse_create(&mut parser), Err(ShardingError::UnsupportedSql(_))));
    }
}
