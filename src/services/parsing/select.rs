// SELECT Parser
//
// Parses select lists, FROM clauses with joins and derived tables, GROUP BY,
// ORDER BY and the dialect pagination forms. Once the whole statement is
// known it appends the derived columns and the derived ORDER BY needed to
// merge results from several shards.

use std::ops::Range;

use crate::error::{Result, ShardingError};
use crate::models::{
    unquote_identifier, AggregationType, Limit, LimitValue, OrderItem, OrderType, SelectItem, SqlExpression,
    SqlStatement, SqlToken, StatementKind, Table,
};

use super::parser::SqlParser;
use super::token::{Keyword, Literal, Symbol, TokenType};

const ITEM_TERMINATORS: [TokenType; 16] = [
    TokenType::Symbol(Symbol::Comma),
    TokenType::Symbol(Symbol::RightParen),
    TokenType::Keyword(Keyword::As),
    TokenType::Keyword(Keyword::From),
    TokenType::Keyword(Keyword::Into),
    TokenType::Keyword(Keyword::Where),
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
];

const SET_OPERATORS: [TokenType; 4] = [
    TokenType::Keyword(Keyword::Union),
    TokenType::Keyword(Keyword::Intersect),
    TokenType::Keyword(Keyword::Except),
    TokenType::Keyword(Keyword::Minus),
];

struct SelectContext {
    statement: SqlStatement,
    /// `owner.` prefixes of select items, marked once every table is known
    pending_owners: Vec<(usize, String)>,
    select_list_end: Option<usize>,
    group_by_end: Option<usize>,
}

/// Parse a SELECT statement; the parser stands on the SELECT keyword
pub fn parse(parser: &mut SqlParser<'_>) -> Result<SqlStatement> {
    let mut context = SelectContext {
        statement: SqlStatement::new(StatementKind::Select),
        pending_owners: Vec::new(),
        select_list_end: None,
        group_by_end: None,
    };
    parse_query(parser, &mut context, 0)?;
    resolve_pending_owners(&mut context);
    append_derived_columns(&mut context);
    append_derived_order_by(&mut context);
    Ok(context.statement)
}

fn parse_query(parser: &mut SqlParser<'_>, context: &mut SelectContext, depth: usize) -> Result<()> {
    parser.accept(Keyword::Select)?;
    if parser.skip_if_any(&[Keyword::Distinct.into(), Keyword::DistinctRow.into()]) {
        if depth == 0 {
            context.statement.distinct = true;
        }
    } else {
        parser.skip_if(Keyword::All);
    }
    if parser.is(Keyword::Top) {
        parse_top(parser, context)?;
    }
    parse_select_list(parser, context, depth)?;
    parse_from(parser, context, depth)?;
    parser.parse_where(&mut context.statement)?;
    parse_group_by(parser, context, depth)?;
    if parser.is(Keyword::Having) {
        return Err(ShardingError::UnsupportedSql("Cannot support HAVING".to_string()));
    }
    parse_order_by(parser, context, depth)?;
    parse_limit(parser, context)?;
    if parser.is_any(&SET_OPERATORS) {
        return Err(ShardingError::UnsupportedSql(format!(
            "Cannot support {}",
            parser.token().literals.to_uppercase()
        )));
    }
    skip_lock_clause(parser);
    Ok(())
}

fn parse_select_list(parser: &mut SqlParser<'_>, context: &mut SelectContext, depth: usize) -> Result<()> {
    loop {
        parse_select_item(parser, context, depth)?;
        if !parser.skip_if(Symbol::Comma) {
            break;
        }
    }
    if depth == 0 {
        context.select_list_end = Some(parser.last_end_position());
    }
    Ok(())
}

fn parse_select_item(parser: &mut SqlParser<'_>, context: &mut SelectContext, depth: usize) -> Result<()> {
    let begin_position = parser.token().begin_position;
    if parser.skip_if(Symbol::Star) {
        if depth == 0 {
            context.statement.contains_star = true;
            context.statement.items.push(SelectItem::Star { owner: None });
        }
        return Ok(());
    }

    let mut aggregation = None;
    let mut operand = false;
    if parser.is_identifier() {
        let first_literals = parser.raw_literals();
        parser.next();
        operand = true;
        if parser.is(Symbol::LeftParen) {
            let arguments = parser.skip_parentheses();
            aggregation =
                AggregationType::from_name(&unquote_identifier(first_literals)).map(|t| (t, arguments));
        } else if parser.skip_if(Symbol::Dot) {
            context.pending_owners.push((begin_position, first_literals.to_string()));
            if parser.skip_if(Symbol::Star) {
                if depth == 0 {
                    context.statement.contains_star = true;
                    context.statement.items.push(SelectItem::Star {
                        owner: Some(unquote_identifier(first_literals)),
                    });
                }
                return Ok(());
            }
            parser.next();
        }
    }
    let first_end = parser.last_end_position();
    skip_rest_of_item(parser, operand)?;
    let expression_end = parser.last_end_position();
    let expression = parser
        .input()
        .get(begin_position..expression_end)
        .map(|text| unquote_identifier(text.trim()))
        .unwrap_or_default();
    let alias = parser.parse_alias();

    let is_row_number = parser
        .database_type()
        .row_number_column()
        .map(|c| c.eq_ignore_ascii_case(&expression))
        .unwrap_or(false);
    if let (true, Some(alias)) = (is_row_number, &alias) {
        parser.set_row_number_alias(alias.clone());
    }
    if depth > 0 {
        return Ok(());
    }
    let item = match aggregation {
        Some((aggregation_type, inner_expression)) if expression_end == first_end => SelectItem::Aggregation {
            aggregation_type,
            inner_expression,
            alias,
        },
        _ => SelectItem::Common { expression, alias },
    };
    context.statement.items.push(item);
    Ok(())
}

/// Consume the rest of a select item up to its end or its bare alias;
/// `operand` tells whether the previous token closed an operand
fn skip_rest_of_item(parser: &mut SqlParser<'_>, mut operand: bool) -> Result<()> {
    loop {
        if parser.is_end() || parser.is_any(&ITEM_TERMINATORS) {
            return Ok(());
        }
        match parser.token().token_type {
            TokenType::Symbol(Symbol::LeftParen) => {
                parser.skip_parentheses();
                operand = true;
                continue;
            }
            TokenType::Symbol(Symbol::Question) => {
                parser.increase_parameters_index();
                operand = true;
            }
            _ if parser.is_name() => {
                if operand {
                    return Ok(());
                }
                operand = true;
            }
            TokenType::Literal(_) | TokenType::Keyword(Keyword::End) | TokenType::Keyword(Keyword::Null) => {
                operand = true;
            }
            TokenType::Assist(_) => return Err(parser.syntax_error("select item")),
            _ => operand = false,
        }
        parser.next();
    }
}

fn parse_top(parser: &mut SqlParser<'_>, context: &mut SelectContext) -> Result<()> {
    parser.next();
    let has_parentheses = parser.skip_if(Symbol::LeftParen);
    let (row_count, span) = parser.parse_limit_value()?;
    if has_parentheses {
        parser.accept(Symbol::RightParen)?;
    }
    let limit = context.statement.limit.get_or_insert_with(|| Limit::new(false));
    limit.row_count = Some(row_count);
    if row_count.parameter_index.is_none() {
        context.statement.sql_tokens.push(SqlToken::RowCount {
            begin_position: span.start,
            length: span.len(),
            row_count: row_count.value,
        });
    }
    Ok(())
}

fn parse_from(parser: &mut SqlParser<'_>, context: &mut SelectContext, depth: usize) -> Result<()> {
    if !parser.skip_if(Keyword::From) {
        return Ok(());
    }
    parse_table_reference(parser, context, depth)?;
    while parser.skip_join()? {
        parse_table_reference(parser, context, depth)?;
        parse_join_condition(parser, context);
    }
    Ok(())
}

fn parse_table_reference(parser: &mut SqlParser<'_>, context: &mut SelectContext, depth: usize) -> Result<()> {
    if parser.skip_if(Symbol::LeftParen) {
        if parser.is(Keyword::Select) {
            parse_query(parser, context, depth + 1)?;
            parser.accept(Symbol::RightParen)?;
            parser.parse_alias();
            return Ok(());
        }
        let name = parser.parse_table_name(&mut context.statement)?;
        let inner_alias = parser.parse_alias();
        parser.accept(Symbol::RightParen)?;
        let alias = inner_alias.or_else(|| parser.parse_alias());
        context.statement.tables.add(Table::new(name, alias));
        return Ok(());
    }
    let name = parser.parse_table_name(&mut context.statement)?;
    let alias = parser.parse_alias();
    context.statement.tables.add(Table::new(name, alias));
    Ok(())
}

/// ON conditions only contribute table markers; USING lists are skipped
fn parse_join_condition(parser: &mut SqlParser<'_>, context: &mut SelectContext) {
    if parser.skip_if(Keyword::On) {
        loop {
            parser.parse_expression(&mut context.statement);
            if parser.skip_if_any(&[
                Symbol::Eq.into(),
                Symbol::Lt.into(),
                Symbol::Gt.into(),
                Symbol::LtEq.into(),
                Symbol::GtEq.into(),
                Symbol::LtGt.into(),
                Symbol::BangEq.into(),
            ]) {
                parser.parse_expression(&mut context.statement);
            }
            if !parser.skip_if(Keyword::And) {
                break;
            }
        }
    } else if parser.skip_if(Keyword::Using) {
        parser.skip_parentheses();
    }
}

fn parse_group_by(parser: &mut SqlParser<'_>, context: &mut SelectContext, depth: usize) -> Result<()> {
    if !parser.skip_if(Keyword::Group) {
        return Ok(());
    }
    parser.accept(Keyword::By)?;
    loop {
        let item = parse_order_item(parser, context);
        if let (0, Some(item)) = (depth, item) {
            context.statement.group_by_items.push(item);
        }
        if !parser.skip_if(Symbol::Comma) {
            break;
        }
    }
    if parser.skip_if(Keyword::With) {
        parser.skip_if(Keyword::Rollup);
    }
    if depth == 0 {
        context.group_by_end = Some(parser.last_end_position());
    }
    Ok(())
}

fn parse_order_by(parser: &mut SqlParser<'_>, context: &mut SelectContext, depth: usize) -> Result<()> {
    if !parser.skip_if(Keyword::Order) {
        return Ok(());
    }
    parser.accept(Keyword::By)?;
    loop {
        let item = parse_order_item(parser, context);
        if let (0, Some(item)) = (depth, item) {
            context.statement.order_by_items.push(item);
        }
        if !parser.skip_if(Symbol::Comma) {
            break;
        }
    }
    Ok(())
}

/// Columns, qualified columns and select list indexes; other expressions are skipped
fn parse_order_item(parser: &mut SqlParser<'_>, context: &mut SelectContext) -> Option<OrderItem> {
    let expression = parser.parse_expression(&mut context.statement);
    let order_type = if parser.skip_if(Keyword::Desc) {
        OrderType::Desc
    } else {
        parser.skip_if(Keyword::Asc);
        OrderType::Asc
    };
    if parser.skip_if(Keyword::Nulls) {
        parser.skip_if_any(&[Keyword::First.into(), Keyword::Last.into()]);
    }
    match expression {
        SqlExpression::Number(value) => match value.as_i64() {
            Some(index) if index > 0 => Some(OrderItem::with_index(index as usize, order_type)),
            _ => None,
        },
        SqlExpression::Identifier(name) => {
            let alias = find_item_alias(&context.statement, &name);
            Some(OrderItem::with_name(None, name, order_type, alias))
        }
        SqlExpression::Property { owner, name } => {
            let alias = find_item_alias(&context.statement, &format!("{}.{}", owner, name));
            Some(OrderItem::with_name(Some(owner), name, order_type, alias))
        }
        _ => None,
    }
}

fn find_item_alias(statement: &SqlStatement, expression: &str) -> Option<String> {
    statement
        .items
        .iter()
        .find(|item| item.expression().eq_ignore_ascii_case(expression))
        .and_then(|item| item.alias().map(str::to_string))
}

/// LIMIT, OFFSET and FETCH in whichever forms the dialect has keywords for
fn parse_limit(parser: &mut SqlParser<'_>, context: &mut SelectContext) -> Result<()> {
    let mut limit = Limit::new(true);
    let mut found = false;
    loop {
        if parser.skip_if(Keyword::Limit) {
            found = true;
            if parser.skip_if(Keyword::All) {
                continue;
            }
            let first = parser.parse_limit_value()?;
            if parser.skip_if(Symbol::Comma) {
                let second = parser.parse_limit_value()?;
                set_offset(context, &mut limit, first);
                set_row_count(context, &mut limit, second);
            } else {
                set_row_count(context, &mut limit, first);
            }
        } else if parser.skip_if(Keyword::Offset) {
            found = true;
            let offset = parser.parse_limit_value()?;
            set_offset(context, &mut limit, offset);
            parser.skip_if_any(&[Keyword::Row.into(), Keyword::Rows.into()]);
        } else if parser.skip_if(Keyword::Fetch) {
            found = true;
            parser.skip_if_any(&[Keyword::First.into(), Keyword::Next.into()]);
            if parser.is_any(&[Literal::Int.into(), Symbol::Question.into()]) {
                let row_count = parser.parse_limit_value()?;
                set_row_count(context, &mut limit, row_count);
            } else {
                limit.row_count = Some(LimitValue::literal(1));
            }
            parser.skip_if_any(&[Keyword::Row.into(), Keyword::Rows.into()]);
            parser.skip_if(Keyword::Only);
        } else {
            break;
        }
    }
    if found {
        context.statement.limit = Some(limit);
    }
    Ok(())
}

fn set_offset(context: &mut SelectContext, limit: &mut Limit, (offset, span): (LimitValue, Range<usize>)) {
    if offset.parameter_index.is_none() {
        context.statement.sql_tokens.push(SqlToken::Offset {
            begin_position: span.start,
            length: span.len(),
            offset: offset.value,
        });
    }
    limit.offset = Some(offset);
}

fn set_row_count(context: &mut SelectContext, limit: &mut Limit, (row_count, span): (LimitValue, Range<usize>)) {
    if row_count.parameter_index.is_none() {
        context.statement.sql_tokens.push(SqlToken::RowCount {
            begin_position: span.start,
            length: span.len(),
            row_count: row_count.value,
        });
    }
    limit.row_count = Some(row_count);
}

/// FOR UPDATE and MySQL LOCK IN SHARE MODE do not affect routing
fn skip_lock_clause(parser: &mut SqlParser<'_>) {
    if parser.is_any(&[Keyword::For.into(), Keyword::Lock.into()]) {
        while !parser.is_end() && !parser.is(Symbol::RightParen) {
            parser.next();
        }
    }
}

fn resolve_pending_owners(context: &mut SelectContext) {
    for (begin_position, literals) in context.pending_owners.drain(..) {
        if context.statement.tables.contains_name(&unquote_identifier(&literals)) {
            context.statement.sql_tokens.push(SqlToken::Table {
                begin_position,
                original_literals: literals,
            });
        }
    }
}

/// Whether a sort column is already projected by the select list
fn is_projected(statement: &SqlStatement, order_item: &OrderItem) -> bool {
    let Some(name) = order_item.name.as_deref() else {
        return true;
    };
    let qualified = order_item.qualified_name().unwrap_or_default();
    statement.items.iter().any(|item| match item {
        SelectItem::Star { owner: None } => true,
        SelectItem::Star { owner: Some(owner) } => order_item
            .owner
            .as_deref()
            .map(|o| o.eq_ignore_ascii_case(owner))
            .unwrap_or(false),
        _ => {
            let expression = item.expression();
            let column = expression.rsplit('.').next().unwrap_or_default();
            item.alias().map(|a| a.eq_ignore_ascii_case(name)).unwrap_or(false)
                || expression.eq_ignore_ascii_case(&qualified)
                || expression.eq_ignore_ascii_case(name)
                || (order_item.owner.is_none() && column.eq_ignore_ascii_case(name))
        }
    })
}

fn append_derived_columns(context: &mut SelectContext) {
    let Some(begin_position) = context.select_list_end else {
        return;
    };
    let statement = &mut context.statement;
    let mut derived = Vec::new();
    let mut derived_items = Vec::new();

    let averages: Vec<String> = statement
        .items
        .iter()
        .filter_map(|item| match item {
            SelectItem::Aggregation {
                aggregation_type: AggregationType::Avg,
                inner_expression,
                ..
            } => Some(inner_expression.clone()),
            _ => None,
        })
        .collect();
    for (i, inner_expression) in averages.into_iter().enumerate() {
        let count_alias = format!("AVG_DERIVED_COUNT_{}", i);
        let sum_alias = format!("AVG_DERIVED_SUM_{}", i);
        derived.push(format!("COUNT{} AS {}", inner_expression, count_alias));
        derived.push(format!("SUM{} AS {}", inner_expression, sum_alias));
        derived_items.push(SelectItem::Aggregation {
            aggregation_type: AggregationType::Count,
            inner_expression: inner_expression.clone(),
            alias: Some(count_alias),
        });
        derived_items.push(SelectItem::Aggregation {
            aggregation_type: AggregationType::Sum,
            inner_expression,
            alias: Some(sum_alias),
        });
    }

    for (prefix, order_by) in [("ORDER_BY_DERIVED_", true), ("GROUP_BY_DERIVED_", false)] {
        let missing: Vec<usize> = {
            let view: &SqlStatement = statement;
            let items = if order_by {
                &view.order_by_items
            } else {
                &view.group_by_items
            };
            items
                .iter()
                .enumerate()
                .filter(|(_, item)| item.index.is_none() && !is_projected(view, item))
                .map(|(i, _)| i)
                .collect()
        };
        let items = if order_by {
            &mut statement.order_by_items
        } else {
            &mut statement.group_by_items
        };
        for (n, i) in missing.into_iter().enumerate() {
            let alias = format!("{}{}", prefix, n);
            if let Some(qualified) = items[i].qualified_name() {
                derived.push(format!("{} AS {}", qualified, alias));
                items[i].alias = Some(alias);
            }
        }
    }

    statement.items.extend(derived_items);
    if !derived.is_empty() {
        statement.sql_tokens.push(SqlToken::Items {
            begin_position,
            items: derived,
        });
    }
}

/// Sort by the grouping columns when GROUP BY comes without ORDER BY
fn append_derived_order_by(context: &mut SelectContext) {
    let statement = &mut context.statement;
    if statement.group_by_items.is_empty() || !statement.order_by_items.is_empty() {
        return;
    }
    statement.order_by_items = statement.group_by_items.clone();
    if let Some(begin_position) = context.group_by_end {
        statement.sql_tokens.push(SqlToken::OrderBy { begin_position });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::order_rule;
    use crate::models::{ShardingOperator, ShardingRule};
    use crate::services::parsing::DatabaseType;

    fn parse_sql(sql: &str, database_type: DatabaseType, rule: &ShardingRule) -> Result<SqlStatement> {
        let mut parser = SqlParser::new(sql, database_type, rule);
        parse(&mut parser)
    }

    fn table_tokens(statement: &SqlStatement) -> Vec<(usize, String)> {
        let mut tokens: Vec<(usize, String)> = statement
            .sql_tokens
            .iter()
            .filter_map(|t| match t {
                SqlToken::Table {
                    begin_position,
                    original_literals,
                } => Some((*begin_position, original_literals.clone())),
                _ => None,
            })
            .collect();
        tokens.sort();
        tokens
    }

    #[test]
    fn test_simple_select() {
        let rule = order_rule();
        let sql = "SELECT o.order_id, o.user_id AS uid FROM t_order o WHERE o.user_id = ? AND o.order_id = ?";
        let statement = parse_sql(sql, DatabaseType::MySQL, &rule).unwrap();

        assert_eq!(statement.tables.table_names(), vec!["t_order"]);
        assert_eq!(statement.items.len(), 2);
        assert_eq!(statement.items[0].expression(), "o.order_id");
        assert_eq!(statement.items[1].alias(), Some("uid"));
        assert_eq!(statement.conditions.len(), 2);
        assert_eq!(table_tokens(&statement), vec![(sql.find("t_order").unwrap(), "t_order".to_string())]);
        assert!(statement.limit.is_none());
    }

    #[test]
    fn test_owner_tokens_in_select_list() {
        let rule = order_rule();
        let sql = "SELECT t_order.order_id FROM t_order WHERE t_order.user_id = 1";
        let statement = parse_sql(sql, DatabaseType::MySQL, &rule).unwrap();
        let tokens = table_tokens(&statement);
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0], (7, "t_order".to_string()));
    }

    #[test]
    fn test_aggregation_and_group_by_derivation() {
        let rule = order_rule();
        let sql = "SELECT AVG(price) avg_price, COUNT(*) FROM t_order GROUP BY user_id";
        let statement = parse_sql(sql, DatabaseType::MySQL, &rule).unwrap();

        assert_eq!(statement.items[0].aggregation_type(), Some(AggregationType::Avg));
        assert_eq!(statement.items[0].alias(), Some("avg_price"));
        assert_eq!(statement.items[1].aggregation_type(), Some(AggregationType::Count));
        assert_eq!(statement.items.len(), 4);

        let items_token = statement
            .sql_tokens
            .iter()
            .find(|t| matches!(t, SqlToken::Items { .. }))
            .unwrap();
        assert_eq!(
            items_token,
            &SqlToken::Items {
                begin_position: sql.find(" FROM").unwrap(),
                items: vec![
                    "COUNT(price) AS AVG_DERIVED_COUNT_0".to_string(),
                    "SUM(price) AS AVG_DERIVED_SUM_0".to_string(),
                    "user_id AS GROUP_BY_DERIVED_0".to_string(),
                ]
            }
        );
        assert!(statement
            .sql_tokens
            .contains(&SqlToken::OrderBy { begin_position: sql.len() }));
        assert_eq!(statement.order_by_items, statement.group_by_items);
        assert!(!statement.needs_fetch_all());
    }

    #[test]
    fn test_order_by_derivation() {
        let rule = order_rule();
        let sql = "SELECT order_id FROM t_order ORDER BY user_id DESC, order_id";
        let statement = parse_sql(sql, DatabaseType::MySQL, &rule).unwrap();

        assert_eq!(statement.order_by_items.len(), 2);
        assert_eq!(statement.order_by_items[0].order_type, OrderType::Desc);
        assert_eq!(statement.order_by_items[0].alias.as_deref(), Some("ORDER_BY_DERIVED_0"));
        assert_eq!(statement.order_by_items[1].alias, None);
        assert!(statement.sql_tokens.contains(&SqlToken::Items {
            begin_position: sql.find(" FROM").unwrap(),
            items: vec!["user_id AS ORDER_BY_DERIVED_0".to_string()],
        }));

        let star = parse_sql("SELECT * FROM t_order ORDER BY user_id", DatabaseType::MySQL, &rule).unwrap();
        assert!(star.contains_star);
        assert!(!star.sql_tokens.iter().any(|t| matches!(t, SqlToken::Items { .. })));
    }

    #[test]
    fn test_mysql_limit() {
        let rule = order_rule();
        let sql = "SELECT * FROM t_order LIMIT 2, 10";
        let statement = parse_sql(sql, DatabaseType::MySQL, &rule).unwrap();
        let limit = statement.limit.as_ref().unwrap();
        assert_eq!(limit.offset, Some(LimitValue::literal(2)));
        assert_eq!(limit.row_count, Some(LimitValue::literal(10)));
        assert!(limit.row_count_rewrite);
        assert!(statement.sql_tokens.contains(&SqlToken::Offset {
            begin_position: sql.find('2').unwrap(),
            length: 1,
            offset: 2
        }));
        assert!(statement.sql_tokens.contains(&SqlToken::RowCount {
            begin_position: sql.find("10").unwrap(),
            length: 2,
            row_count: 10
        }));

        let placeholders = parse_sql("SELECT * FROM t_order WHERE user_id = ? LIMIT ? OFFSET ?", DatabaseType::MySQL, &rule).unwrap();
        let limit = placeholders.limit.unwrap();
        assert_eq!(limit.row_count, Some(LimitValue::placeholder(1)));
        assert_eq!(limit.offset, Some(LimitValue::placeholder(2)));
    }

    #[test]
    fn test_postgresql_and_sqlserver_pagination() {
        let rule = order_rule();
        let postgres = parse_sql(
            "SELECT * FROM t_order ORDER BY order_id OFFSET 5 LIMIT 10",
            DatabaseType::PostgreSQL,
            &rule,
        )
        .unwrap();
        let limit = postgres.limit.unwrap();
        assert_eq!(limit.offset, Some(LimitValue::literal(5)));
        assert_eq!(limit.row_count, Some(LimitValue::literal(10)));

        let top = parse_sql("SELECT TOP 10 * FROM t_order", DatabaseType::SQLServer, &rule).unwrap();
        let limit = top.limit.unwrap();
        assert_eq!(limit.row_count, Some(LimitValue::literal(10)));
        assert!(!limit.row_count_rewrite);
        assert!(top.contains_star);

        let fetch = parse_sql(
            "SELECT * FROM t_order ORDER BY order_id OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY",
            DatabaseType::SQLServer,
            &rule,
        )
        .unwrap();
        let limit = fetch.limit.unwrap();
        assert_eq!(limit.offset, Some(LimitValue::literal(5)));
        assert_eq!(limit.row_count, Some(LimitValue::literal(10)));
        assert!(limit.row_count_rewrite);
    }

    #[test]
    fn test_oracle_rownum_pagination() {
        let rule = order_rule();
        let sql = "SELECT * FROM (SELECT o.*, ROWNUM rn FROM t_order o WHERE ROWNUM <= 20) WHERE rn > 10";
        let statement = parse_sql(sql, DatabaseType::Oracle, &rule).unwrap();

        assert_eq!(statement.tables.table_names(), vec!["t_order"]);
        let limit = statement.limit.as_ref().unwrap();
        assert!(!limit.row_count_rewrite);
        assert_eq!(limit.row_count, Some(LimitValue::literal(20)));
        assert_eq!(limit.offset, Some(LimitValue::literal(10)));
        assert!(statement.sql_tokens.contains(&SqlToken::RowCount {
            begin_position: sql.find("20").unwrap(),
            length: 2,
            row_count: 20
        }));
        assert!(statement.sql_tokens.contains(&SqlToken::Offset {
            begin_position: sql.find("10").unwrap(),
            length: 2,
            offset: 10
        }));
        // only the outer select list is recorded
        assert_eq!(statement.items, vec![SelectItem::Star { owner: None }]);
    }

    #[test]
    fn test_join() {
        let rule = order_rule();
        let sql = "SELECT i.* FROM t_order o JOIN t_order_item i ON o.order_id = i.order_id WHERE o.user_id = ? AND i.order_id IN (?, ?)";
        let statement = parse_sql(sql, DatabaseType::MySQL, &rule).unwrap();

        assert_eq!(statement.tables.table_names(), vec!["t_order", "t_order_item"]);
        assert_eq!(statement.items, vec![SelectItem::Star { owner: Some("i".to_string()) }]);
        assert_eq!(statement.conditions.len(), 2);
        let in_condition = statement.conditions.find("order_id", "t_order_item").unwrap();
        assert_eq!(in_condition.operator, ShardingOperator::In);
        assert_eq!(table_tokens(&statement).len(), 2);
    }

    #[test]
    fn test_unsupported_clauses() {
        let rule = order_rule();
        for sql in [
            "SELECT user_id, COUNT(*) FROM t_order GROUP BY user_id HAVING COUNT(*) > 1",
            "SELECT * FROM t_order UNION SELECT * FROM t_order_item",
            "SELECT * FROM t_order WHERE order_id IN (SELECT order_id FROM t_order_item)",
            "SELECT * FROM t_order WHERE user_id = 1 OR user_id = 2",
        ] {
            assert!(
                matches!(parse_sql(sql, DatabaseType::MySQL, &rule), Err(ShardingError::UnsupportedSql(_))),
                "{}",
                sql
            );
        }
    }

    #[test]
    fn test_distinct_and_lock_clause() {
        let rule = order_rule();
        let statement = parse_sql(
            "SELECT DISTINCT user_id FROM t_order WHERE order_id = 1 FOR UPDATE",
            DatabaseType::MySQL,
            &rule,
        )
        .unwrap();
        assert!(statement.distinct);
        assert_eq!(statement.conditions.len(), 1);
    }

    #[test]
    fn test_complex_select_items() {
        let rule = order_rule();
        let sql = "SELECT CASE WHEN status = 'A' THEN 1 ELSE 0 END flag, price * 2 AS doubled, ? p FROM t_order";
        let statement = parse_sql(sql, DatabaseType::MySQL, &rule).unwrap();
        let aliases: Vec<Option<&str>> = statement.items.iter().map(|i| i.alias()).collect();
        assert_eq!(aliases, vec![Some("flag"), Some("doubled"), Some("p")]);
        assert_eq!(statement.items[1].expression(), "price * 2");
    }
}
