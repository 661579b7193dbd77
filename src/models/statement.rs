// Parsed SQL statement
//
// The structured result of parsing one logical SQL: referenced tables,
// sharding conditions, ordering/grouping/limit clauses and the rewrite
// markers that drive physical SQL generation. Built once by the parser and
// read-only afterwards.

use serde::Serialize;

use crate::error::{Result, ShardingError};
use crate::models::{ShardingOperator, ShardingValue, SqlValue};

/// Statement category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SqlType {
    Dql,
    Dml,
    Ddl,
}

impl SqlType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SqlType::Dql => "DQL",
            SqlType::Dml => "DML",
            SqlType::Ddl => "DDL",
        }
    }
}

/// Statement kind, decided by the leading keyword
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Truncate,
}

impl StatementKind {
    pub fn sql_type(&self) -> SqlType {
        match self {
            StatementKind::Select => SqlType::Dql,
            StatementKind::Insert | StatementKind::Update | StatementKind::Delete => SqlType::Dml,
            StatementKind::Create
            | StatementKind::Alter
            | StatementKind::Drop
            | StatementKind::Truncate => SqlType::Ddl,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
            StatementKind::Create => "CREATE",
            StatementKind::Alter => "ALTER",
            StatementKind::Drop => "DROP",
            StatementKind::Truncate => "TRUNCATE",
        }
    }
}

/// Strip identifier quoting: back quotes, double quotes, single quotes and brackets
pub fn unquote_identifier(literals: &str) -> String {
    literals
        .chars()
        .filter(|c| !matches!(c, '`' | '"' | '\'' | '[' | ']'))
        .collect()
}

/// A table referenced by the statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub alias: Option<String>,
}

impl Table {
    pub fn new(name: impl Into<String>, alias: Option<String>) -> Self {
        Self {
            name: name.into(),
            alias,
        }
    }
}

/// Ordered table list, deduplicated by name ignoring case
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Tables {
    tables: Vec<Table>,
}

impl Tables {
    pub fn add(&mut self, table: Table) {
        if !self.contains_name(&table.name) {
            self.tables.push(table);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_single_table(&self) -> bool {
        self.tables.len() == 1
    }

    pub fn single_table_name(&self) -> Option<&str> {
        match self.tables.as_slice() {
            [table] => Some(table.name.as_str()),
            _ => None,
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.name.clone()).collect()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.tables.iter().any(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Find by table name first, then by alias
    pub fn find(&self, name_or_alias: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name_or_alias))
            .or_else(|| {
                self.tables.iter().find(|t| {
                    t.alias
                        .as_deref()
                        .map(|a| a.eq_ignore_ascii_case(name_or_alias))
                        .unwrap_or(false)
                })
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter()
    }
}

/// A column resolved to its logic table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    pub name: String,
    pub table_name: String,
}

impl Column {
    pub fn new(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
        }
    }

    fn matches(&self, name: &str, table_name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) && self.table_name.eq_ignore_ascii_case(table_name)
    }
}

/// Parsed expression; anything composite collapses to `Ignore`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SqlExpression {
    Placeholder(usize),
    Text(String),
    Number(SqlValue),
    Identifier(String),
    Property { owner: String, name: String },
    Ignore,
}

impl SqlExpression {
    /// Literals and placeholders are the only expressions that yield sharding values
    pub fn is_value(&self) -> bool {
        matches!(
            self,
            SqlExpression::Placeholder(_) | SqlExpression::Text(_) | SqlExpression::Number(_)
        )
    }

    pub fn value(&self, parameters: &[SqlValue]) -> Result<SqlValue> {
        match self {
            SqlExpression::Placeholder(index) => parameters.get(*index).cloned().ok_or_else(|| {
                ShardingError::Routing(format!(
                    "Parameter index {} out of range, {} parameters bound",
                    index,
                    parameters.len()
                ))
            }),
            SqlExpression::Text(text) => Ok(SqlValue::Text(text.clone())),
            SqlExpression::Number(value) => Ok(value.clone()),
            other => Err(ShardingError::Routing(format!(
                "Expression {:?} does not carry a sharding value",
                other
            ))),
        }
    }
}

/// Sharding condition on one column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Condition {
    pub column: Column,
    pub operator: ShardingOperator,
    pub expressions: Vec<SqlExpression>,
}

impl Condition {
    pub fn equal(column: Column, expression: SqlExpression) -> Self {
        Self {
            column,
            operator: ShardingOperator::Equal,
            expressions: vec![expression],
        }
    }

    pub fn in_list(column: Column, expressions: Vec<SqlExpression>) -> Self {
        Self {
            column,
            operator: ShardingOperator::In,
            expressions,
        }
    }

    pub fn between(column: Column, lower: SqlExpression, upper: SqlExpression) -> Self {
        Self {
            column,
            operator: ShardingOperator::Between,
            expressions: vec![lower, upper],
        }
    }

    /// Resolve against bound parameters
    pub fn sharding_value(&self, parameters: &[SqlValue]) -> Result<ShardingValue> {
        let mut values = self
            .expressions
            .iter()
            .map(|e| e.value(parameters))
            .collect::<Result<Vec<_>>>()?;
        let table = self.column.table_name.clone();
        let column = self.column.name.clone();
        match self.operator {
            ShardingOperator::Equal if values.len() == 1 => {
                Ok(ShardingValue::single(table, column, values.remove(0)))
            }
            ShardingOperator::In if !values.is_empty() => Ok(ShardingValue::list(table, column, values)),
            ShardingOperator::Between if values.len() == 2 => {
                let upper = values.remove(1);
                let lower = values.remove(0);
                Ok(ShardingValue::range(table, column, lower, upper))
            }
            operator => Err(ShardingError::Routing(format!(
                "Condition {} on {}.{} has {} values",
                operator.as_str(),
                self.column.table_name,
                self.column.name,
                values.len()
            ))),
        }
    }
}

/// Conditions keyed by column; a later condition on the same column replaces the earlier one
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Conditions {
    conditions: Vec<Condition>,
}

impl Conditions {
    pub fn add(&mut self, condition: Condition) {
        let existing = self
            .conditions
            .iter_mut()
            .find(|c| c.column.matches(&condition.column.name, &condition.column.table_name));
        match existing {
            Some(slot) => *slot = condition,
            None => self.conditions.push(condition),
        }
    }

    pub fn find(&self, column_name: &str, table_name: &str) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.column.matches(column_name, table_name))
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AggregationType {
    Max,
    Min,
    Sum,
    Count,
    Avg,
}

impl AggregationType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_uppercase().as_str() {
            "MAX" => Some(AggregationType::Max),
            "MIN" => Some(AggregationType::Min),
            "SUM" => Some(AggregationType::Sum),
            "COUNT" => Some(AggregationType::Count),
            "AVG" => Some(AggregationType::Avg),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Max => "MAX",
            AggregationType::Min => "MIN",
            AggregationType::Sum => "SUM",
            AggregationType::Count => "COUNT",
            AggregationType::Avg => "AVG",
        }
    }
}

/// One item of a select list
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectItem {
    Star {
        owner: Option<String>,
    },
    Common {
        expression: String,
        alias: Option<String>,
    },
    Aggregation {
        aggregation_type: AggregationType,
        /// Parenthesised argument text, e.g. `(price)`
        inner_expression: String,
        alias: Option<String>,
    },
}

impl SelectItem {
    pub fn expression(&self) -> String {
        match self {
            SelectItem::Star { owner: Some(owner) } => format!("{}.*", owner),
            SelectItem::Star { owner: None } => "*".to_string(),
            SelectItem::Common { expression, .. } => expression.clone(),
            SelectItem::Aggregation {
                aggregation_type,
                inner_expression,
                ..
            } => format!("{}{}", aggregation_type.as_str(), inner_expression),
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            SelectItem::Star { .. } => None,
            SelectItem::Common { alias, .. } | SelectItem::Aggregation { alias, .. } => alias.as_deref(),
        }
    }

    pub fn aggregation_type(&self) -> Option<AggregationType> {
        match self {
            SelectItem::Aggregation {
                aggregation_type, ..
            } => Some(*aggregation_type),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderType {
    Asc,
    Desc,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderType::Asc => "ASC",
            OrderType::Desc => "DESC",
        }
    }
}

/// ORDER BY or GROUP BY item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderItem {
    pub owner: Option<String>,
    pub name: Option<String>,
    /// 1-based select list position for `ORDER BY 2`
    pub index: Option<usize>,
    pub order_type: OrderType,
    pub alias: Option<String>,
}

impl OrderItem {
    pub fn with_name(
        owner: Option<String>,
        name: impl Into<String>,
        order_type: OrderType,
        alias: Option<String>,
    ) -> Self {
        Self {
            owner,
            name: Some(name.into()),
            index: None,
            order_type,
            alias,
        }
    }

    pub fn with_index(index: usize, order_type: OrderType) -> Self {
        Self {
            owner: None,
            name: None,
            index: Some(index),
            order_type,
            alias: None,
        }
    }

    pub fn column_label(&self) -> Option<&str> {
        self.alias.as_deref().or(self.name.as_deref())
    }

    pub fn qualified_name(&self) -> Option<String> {
        let name = self.name.as_ref()?;
        Some(match &self.owner {
            Some(owner) => format!("{}.{}", owner, name),
            None => name.clone(),
        })
    }

    /// Same direction and the same column, by label, qualified name or index
    pub fn is_same_as(&self, other: &OrderItem) -> bool {
        if self.order_type != other.order_type {
            return false;
        }
        let label_equals = match (self.column_label(), other.column_label()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        };
        let qualified_name_equals = match (self.qualified_name(), other.qualified_name()) {
            (Some(a), Some(b)) => a.eq_ignore_ascii_case(&b),
            _ => false,
        };
        let index_equals = self.index.is_some() && self.index == other.index;
        label_equals || qualified_name_equals || index_equals
    }
}

/// LIMIT operand: a literal, or the placeholder at `parameter_index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LimitValue {
    pub value: i64,
    pub parameter_index: Option<usize>,
}

impl LimitValue {
    pub fn literal(value: i64) -> Self {
        Self {
            value,
            parameter_index: None,
        }
    }

    pub fn placeholder(parameter_index: usize) -> Self {
        Self {
            value: -1,
            parameter_index: Some(parameter_index),
        }
    }

    fn resolve(&self, parameters: &[SqlValue]) -> Result<i64> {
        let value = match self.parameter_index {
            None => self.value,
            Some(index) => parameters
                .get(index)
                .and_then(|v| v.round_half_up())
                .ok_or_else(|| {
                    ShardingError::Parsing(format!(
                        "LIMIT parameter at index {} is missing or not a number",
                        index
                    ))
                })?,
        };
        if value < 0 {
            return Err(ShardingError::Parsing(
                "LIMIT offset and row count can not be a negative value.".to_string(),
            ));
        }
        Ok(value)
    }
}

/// Pagination window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Limit {
    pub offset: Option<LimitValue>,
    pub row_count: Option<LimitValue>,
    /// True when the row count excludes the offset (LIMIT style) and must grow
    /// by the offset on a multi-shard fan-out; false for row-number bounds
    pub row_count_rewrite: bool,
}

impl Limit {
    pub fn new(row_count_rewrite: bool) -> Self {
        Self {
            offset: None,
            row_count: None,
            row_count_rewrite,
        }
    }

    pub fn offset_value(&self, parameters: &[SqlValue]) -> Result<i64> {
        match &self.offset {
            Some(offset) => offset.resolve(parameters),
            None => Ok(0),
        }
    }

    pub fn row_count_value(&self, parameters: &[SqlValue]) -> Result<Option<i64>> {
        self.row_count.map(|r| r.resolve(parameters)).transpose()
    }

    /// Rewrite placeholder-bound LIMIT operands for a multi-shard fan-out.
    ///
    /// The offset becomes 0 and the row count becomes `offset + row_count`,
    /// saturating at `i64::MAX` (or `i32::MAX` when every row has to be
    /// fetched for merging).
    ///
    /// # Errors
    /// Returns error when a bound value is missing or negative
    pub fn rewrite_parameters(&self, parameters: &mut [SqlValue], fetch_all: bool) -> Result<()> {
        let offset = self.offset_value(parameters)?;
        let row_count = self.row_count_value(parameters)?;

        if let Some(index) = self.offset.and_then(|o| o.parameter_index) {
            if let Some(slot) = parameters.get_mut(index) {
                *slot = SqlValue::Int(0);
            }
        }
        if let (Some(index), Some(row_count)) =
            (self.row_count.and_then(|r| r.parameter_index), row_count)
        {
            let rewritten = if fetch_all {
                i32::MAX as i64
            } else if self.row_count_rewrite {
                offset.saturating_add(row_count)
            } else {
                row_count
            };
            if let Some(slot) = parameters.get_mut(index) {
                *slot = SqlValue::Int(rewritten);
            }
        }
        Ok(())
    }
}

/// Auto-generated key of an INSERT
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedKey {
    pub column: String,
    /// Placeholder carrying the key
    pub parameter_index: Option<usize>,
    pub value: Option<i64>,
    /// The placeholder was added to the SQL; its value is generated at
    /// routing time and inserted into the parameters at `parameter_index`
    pub deferred: bool,
}

/// Rewrite marker anchored at a byte offset of the logical SQL
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SqlToken {
    /// Logic table reference to substitute with the physical table
    Table {
        begin_position: usize,
        original_literals: String,
    },
    /// Extra comma-separated items inserted before `begin_position`
    Items {
        begin_position: usize,
        items: Vec<String>,
    },
    /// Derived ORDER BY for a GROUP BY without one
    OrderBy { begin_position: usize },
    /// Literal row count; `length` is its width in the source, leading zeros included
    RowCount {
        begin_position: usize,
        length: usize,
        row_count: i64,
    },
    Offset {
        begin_position: usize,
        length: usize,
        offset: i64,
    },
}

impl SqlToken {
    pub fn begin_position(&self) -> usize {
        match self {
            SqlToken::Table { begin_position, .. }
            | SqlToken::Items { begin_position, .. }
            | SqlToken::OrderBy { begin_position }
            | SqlToken::RowCount { begin_position, .. }
            | SqlToken::Offset { begin_position, .. } => *begin_position,
        }
    }
}

/// Parsed SQL statement
#[derive(Debug, Clone, Serialize)]
pub struct SqlStatement {
    pub kind: StatementKind,
    pub tables: Tables,
    pub conditions: Conditions,
    pub sql_tokens: Vec<SqlToken>,
    pub items: Vec<SelectItem>,
    pub contains_star: bool,
    pub distinct: bool,
    pub group_by_items: Vec<OrderItem>,
    pub order_by_items: Vec<OrderItem>,
    pub limit: Option<Limit>,
    pub insert_columns: Vec<Column>,
    pub generated_key: Option<GeneratedKey>,
}

impl SqlStatement {
    pub fn new(kind: StatementKind) -> Self {
        Self {
            kind,
            tables: Tables::default(),
            conditions: Conditions::default(),
            sql_tokens: Vec::new(),
            items: Vec::new(),
            contains_star: false,
            distinct: false,
            group_by_items: Vec::new(),
            order_by_items: Vec::new(),
            limit: None,
            insert_columns: Vec::new(),
            generated_key: None,
        }
    }

    pub fn sql_type(&self) -> SqlType {
        self.kind.sql_type()
    }

    pub fn aggregation_items(&self) -> impl Iterator<Item = &SelectItem> {
        self.items.iter().filter(|i| i.aggregation_type().is_some())
    }

    pub fn is_same_group_by_and_order_by_items(&self) -> bool {
        !self.group_by_items.is_empty()
            && self.group_by_items.len() == self.order_by_items.len()
            && self
                .group_by_items
                .iter()
                .zip(self.order_by_items.iter())
                .all(|(g, o)| g.is_same_as(o))
    }

    /// Grouping or aggregation whose order differs from the grouping forces a full fetch per shard
    pub fn needs_fetch_all(&self) -> bool {
        (!self.group_by_items.is_empty() || self.aggregation_items().next().is_some())
            && !self.is_same_group_by_and_order_by_items()
    }
}
