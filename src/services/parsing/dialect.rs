// SQL Dialects
//
// Database types understood by the lexer and parser. Each dialect decides
// which words are keywords and which lexing extensions apply (variables,
// N-prefixed strings, hint blocks, `#` comments).

use serde::{Deserialize, Serialize};

use super::token::Keyword;

/// Supported database dialects; H2 parses as MySQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    #[default]
    MySQL,
    PostgreSQL,
    Oracle,
    SQLServer,
    H2,
}

impl DatabaseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySQL => "mysql",
            DatabaseType::PostgreSQL => "postgresql",
            DatabaseType::Oracle => "oracle",
            DatabaseType::SQLServer => "sqlserver",
            DatabaseType::H2 => "h2",
        }
    }

    /// Parse database type from string
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "mysql" => Ok(DatabaseType::MySQL),
            "postgresql" | "postgres" => Ok(DatabaseType::PostgreSQL),
            "oracle" => Ok(DatabaseType::Oracle),
            "sqlserver" | "mssql" => Ok(DatabaseType::SQLServer),
            "h2" => Ok(DatabaseType::H2),
            _ => Err(format!("Unsupported database type: {}", s)),
        }
    }

    pub fn is_mysql_family(&self) -> bool {
        matches!(self, DatabaseType::MySQL | DatabaseType::H2)
    }

    /// `@var` and `@@var`
    pub fn supports_variables(&self) -> bool {
        self.is_mysql_family() || *self == DatabaseType::SQLServer
    }

    /// `N'...'` unicode strings
    pub fn supports_n_chars(&self) -> bool {
        *self == DatabaseType::SQLServer
    }

    pub fn supports_hash_comments(&self) -> bool {
        self.is_mysql_family()
    }

    /// Opening of a hint block skipped like a comment
    pub fn hint_prefix(&self) -> Option<&'static str> {
        match self {
            DatabaseType::MySQL | DatabaseType::H2 => Some("/*!"),
            DatabaseType::Oracle => Some("/*+"),
            DatabaseType::PostgreSQL | DatabaseType::SQLServer => None,
        }
    }

    /// Pseudo column used for row-number pagination
    pub fn row_number_column(&self) -> Option<&'static str> {
        match self {
            DatabaseType::Oracle => Some("ROWNUM"),
            _ => None,
        }
    }

    /// Resolve an upper-cased word to a keyword of this dialect
    pub fn keyword(&self, upper: &str) -> Option<Keyword> {
        if let Some(keyword) = common_keyword(upper) {
            return Some(keyword);
        }
        let keyword = match upper {
            "LIMIT" => Keyword::Limit,
            "OFFSET" => Keyword::Offset,
            "FETCH" => Keyword::Fetch,
            "NEXT" => Keyword::Next,
            "FIRST" => Keyword::First,
            "LAST" => Keyword::Last,
            "ROWS" => Keyword::Rows,
            "ROW" => Keyword::Row,
            "ONLY" => Keyword::Only,
            "NULLS" => Keyword::Nulls,
            "DISTINCTROW" => Keyword::DistinctRow,
            "STRAIGHT_JOIN" => Keyword::StraightJoin,
            "LOW_PRIORITY" => Keyword::LowPriority,
            "QUICK" => Keyword::Quick,
            "IGNORE" => Keyword::Ignore,
            "LOCK" => Keyword::Lock,
            "SHARE" => Keyword::Share,
            "MODE" => Keyword::Mode,
            "VALUE" => Keyword::Value,
            "ROLLUP" => Keyword::Rollup,
            "MINUS" => Keyword::Minus,
            "SIBLINGS" => Keyword::Siblings,
            "TOP" => Keyword::Top,
            "APPLY" => Keyword::Apply,
            _ => return None,
        };
        if self.has_keyword(keyword) {
            Some(keyword)
        } else {
            None
        }
    }

    fn has_keyword(&self, keyword: Keyword) -> bool {
        match self {
            DatabaseType::MySQL | DatabaseType::H2 => matches!(
                keyword,
                Keyword::Limit
                    | Keyword::Offset
                    | Keyword::DistinctRow
                    | Keyword::StraightJoin
                    | Keyword::LowPriority
                    | Keyword::Quick
                    | Keyword::Ignore
                    | Keyword::Lock
                    | Keyword::Share
                    | Keyword::Mode
                    | Keyword::Value
                    | Keyword::Rollup
            ),
            DatabaseType::PostgreSQL => matches!(
                keyword,
                Keyword::Limit
                    | Keyword::Offset
                    | Keyword::Fetch
                    | Keyword::Next
                    | Keyword::First
                    | Keyword::Last
                    | Keyword::Rows
                    | Keyword::Row
                    | Keyword::Only
                    | Keyword::Nulls
            ),
            DatabaseType::Oracle => matches!(
                keyword,
                Keyword::Minus
                    | Keyword::Nulls
                    | Keyword::First
                    | Keyword::Last
                    | Keyword::Siblings
                    | Keyword::Only
            ),
            DatabaseType::SQLServer => matches!(
                keyword,
                Keyword::Top
                    | Keyword::Offset
                    | Keyword::Fetch
                    | Keyword::Next
                    | Keyword::First
                    | Keyword::Rows
                    | Keyword::Row
                    | Keyword::Only
                    | Keyword::Apply
            ),
        }
    }
}

fn common_keyword(upper: &str) -> Option<Keyword> {
    let keyword = match upper {
        "SELECT" => Keyword::Select,
        "DISTINCT" => Keyword::Distinct,
        "ALL" => Keyword::All,
        "FROM" => Keyword::From,
        "WHERE" => Keyword::Where,
        "AND" => Keyword::And,
        "OR" => Keyword::Or,
        "NOT" => Keyword::Not,
        "IN" => Keyword::In,
        "BETWEEN" => Keyword::Between,
        "IS" => Keyword::Is,
        "NULL" => Keyword::Null,
        "LIKE" => Keyword::Like,
        "AS" => Keyword::As,
        "ON" => Keyword::On,
        "USING" => Keyword::Using,
        "JOIN" => Keyword::Join,
        "INNER" => Keyword::Inner,
        "LEFT" => Keyword::Left,
        "RIGHT" => Keyword::Right,
        "FULL" => Keyword::Full,
        "OUTER" => Keyword::Outer,
        "CROSS" => Keyword::Cross,
        "NATURAL" => Keyword::Natural,
        "GROUP" => Keyword::Group,
        "ORDER" => Keyword::Order,
        "BY" => Keyword::By,
        "ASC" => Keyword::Asc,
        "DESC" => Keyword::Desc,
        "HAVING" => Keyword::Having,
        "UNION" => Keyword::Union,
        "INTERSECT" => Keyword::Intersect,
        "EXCEPT" => Keyword::Except,
        "INSERT" => Keyword::Insert,
        "INTO" => Keyword::Into,
        "VALUES" => Keyword::Values,
        "SET" => Keyword::Set,
        "UPDATE" => Keyword::Update,
        "DELETE" => Keyword::Delete,
        "CREATE" => Keyword::Create,
        "ALTER" => Keyword::Alter,
        "DROP" => Keyword::Drop,
        "TRUNCATE" => Keyword::Truncate,
        "TABLE" => Keyword::Table,
        "TEMPORARY" => Keyword::Temporary,
        "IF" => Keyword::If,
        "EXISTS" => Keyword::Exists,
        "WITH" => Keyword::With,
        "FOR" => Keyword::For,
        "CASE" => Keyword::Case,
        "WHEN" => Keyword::When,
        "THEN" => Keyword::Then,
        "ELSE" => Keyword::Else,
        "END" => Keyword::End,
        _ => return None,
    };
    Some(keyword)
}
