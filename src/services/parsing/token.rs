use std::fmt;

/// SQL keywords the parser dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Select,
    Distinct,
    DistinctRow,
    All,
    From,
    Where,
    And,
    Or,
    Not,
    In,
    Between,
    Is,
    Null,
    Like,
    As,
    On,
    Using,
    Join,
    Inner,
    Left,
    Right,
    Full,
    Outer,
    Cross,
    Natural,
    StraightJoin,
    Apply,
    Group,
    Order,
    By,
    Asc,
    Desc,
    Having,
    Union,
    Intersect,
    Except,
    Minus,
    Insert,
    Into,
    Values,
    Value,
    Set,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Truncate,
    Table,
    Temporary,
    If,
    Exists,
    With,
    Rollup,
    Limit,
    Offset,
    Top,
    Fetch,
    Next,
    First,
    Last,
    Rows,
    Row,
    Only,
    Nulls,
    Siblings,
    For,
    Lock,
    Share,
    Mode,
    LowPriority,
    Quick,
    Ignore,
    Case,
    When,
    Then,
    Else,
    End,
}

impl Keyword {
    /// Non-reserved keywords may still name tables, columns and aliases
    pub fn is_reserved(&self) -> bool {
        !matches!(
            self,
            Keyword::Temporary
                | Keyword::If
                | Keyword::Exists
                | Keyword::Rollup
                | Keyword::Next
                | Keyword::First
                | Keyword::Last
                | Keyword::Rows
                | Keyword::Row
                | Keyword::Only
                | Keyword::Nulls
                | Keyword::Siblings
                | Keyword::Share
                | Keyword::Mode
                | Keyword::LowPriority
                | Keyword::Quick
                | Keyword::Ignore
                | Keyword::Apply
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "SELECT",
            Keyword::Distinct => "DISTINCT",
            Keyword::DistinctRow => "DISTINCTROW",
            Keyword::All => "ALL",
            Keyword::From => "FROM",
            Keyword::Where => "WHERE",
            Keyword::And => "AND",
            Keyword::Or => "OR",
            Keyword::Not => "NOT",
            Keyword::In => "IN",
            Keyword::Between => "BETWEEN",
            Keyword::Is => "IS",
            Keyword::Null => "NULL",
            Keyword::Like => "LIKE",
            Keyword::As => "AS",
            Keyword::On => "ON",
            Keyword::Using => "USING",
            Keyword::Join => "JOIN",
            Keyword::Inner => "INNER",
            Keyword::Left => "LEFT",
            Keyword::Right => "RIGHT",
            Keyword::Full => "FULL",
            Keyword::Outer => "OUTER",
            Keyword::Cross => "CROSS",
            Keyword::Natural => "NATURAL",
            Keyword::StraightJoin => "STRAIGHT_JOIN",
            Keyword::Apply => "APPLY",
            Keyword::Group => "GROUP",
            Keyword::Order => "ORDER",
            Keyword::By => "BY",
            Keyword::Asc => "ASC",
            Keyword::Desc => "DESC",
            Keyword::Having => "HAVING",
            Keyword::Union => "UNION",
            Keyword::Intersect => "INTERSECT",
            Keyword::Except => "EXCEPT",
            Keyword::Minus => "MINUS",
            Keyword::Insert => "INSERT",
            Keyword::Into => "INTO",
            Keyword::Values => "VALUES",
            Keyword::Value => "VALUE",
            Keyword::Set => "SET",
            Keyword::Update => "UPDATE",
            Keyword::Delete => "DELETE",
            Keyword::Create => "CREATE",
            Keyword::Alter => "ALTER",
            Keyword::Drop => "DROP",
            Keyword::Truncate => "TRUNCATE",
            Keyword::Table => "TABLE",
            Keyword::Temporary => "TEMPORARY",
            Keyword::If => "IF",
            Keyword::Exists => "EXISTS",
            Keyword::With => "WITH",
            Keyword::Rollup => "ROLLUP",
            Keyword::Limit => "LIMIT",
            Keyword::Offset => "OFFSET",
            Keyword::Top => "TOP",
            Keyword::Fetch => "FETCH",
            Keyword::Next => "NEXT",
            Keyword::First => "FIRST",
            Keyword::Last => "LAST",
            Keyword::Rows => "ROWS",
            Keyword::Row => "ROW",
            Keyword::Only => "ONLY",
            Keyword::Nulls => "NULLS",
            Keyword::Siblings => "SIBLINGS",
            Keyword::For => "FOR",
            Keyword::Lock => "LOCK",
            Keyword::Share => "SHARE",
            Keyword::Mode => "MODE",
            Keyword::LowPriority => "LOW_PRIORITY",
            Keyword::Quick => "QUICK",
            Keyword::Ignore => "IGNORE",
            Keyword::Case => "CASE",
            Keyword::When => "WHEN",
            Keyword::Then => "THEN",
            Keyword::Else => "ELSE",
            Keyword::End => "END",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semi,
    Comma,
    Dot,
    DoubleDot,
    Plus,
    Sub,
    Star,
    Slash,
    Question,
    Eq,
    Gt,
    Lt,
    Bang,
    Tilde,
    Caret,
    Percent,
    Colon,
    DoubleColon,
    ColonEq,
    LtEq,
    GtEq,
    LtEqGt,
    LtGt,
    BangEq,
    BangGt,
    BangLt,
    Amp,
    Bar,
    DoubleAmp,
    DoubleBar,
    DoubleLt,
    DoubleGt,
    At,
    Pound,
}

impl Symbol {
    pub fn from_literals(literals: &str) -> Option<Self> {
        let symbol = match literals {
            "(" => Symbol::LeftParen,
            ")" => Symbol::RightParen,
            "{" => Symbol::LeftBrace,
            "}" => Symbol::RightBrace,
            "[" => Symbol::LeftBracket,
            "]" => Symbol::RightBracket,
            ";" => Symbol::Semi,
            "," => Symbol::Comma,
            "." => Symbol::Dot,
            ".." => Symbol::DoubleDot,
            "+" => Symbol::Plus,
            "-" => Symbol::Sub,
            "*" => Symbol::Star,
            "/" => Symbol::Slash,
            "?" => Symbol::Question,
            "=" => Symbol::Eq,
            ">" => Symbol::Gt,
            "<" => Symbol::Lt,
            "!" => Symbol::Bang,
            "~" => Symbol::Tilde,
            "^" => Symbol::Caret,
            "%" => Symbol::Percent,
            ":" => Symbol::Colon,
            "::" => Symbol::DoubleColon,
            ":=" => Symbol::ColonEq,
            "<=" => Symbol::LtEq,
            ">=" => Symbol::GtEq,
            "<=>" => Symbol::LtEqGt,
            "<>" => Symbol::LtGt,
            "!=" => Symbol::BangEq,
            "!>" => Symbol::BangGt,
            "!<" => Symbol::BangLt,
            "&" => Symbol::Amp,
            "|" => Symbol::Bar,
            "&&" => Symbol::DoubleAmp,
            "||" => Symbol::DoubleBar,
            "<<" => Symbol::DoubleLt,
            ">>" => Symbol::DoubleGt,
            "@" => Symbol::At,
            "#" => Symbol::Pound,
            _ => return None,
        };
        Some(symbol)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Symbol::LeftParen => "(",
            Symbol::RightParen => ")",
            Symbol::LeftBrace => "{",
            Symbol::RightBrace => "}",
            Symbol::LeftBracket => "[",
            Symbol::RightBracket => "]",
            Symbol::Semi => ";",
            Symbol::Comma => ",",
            Symbol::Dot => ".",
            Symbol::DoubleDot => "..",
            Symbol::Plus => "+",
            Symbol::Sub => "-",
            Symbol::Star => "*",
            Symbol::Slash => "/",
            Symbol::Question => "?",
            Symbol::Eq => "=",
            Symbol::Gt => ">",
            Symbol::Lt => "<",
            Symbol::Bang => "!",
            Symbol::Tilde => "~",
            Symbol::Caret => "^",
            Symbol::Percent => "%",
            Symbol::Colon => ":",
            Symbol::DoubleColon => "::",
            Symbol::ColonEq => ":=",
            Symbol::LtEq => "<=",
            Symbol::GtEq => ">=",
            Symbol::LtEqGt => "<=>",
            Symbol::LtGt => "<>",
            Symbol::BangEq => "!=",
            Symbol::BangGt => "!>",
            Symbol::BangLt => "!<",
            Symbol::Amp => "&",
            Symbol::Bar => "|",
            Symbol::DoubleAmp => "&&",
            Symbol::DoubleBar => "||",
            Symbol::DoubleLt => "<<",
            Symbol::DoubleGt => ">>",
            Symbol::At => "@",
            Symbol::Pound => "#",
        }
    }

    /// Characters that may start or continue a symbol
    pub fn is_symbol_char(ch: u8) -> bool {
        matches!(
            ch,
            b'(' | b')'
                | b'['
                | b']'
                | b'{'
                | b'}'
                | b'+'
                | b'-'
                | b'*'
                | b'/'
                | b'%'
                | b'^'
                | b'='
                | b'>'
                | b'<'
                | b'~'
                | b'!'
                | b'?'
                | b'&'
                | b'|'
                | b'.'
                | b':'
                | b'#'
                | b','
                | b';'
                | b'@'
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    Identifier,
    Variable,
    Chars,
    Hex,
    Int,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assist {
    End,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    Keyword(Keyword),
    Literal(Literal),
    Symbol(Symbol),
    Assist(Assist),
}

impl From<Keyword> for TokenType {
    fn from(keyword: Keyword) -> Self {
        TokenType::Keyword(keyword)
    }
}

impl From<Symbol> for TokenType {
    fn from(symbol: Symbol) -> Self {
        TokenType::Symbol(symbol)
    }
}

impl From<Literal> for TokenType {
    fn from(literal: Literal) -> Self {
        TokenType::Literal(literal)
    }
}

impl From<Assist> for TokenType {
    fn from(assist: Assist) -> Self {
        TokenType::Assist(assist)
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Keyword(k) => write!(f, "{}", k.as_str()),
            TokenType::Symbol(s) => write!(f, "'{}'", s.as_str()),
            TokenType::Literal(l) => write!(f, "{:?}", l),
            TokenType::Assist(a) => write!(f, "{:?}", a),
        }
    }
}

/// A lexed token; positions are byte offsets into the SQL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub token_type: TokenType,
    pub literals: String,
    pub begin_position: usize,
    pub end_position: usize,
}

impl Token {
    pub fn new(
        token_type: impl Into<TokenType>,
        literals: impl Into<String>,
        begin_position: usize,
        end_position: usize,
    ) -> Self {
        Self {
            token_type: token_type.into(),
            literals: literals.into(),
            begin_position,
            end_position,
        }
    }

    pub fn is_end(&self) -> bool {
        self.token_type == TokenType::Assist(Assist::End)
    }
}
