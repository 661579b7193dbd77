// SQL Lexer
//
// Hand-written, dialect-aware tokenizer. The lexer holds exactly one current
// token; `next_token` advances by one and is called once on construction.
// Lexing never fails: unmatched input yields an `Assist::Error` token and the
// parser decides what to do with it.

use super::dialect::DatabaseType;
use super::token::{Assist, Literal, Symbol, Token, TokenType};

/// Returned when reading past the end of input
const EOI: u8 = 0x1A;

#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    database_type: DatabaseType,
    offset: usize,
    current_token: Token,
}

impl<'a> Lexer<'a> {
    /// Create a lexer primed on the first token
    pub fn new(input: &'a str, database_type: DatabaseType) -> Self {
        let mut lexer = Self {
            input,
            database_type,
            offset: 0,
            current_token: Token::new(Assist::End, "", 0, 0),
        };
        lexer.next_token();
        lexer
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    pub fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    pub fn current_token(&self) -> &Token {
        &self.current_token
    }

    /// Advance exactly one token
    pub fn next_token(&mut self) {
        self.skip_ignored_token();
        let tokenizer = Tokenizer::new(self.input, self.database_type, self.offset);
        let token = if self.is_variable_begin() {
            tokenizer.scan_variable()
        } else if self.is_n_chars_begin() {
            tokenizer.scan_chars(self.offset + 1)
        } else if is_identifier_begin(self.char_at(0)) {
            tokenizer.scan_identifier()
        } else if self.is_hex_begin() {
            tokenizer.scan_hex()
        } else if self.is_number_begin() {
            tokenizer.scan_number()
        } else if Symbol::is_symbol_char(self.char_at(0)) {
            tokenizer.scan_symbol()
        } else if matches!(self.char_at(0), b'\'' | b'"') {
            tokenizer.scan_chars(self.offset)
        } else if self.offset >= self.input.len() {
            Token::new(Assist::End, "", self.input.len(), self.input.len())
        } else {
            tokenizer.error(self.offset + 1)
        };
        self.offset = token.end_position;
        self.current_token = token;
    }

    fn skip_ignored_token(&mut self) {
        self.offset = self.tokenizer().skip_whitespace();
        while self.is_hint_begin() {
            self.offset = self.tokenizer().skip_block_comment();
            self.offset = self.tokenizer().skip_whitespace();
        }
        while self.is_comment_begin() {
            self.offset = self.tokenizer().skip_comment();
            self.offset = self.tokenizer().skip_whitespace();
        }
    }

    fn tokenizer(&self) -> Tokenizer<'a> {
        Tokenizer::new(self.input, self.database_type, self.offset)
    }

    fn is_hint_begin(&self) -> bool {
        match self.database_type.hint_prefix() {
            Some(prefix) => self.input.as_bytes()[self.offset.min(self.input.len())..].starts_with(prefix.as_bytes()),
            None => false,
        }
    }

    fn is_comment_begin(&self) -> bool {
        let current = self.char_at(0);
        let next = self.char_at(1);
        (current == b'/' && next == b'/')
            || (current == b'-' && next == b'-')
            || (current == b'/' && next == b'*')
            || (current == b'#' && self.database_type.supports_hash_comments())
    }

    fn is_variable_begin(&self) -> bool {
        self.database_type.supports_variables() && self.char_at(0) == b'@'
    }

    fn is_n_chars_begin(&self) -> bool {
        self.database_type.supports_n_chars() && self.char_at(0) == b'N' && self.char_at(1) == b'\''
    }

    fn is_hex_begin(&self) -> bool {
        self.char_at(0) == b'0' && matches!(self.char_at(1), b'x' | b'X')
    }

    /// A leading `.` or `-` only starts a number when it does not follow an
    /// identifier character, so `a-1` stays three tokens
    fn is_number_begin(&self) -> bool {
        let current = self.char_at(0);
        let next = self.char_at(1);
        let after_identifier = self.offset > 0 && is_identifier_char(self.char_at(-1));
        current.is_ascii_digit()
            || (current == b'.' && next.is_ascii_digit() && !after_identifier)
            || (current == b'-' && (next == b'.' || next.is_ascii_digit()) && !after_identifier)
    }

    fn char_at(&self, delta: isize) -> u8 {
        char_at(self.input.as_bytes(), self.offset as isize + delta)
    }
}

fn char_at(bytes: &[u8], position: isize) -> u8 {
    if position < 0 {
        return EOI;
    }
    bytes.get(position as usize).copied().unwrap_or(EOI)
}

fn is_identifier_begin(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'`' || ch == b'_' || ch == b'$' || ch >= 0x80
}

fn is_identifier_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$' || ch == b'#' || ch >= 0x80
}

/// Scans one token starting at a fixed offset
struct Tokenizer<'a> {
    input: &'a str,
    bytes: &'a [u8],
    database_type: DatabaseType,
    offset: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str, database_type: DatabaseType, offset: usize) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            database_type,
            offset,
        }
    }

    fn at(&self, position: usize) -> u8 {
        char_at(self.bytes, position as isize)
    }

    fn skip_whitespace(&self) -> usize {
        let mut position = self.offset;
        while position < self.bytes.len() && self.bytes[position].is_ascii_whitespace() {
            position += 1;
        }
        position
    }

    fn skip_comment(&self) -> usize {
        if self.at(self.offset) == b'/' && self.at(self.offset + 1) == b'*' {
            return self.skip_block_comment();
        }
        let mut position = self.offset;
        while position < self.bytes.len() && self.bytes[position] != b'\n' {
            position += 1;
        }
        (position + 1).min(self.bytes.len())
    }

    /// Skip `/* ... */`, hint blocks included; an unclosed block runs to the end
    fn skip_block_comment(&self) -> usize {
        let body = self.offset + 2;
        match self.input.get(body..).and_then(|rest| rest.find("*/")) {
            Some(found) => body + found + 2,
            None => self.bytes.len(),
        }
    }

    fn scan_variable(&self) -> Token {
        let mut position = self.offset + 1;
        if self.at(position) == b'@' {
            position += 1;
        }
        while is_identifier_char(self.at(position)) {
            position += 1;
        }
        self.token(Literal::Variable, position)
    }

    fn scan_identifier(&self) -> Token {
        if self.at(self.offset) == b'`' {
            return match self.input.get(self.offset + 1..).and_then(|rest| rest.find('`')) {
                Some(found) => self.token(Literal::Identifier, self.offset + 1 + found + 1),
                None => self.error(self.bytes.len()),
            };
        }
        let mut position = self.offset;
        while is_identifier_char(self.at(position)) {
            position += 1;
        }
        let literals = &self.input[self.offset..position];
        let upper = literals.to_uppercase();
        if (upper == "ORDER" || upper == "GROUP") && !self.is_followed_by_by(position) {
            return self.token(Literal::Identifier, position);
        }
        match self.database_type.keyword(&upper) {
            Some(keyword) => Token::new(keyword, literals, self.offset, position),
            None => self.token(Literal::Identifier, position),
        }
    }

    fn is_followed_by_by(&self, position: usize) -> bool {
        let mut position = position;
        while self.at(position).is_ascii_whitespace() {
            position += 1;
        }
        self.at(position).eq_ignore_ascii_case(&b'b')
            && self.at(position + 1).eq_ignore_ascii_case(&b'y')
            && !is_identifier_char(self.at(position + 2))
    }

    fn scan_hex(&self) -> Token {
        let mut position = self.offset + 2;
        while self.at(position).is_ascii_hexdigit() {
            position += 1;
        }
        self.token(Literal::Hex, position)
    }

    fn scan_number(&self) -> Token {
        let mut position = self.offset;
        let mut is_float = false;
        if self.at(position) == b'-' {
            position += 1;
        }
        while self.at(position).is_ascii_digit() {
            position += 1;
        }
        if self.at(position) == b'.' && self.at(position + 1).is_ascii_digit() {
            is_float = true;
            position += 1;
            while self.at(position).is_ascii_digit() {
                position += 1;
            }
        }
        if matches!(self.at(position), b'e' | b'E') {
            let sign = usize::from(matches!(self.at(position + 1), b'+' | b'-'));
            if self.at(position + 1 + sign).is_ascii_digit() {
                is_float = true;
                position += 1 + sign;
                while self.at(position).is_ascii_digit() {
                    position += 1;
                }
            }
        }
        if matches!(self.at(position), b'f' | b'F' | b'd' | b'D') && !is_identifier_char(self.at(position + 1)) {
            is_float = true;
            position += 1;
        }
        let literal = if is_float { Literal::Float } else { Literal::Int };
        self.token(literal, position)
    }

    /// Longest symbol first
    fn scan_symbol(&self) -> Token {
        for length in (1..=3).rev() {
            let end = self.offset + length;
            if end > self.bytes.len() || !self.bytes[self.offset..end].iter().all(|c| Symbol::is_symbol_char(*c)) {
                continue;
            }
            if let Some(symbol) = Symbol::from_literals(&self.input[self.offset..end]) {
                return Token::new(symbol, symbol.as_str(), self.offset, end);
            }
        }
        self.error(self.offset + 1)
    }

    /// Quoted string; `quote_position` is past an `N` prefix when present.
    /// Doubled quotes collapse to one; MySQL backslash escapes are kept verbatim
    fn scan_chars(&self, quote_position: usize) -> Token {
        let quote = self.at(quote_position);
        let mut literals = String::new();
        let mut position = quote_position + 1;
        let mut segment_start = position;
        loop {
            if position >= self.bytes.len() {
                return self.error(self.bytes.len());
            }
            let ch = self.bytes[position];
            if ch == b'\\' && self.database_type.is_mysql_family() {
                position += 2;
                continue;
            }
            if ch == quote {
                if self.at(position + 1) == quote {
                    literals.push_str(&self.input[segment_start..=position]);
                    position += 2;
                    segment_start = position;
                    continue;
                }
                literals.push_str(&self.input[segment_start..position]);
                position += 1;
                break;
            }
            position += 1;
        }
        Token::new(Literal::Chars, literals, self.offset, position)
    }

    fn token(&self, literal: Literal, end: usize) -> Token {
        Token::new(literal, &self.input[self.offset..end], self.offset, end)
    }

    fn error(&self, end: usize) -> Token {
        let end = end.min(self.bytes.len()).max(self.offset);
        let literals = self.input.get(self.offset..end).unwrap_or_default();
        Token::new(TokenType::Assist(Assist::Error), literals, self.offset, end)
    }
}
