use std::collections::HashMap;

/// Piece of rewritten SQL: fixed text, or a logic table resolved per unit
#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literals(String),
    Table {
        logic_table: String,
        original_literals: String,
    },
}

/// Rewritten SQL with table placeholders, rendered once per routed unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlBuilder {
    segments: Vec<Segment>,
}

impl SqlBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_literals(&mut self, literals: &str) {
        if literals.is_empty() {
            return;
        }
        match self.segments.last_mut() {
            Some(Segment::Literals(current)) => current.push_str(literals),
            _ => self.segments.push(Segment::Literals(literals.to_string())),
        }
    }

    /// Placeholder for `logic_table`, written in the source as `original_literals`
    pub fn append_table(&mut self, logic_table: &str, original_literals: &str) {
        self.segments.push(Segment::Table {
            logic_table: logic_table.to_string(),
            original_literals: original_literals.to_string(),
        });
    }

    /// Render with actual tables keyed by lower-cased logic table name.
    ///
    /// Unmapped tables keep their original text; quoting of mapped tables
    /// is carried over to the actual name.
    pub fn to_sql(&self, table_tokens: &HashMap<String, String>) -> String {
        let mut result = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literals(literals) => result.push_str(literals),
                Segment::Table {
                    logic_table,
                    original_literals,
                } => match table_tokens.get(&logic_table.to_lowercase()) {
                    Some(actual_table) => result.push_str(&requote(original_literals, actual_table)),
                    None => result.push_str(original_literals),
                },
            }
        }
        result
    }
}

fn requote(original_literals: &str, actual_table: &str) -> String {
    let mut chars = original_literals.chars();
    match (chars.next(), chars.last()) {
        (Some(open @ ('`' | '"')), Some(close)) if close == open => format!("{}{}{}", open, actual_table, close),
        (Some('['), Some(']')) => format!("[{}]", actual_table),
        _ => actual_table.to_string(),
    }
}
