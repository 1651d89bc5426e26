//! SQL identifier recognition.
//!
//! Table and column references handed to borm are either plain identifiers
//! (`name`, `test.name`, `` `name` ``, `"Name"`) which get quoted for the active dialect,
//! or anything else (`count(1)`, `age+1`, a join expression) which is emitted verbatim.
//!
//! - Unquoted parts match `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts use `"` or `` ` `` and escape the quote by doubling it

use crate::dialect::Dialect;

/// A dotted SQL identifier with its quoting stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub parts: Vec<String>,
}

impl Ident {
    /// Parse a reference; `None` means it is an expression, not an identifier.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() || s.contains('\0') {
            return None;
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();

        while chars.peek().is_some() {
            // Consume '.' between parts (but require there is a next part).
            if !parts.is_empty() {
                match chars.next() {
                    Some('.') if chars.peek().is_some() => {}
                    _ => return None,
                }
            }

            // Quoted identifier part.
            if let Some(&q) = chars.peek().filter(|c| matches!(**c, '"' | '`')) {
                chars.next();
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some(c) if c == q => {
                            // Escaped quote: "" or ``
                            if chars.peek() == Some(&q) {
                                chars.next();
                                name.push(q);
                            } else {
                                break;
                            }
                        }
                        Some(c) => name.push(c),
                        None => return None,
                    }
                }
                if name.is_empty() {
                    return None;
                }
                parts.push(name);
                continue;
            }

            // Unquoted identifier part.
            let mut name = String::new();
            while let Some(&c) = chars.peek() {
                if c == '.' {
                    break;
                }
                let ok = if name.is_empty() {
                    c == '_' || c.is_ascii_alphabetic()
                } else {
                    c == '_' || c == '$' || c.is_ascii_alphanumeric()
                };
                if !ok {
                    return None;
                }
                name.push(c);
                chars.next();
            }
            if name.is_empty() {
                return None;
            }
            parts.push(name);
        }

        if parts.is_empty() {
            return None;
        }
        Some(Self { parts })
    }

    /// Render with every part quoted for `dialect`.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.parts
            .iter()
            .map(|p| dialect.quote_identifier(p))
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Render a table/column reference: identifiers are quoted, expressions pass through
/// (with backticks rewritten for the dialect).
pub fn render_ref(reference: &str, dialect: Dialect) -> String {
    match Ident::parse(reference) {
        Some(ident) => ident.to_sql(dialect),
        None => dialect.normalize(reference).into_owned(),
    }
}
