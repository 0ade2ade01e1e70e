//! SQL identifier parsing.
//!
//! Builders accept field and table names verbatim, since they routinely carry
//! expressions (`COUNT(*)`, `u.name AS author`). [`Ident`] is used where the
//! crate itself must tell a plain column from an expression, or must embed a
//! name into SQL it issues on its own (catalog lookups).
//!
//! - Unquoted parts: `[A-Za-z_][A-Za-z0-9_$]*`
//! - Quoted parts (`"..."` or `` `...` ``): any characters except NUL, the
//!   closing quote doubled to escape it

use crate::error::{QbError, QbResult};

/// One dot-separated segment of an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentPart {
    Unquoted(String),
    Quoted(String),
}

impl IdentPart {
    /// The segment's name with quoting removed.
    pub fn name(&self) -> &str {
        match self {
            IdentPart::Unquoted(s) | IdentPart::Quoted(s) => s,
        }
    }
}

/// A possibly qualified identifier such as `public.users` or `u."Name"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    parts: Vec<IdentPart>,
}

impl Ident {
    pub fn parse(s: &str) -> QbResult<Self> {
        if s.is_empty() {
            return Err(QbError::build("identifier cannot be empty"));
        }
        if s.contains('\0') {
            return Err(QbError::build("identifier cannot contain NUL"));
        }

        let mut parts = Vec::new();
        let mut chars = s.chars().peekable();
        loop {
            let part = match chars.peek() {
                Some(&quote @ ('"' | '`')) => {
                    chars.next();
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some(c) if c == quote => {
                                if chars.peek() == Some(&quote) {
                                    chars.next();
                                    name.push(quote);
                                } else {
                                    break;
                                }
                            }
                            Some(c) => name.push(c),
                            None => {
                                return Err(QbError::build(format!(
                                    "unclosed quoted identifier in '{s}'"
                                )));
                            }
                        }
                    }
                    if name.is_empty() {
                        return Err(QbError::build("empty quoted identifier"));
                    }
                    IdentPart::Quoted(name)
                }
                _ => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        let valid = if name.is_empty() {
                            c == '_' || c.is_ascii_alphabetic()
                        } else {
                            c == '_' || c == '$' || c.is_ascii_alphanumeric()
                        };
                        if !valid {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    if name.is_empty() {
                        return Err(QbError::build(format!("invalid identifier '{s}'")));
                    }
                    IdentPart::Unquoted(name)
                }
            };
            parts.push(part);

            match chars.next() {
                None => break,
                Some('.') if chars.peek().is_some() => {}
                Some(c) => {
                    return Err(QbError::build(format!(
                        "unexpected '{c}' in identifier '{s}'"
                    )));
                }
            }
        }

        Ok(Self { parts })
    }

    pub fn parts(&self) -> &[IdentPart] {
        &self.parts
    }

    /// The unqualified name (last segment).
    pub fn name(&self) -> &str {
        self.parts.last().map_or("", IdentPart::name)
    }

    /// The qualifier directly before the name, if any (`public` in `public.users`).
    pub fn qualifier(&self) -> Option<&str> {
        let n = self.parts.len();
        (n > 1).then(|| self.parts[n - 2].name())
    }

    /// Render with ANSI double quotes around quoted segments.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            match part {
                IdentPart::Unquoted(s) => out.push_str(s),
                IdentPart::Quoted(s) => {
                    out.push('"');
                    out.push_str(&s.replace('"', "\"\""));
                    out.push('"');
                }
            }
        }
        out
    }
}

/// The column a field-list entry selects, with any alias stripped.
///
/// The column text is returned as written, quoting included. Returns `None`
/// for `*`, `t.*` and expressions, which cannot be searched.
pub(crate) fn column_of(field: &str) -> Option<String> {
    let field = field.trim();
    let upper = field.to_ascii_uppercase();
    let column = match upper.rfind(" AS ") {
        Some(pos) => &field[..pos],
        None => match field.split_once(char::is_whitespace) {
            Some((column, _alias)) => column,
            None => field,
        },
    };
    let column = column.trim();
    Ident::parse(column).ok().map(|_| column.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_and_dotted() {
        assert_eq!(Ident::parse("users").expect("ident").to_sql(), "users");
        let dotted = Ident::parse("public.users").expect("ident");
        assert_eq!(dotted.name(), "users");
        assert_eq!(dotted.qualifier(), Some("public"));
    }

    #[test]
    fn test_parse_quoted() {
        let ident = Ident::parse(r#"public."User""Table""#).expect("ident");
        assert_eq!(ident.name(), r#"User"Table"#);
        assert_eq!(ident.to_sql(), r#"public."User""Table""#);
        assert_eq!(Ident::parse("`order`").expect("ident").name(), "order");
    }

    #[test]
    fn test_parse_rejects_invalid() {
        for bad in ["", "1table", "my table", "a..b", "a.", r#""open"#, "COUNT(*)", "*"] {
            assert!(Ident::parse(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_column_of_strips_alias() {
        assert_eq!(column_of("name").as_deref(), Some("name"));
        assert_eq!(column_of("u.email AS contact").as_deref(), Some("u.email"));
        assert_eq!(column_of("u.email contact").as_deref(), Some("u.email"));
        assert_eq!(column_of("*"), None);
        assert_eq!(column_of("u.*"), None);
        assert_eq!(column_of("COUNT(*) AS total"), None);
    }

    #[test]
    fn test_column_of_keeps_quoting() {
        assert_eq!(column_of("`name`").as_deref(), Some("`name`"));
        assert_eq!(column_of(r#"u."Full Name" AS n"#).as_deref(), Some(r#"u."Full Name""#));
    }
}
