use serde::Serialize;

use crate::core::{RepoError, Result};

/// How a single placeholder occurrence resolves to a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum PlaceholderKind {
    /// `:identifier`, resolved by argument name.
    Named(String),
    /// `$n`, resolved by argument position (1-based in the template).
    Indexed(usize),
    /// `:#{expr}`, resolved through the expression evaluator.
    Expression(String),
}

/// Overall placeholder dialect of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlaceholderStyle {
    None,
    Named,
    Indexed,
    Expression,
    /// More than one dialect in a single template. Expression + indexed
    /// is rejected at parse time and never reaches this value.
    Mixed,
}

/// A parsed query template.
///
/// Parsing happens once, when the query definition is registered. The
/// scanner walks the template in a single pass, producing a
/// position-ordered slot list and the rewritten SQL the driver sees:
/// every placeholder occurrence becomes a fresh `$k` marker aligned to
/// the slot order.
///
/// Occurrences sharing a key (the same name, the same expression text,
/// or the same `$n` index) share one template-wide slot; the first
/// occurrence decides the slot's position.
///
/// String literals (`'…'`, with `''` escapes), quoted identifiers
/// (`"…"`) and `::` casts are copied through untouched.
#[derive(Debug, Clone, Serialize)]
pub struct QueryTemplate {
    raw: String,
    sql: String,
    slots: Vec<PlaceholderKind>,
}

impl QueryTemplate {
    pub fn parse(template: &str) -> Result<Self> {
        let mut scanner = Scanner::new(template);
        scanner.run()?;

        let slots = scanner.slots;
        let has_indexed = slots
            .iter()
            .any(|s| matches!(s, PlaceholderKind::Indexed(_)));
        let has_expression = slots
            .iter()
            .any(|s| matches!(s, PlaceholderKind::Expression(_)));
        if has_indexed && has_expression {
            return Err(RepoError::Binding(format!(
                "Template mixes expression and positional placeholders: {template}"
            )));
        }

        Ok(Self {
            raw: template.to_string(),
            sql: scanner.sql,
            slots,
        })
    }

    /// The template as declared.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The rewritten statement text submitted to the driver, with
    /// positional `$k` markers aligned to [`Self::slots`].
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Unique parameter slots in first-occurrence order.
    pub fn slots(&self) -> &[PlaceholderKind] {
        &self.slots
    }

    pub fn parameter_count(&self) -> usize {
        self.slots.len()
    }

    /// Names of all named placeholders, in first-occurrence order.
    pub fn named_parameters(&self) -> Vec<&str> {
        self.slots
            .iter()
            .filter_map(|s| match s {
                PlaceholderKind::Named(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn style(&self) -> PlaceholderStyle {
        let mut named = false;
        let mut indexed = false;
        let mut expression = false;
        for slot in &self.slots {
            match slot {
                PlaceholderKind::Named(_) => named = true,
                PlaceholderKind::Indexed(_) => indexed = true,
                PlaceholderKind::Expression(_) => expression = true,
            }
        }
        match (named, indexed, expression) {
            (false, false, false) => PlaceholderStyle::None,
            (true, false, false) => PlaceholderStyle::Named,
            (false, true, false) => PlaceholderStyle::Indexed,
            (false, false, true) => PlaceholderStyle::Expression,
            _ => PlaceholderStyle::Mixed,
        }
    }
}

struct Scanner<'t> {
    chars: std::iter::Peekable<std::str::Chars<'t>>,
    template: &'t str,
    sql: String,
    slots: Vec<PlaceholderKind>,
}

impl<'t> Scanner<'t> {
    fn new(template: &'t str) -> Self {
        Self {
            chars: template.chars().peekable(),
            template,
            sql: String::with_capacity(template.len()),
            slots: Vec::new(),
        }
    }

    fn run(&mut self) -> Result<()> {
        while let Some(c) = self.chars.next() {
            match c {
                '\'' => self.copy_quoted('\'')?,
                '"' => self.copy_quoted('"')?,
                ':' => self.scan_colon()?,
                '$' => self.scan_dollar()?,
                other => self.sql.push(other),
            }
        }
        Ok(())
    }

    /// Copies a quoted region verbatim. Doubled quotes escape.
    fn copy_quoted(&mut self, quote: char) -> Result<()> {
        self.sql.push(quote);
        loop {
            match self.chars.next() {
                Some(c) if c == quote => {
                    self.sql.push(c);
                    if self.chars.peek() == Some(&quote) {
                        self.sql.push(self.chars.next().unwrap());
                        continue;
                    }
                    return Ok(());
                }
                Some(c) => self.sql.push(c),
                None => {
                    return Err(RepoError::Binding(format!(
                        "Unterminated quote in template: {}",
                        self.template
                    )));
                }
            }
        }
    }

    fn scan_colon(&mut self) -> Result<()> {
        match self.chars.peek().copied() {
            // '::' cast, not a placeholder
            Some(':') => {
                self.chars.next();
                self.sql.push_str("::");
                Ok(())
            }
            Some('#') => {
                self.chars.next();
                if self.chars.peek() == Some(&'{') {
                    self.chars.next();
                    self.scan_expression()
                } else {
                    self.sql.push_str(":#");
                    Ok(())
                }
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        self.chars.next();
                    } else {
                        break;
                    }
                }
                self.emit(PlaceholderKind::Named(name));
                Ok(())
            }
            _ => {
                self.sql.push(':');
                Ok(())
            }
        }
    }

    /// Scans the body of `:#{…}` with balanced braces.
    fn scan_expression(&mut self) -> Result<()> {
        let mut depth = 1usize;
        let mut expr = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '{' => {
                    depth += 1;
                    expr.push(c);
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        self.emit(PlaceholderKind::Expression(expr));
                        return Ok(());
                    }
                    expr.push(c);
                }
                _ => expr.push(c),
            }
        }
        Err(RepoError::Binding(format!(
            "Unterminated expression placeholder in template: {}",
            self.template
        )))
    }

    fn scan_dollar(&mut self) -> Result<()> {
        let mut digits = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                digits.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if digits.is_empty() {
            self.sql.push('$');
            return Ok(());
        }
        let index: usize = digits
            .parse()
            .map_err(|_| RepoError::Binding(format!("Invalid positional marker ${digits}")))?;
        if index == 0 {
            return Err(RepoError::Binding(
                "Positional markers start at $1".to_string(),
            ));
        }
        self.emit(PlaceholderKind::Indexed(index));
        Ok(())
    }

    /// Registers the occurrence, reusing the slot of an identical key.
    fn emit(&mut self, kind: PlaceholderKind) {
        let slot = match self.slots.iter().position(|s| *s == kind) {
            Some(existing) => existing,
            None => {
                self.slots.push(kind);
                self.slots.len() - 1
            }
        };
        self.sql.push('$');
        self.sql.push_str(&(slot + 1).to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_placeholders_in_occurrence_order() {
        let t = QueryTemplate::parse("SELECT * FROM person WHERE lastname = :lastname AND age > :age")
            .unwrap();

        assert_eq!(
            t.sql(),
            "SELECT * FROM person WHERE lastname = $1 AND age > $2"
        );
        assert_eq!(
            t.slots(),
            &[
                PlaceholderKind::Named("lastname".into()),
                PlaceholderKind::Named("age".into()),
            ]
        );
        assert_eq!(t.style(), PlaceholderStyle::Named);
    }

    #[test]
    fn test_repeated_name_shares_slot() {
        let t = QueryTemplate::parse("SELECT * FROM t WHERE a = :v OR b = :v").unwrap();

        assert_eq!(t.sql(), "SELECT * FROM t WHERE a = $1 OR b = $1");
        assert_eq!(t.parameter_count(), 1);
    }

    #[test]
    fn test_indexed_markers_renumbered_by_occurrence() {
        let t = QueryTemplate::parse("SELECT * FROM t WHERE a = $2 AND b = $1").unwrap();

        assert_eq!(t.sql(), "SELECT * FROM t WHERE a = $1 AND b = $2");
        assert_eq!(
            t.slots(),
            &[PlaceholderKind::Indexed(2), PlaceholderKind::Indexed(1)]
        );
        assert_eq!(t.style(), PlaceholderStyle::Indexed);
    }

    #[test]
    fn test_expression_placeholder() {
        let t = QueryTemplate::parse("SELECT * FROM t WHERE name = :#{[0].trim()}").unwrap();

        assert_eq!(t.sql(), "SELECT * FROM t WHERE name = $1");
        assert_eq!(
            t.slots(),
            &[PlaceholderKind::Expression("[0].trim()".into())]
        );
        assert_eq!(t.style(), PlaceholderStyle::Expression);
    }

    #[test]
    fn test_expression_with_nested_braces() {
        let t = QueryTemplate::parse(":#{map({a: 1})}").unwrap();
        assert_eq!(
            t.slots(),
            &[PlaceholderKind::Expression("map({a: 1})".into())]
        );
    }

    #[test]
    fn test_named_and_expression_mix_allowed() {
        let t = QueryTemplate::parse("UPDATE t SET a = :a WHERE b = :#{[1]}").unwrap();
        assert_eq!(t.style(), PlaceholderStyle::Mixed);
        assert_eq!(t.parameter_count(), 2);
    }

    #[test]
    fn test_expression_and_indexed_mix_rejected() {
        let err = QueryTemplate::parse("SELECT * FROM t WHERE a = $1 AND b = :#{[0]}").unwrap_err();
        assert!(matches!(err, RepoError::Binding(_)));
    }

    #[test]
    fn test_casts_and_literals_untouched() {
        let t =
            QueryTemplate::parse("SELECT ':fake'::text, \":quoted\" FROM t WHERE a = :real").unwrap();

        assert_eq!(
            t.sql(),
            "SELECT ':fake'::text, \":quoted\" FROM t WHERE a = $1"
        );
        assert_eq!(t.slots(), &[PlaceholderKind::Named("real".into())]);
    }

    #[test]
    fn test_doubled_quote_escape() {
        let t = QueryTemplate::parse("SELECT 'it''s :not_a_param' FROM t").unwrap();
        assert_eq!(t.parameter_count(), 0);
        assert_eq!(t.sql(), "SELECT 'it''s :not_a_param' FROM t");
    }

    #[test]
    fn test_unterminated_literal_rejected() {
        assert!(QueryTemplate::parse("SELECT 'oops FROM t").is_err());
        assert!(QueryTemplate::parse("SELECT :#{unclosed FROM t").is_err());
    }

    #[test]
    fn test_no_placeholders() {
        let t = QueryTemplate::parse("SELECT count(*) FROM person").unwrap();
        assert_eq!(t.style(), PlaceholderStyle::None);
        assert_eq!(t.parameter_count(), 0);
    }
}
