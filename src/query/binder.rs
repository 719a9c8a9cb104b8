use crate::core::{RepoError, Result, Value};
use crate::expr::ExpressionEvaluator;
use crate::query::template::{PlaceholderKind, QueryTemplate};

/// Invocation arguments, in method declaration order.
///
/// Named placeholders resolve by entry name; indexed placeholders by
/// entry position; expression placeholders see the whole array,
/// zero-indexed.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    entries: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.entries.push((name.into(), value.into()));
        self
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((name.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn by_name(&self, name: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Zero-based positional lookup, in declaration order.
    pub fn by_position(&self, index: usize) -> Option<&Value> {
        self.entries.get(index).map(|(_, v)| v)
    }

    /// The full argument array handed to expression evaluation.
    pub fn values(&self) -> Vec<Value> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }
}

/// A query template bound to one invocation's values.
///
/// `params` is aligned to the template's slot order: every placeholder
/// occurrence in the statement text draws from exactly one entry here,
/// whatever surface syntax it was declared with.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundStatement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Resolves every placeholder slot of `template` to a positional value.
///
/// Expressions are evaluated here, immediately before statement
/// construction; argument values vary per call, so evaluation can never
/// happen at definition time.
pub fn bind(
    template: &QueryTemplate,
    arguments: &Arguments,
    evaluator: &dyn ExpressionEvaluator,
) -> Result<BoundStatement> {
    let slots = template.slots();
    let needs_expressions = slots
        .iter()
        .any(|s| matches!(s, PlaceholderKind::Expression(_)));
    let expression_args = if needs_expressions {
        arguments.values()
    } else {
        Vec::new()
    };

    let mut params = Vec::with_capacity(slots.len());
    for slot in slots {
        let value = match slot {
            PlaceholderKind::Named(name) => arguments
                .by_name(name)
                .cloned()
                .ok_or_else(|| RepoError::Binding(format!("No argument named '{name}'")))?,
            PlaceholderKind::Indexed(index) => arguments
                .by_position(index - 1)
                .cloned()
                .ok_or_else(|| {
                    RepoError::Binding(format!(
                        "Positional marker ${index} has no argument; {} provided",
                        arguments.len()
                    ))
                })?,
            PlaceholderKind::Expression(expression) => evaluator
                .evaluate(expression, &expression_args)
                .map_err(|e| RepoError::Binding(e.to_string()))?,
        };
        params.push(value);
    }

    Ok(BoundStatement {
        sql: template.sql().to_string(),
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{FnEvaluator, NoExpressions};

    #[test]
    fn test_named_binding_in_template_order() {
        let template =
            QueryTemplate::parse("SELECT * FROM t WHERE b = :b AND a = :a").unwrap();
        // Argument declaration order deliberately reversed.
        let args = Arguments::new().with("a", 1i64).with("b", 2i64);

        let bound = bind(&template, &args, &NoExpressions).unwrap();
        assert_eq!(bound.params, vec![Value::Integer(2), Value::Integer(1)]);
        assert_eq!(bound.sql, "SELECT * FROM t WHERE b = $1 AND a = $2");
    }

    #[test]
    fn test_missing_named_argument() {
        let template = QueryTemplate::parse("SELECT * FROM t WHERE a = :a").unwrap();
        let err = bind(&template, &Arguments::new(), &NoExpressions).unwrap_err();
        assert!(err.is_binding());
    }

    #[test]
    fn test_indexed_binding_by_declaration_order() {
        let template = QueryTemplate::parse("SELECT * FROM t WHERE a = $1 AND b = $2").unwrap();
        let args = Arguments::new().with("first", "x").with("second", "y");

        let bound = bind(&template, &args, &NoExpressions).unwrap();
        assert_eq!(bound.params, vec![Value::text("x"), Value::text("y")]);
    }

    #[test]
    fn test_indexed_out_of_range() {
        let template = QueryTemplate::parse("SELECT * FROM t WHERE a = $3").unwrap();
        let args = Arguments::new().with("only", 1i64);
        let err = bind(&template, &args, &NoExpressions).unwrap_err();
        assert!(err.is_binding());
    }

    #[test]
    fn test_expression_sees_zero_indexed_arguments() {
        let template = QueryTemplate::parse("SELECT * FROM t WHERE a = :#{[1]}").unwrap();
        let args = Arguments::new().with("x", 10i64).with("y", 20i64);

        let evaluator = FnEvaluator::new(|expr, values| {
            assert_eq!(expr, "[1]");
            Ok(values[1].clone())
        });

        let bound = bind(&template, &args, &evaluator).unwrap();
        assert_eq!(bound.params, vec![Value::Integer(20)]);
    }

    #[test]
    fn test_expression_failure_is_binding_error() {
        let template = QueryTemplate::parse("SELECT * FROM t WHERE a = :#{boom}").unwrap();
        let err = bind(&template, &Arguments::new(), &NoExpressions).unwrap_err();
        assert!(err.is_binding());
    }

    #[test]
    fn test_mixed_named_and_expression() {
        let template =
            QueryTemplate::parse("UPDATE t SET a = :a WHERE b = :#{[0]}").unwrap();
        let args = Arguments::new().with("a", "new");

        let evaluator = FnEvaluator::new(|_, values| Ok(values[0].clone()));
        let bound = bind(&template, &args, &evaluator).unwrap();

        assert_eq!(bound.params, vec![Value::text("new"), Value::text("new")]);
    }

    #[test]
    fn test_repeated_placeholder_binds_once() {
        let template = QueryTemplate::parse("SELECT * FROM t WHERE a = :v OR b = :v").unwrap();
        let args = Arguments::new().with("v", 5i64);

        let bound = bind(&template, &args, &NoExpressions).unwrap();
        assert_eq!(bound.params, vec![Value::Integer(5)]);
    }
}
