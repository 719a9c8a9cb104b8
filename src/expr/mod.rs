use thiserror::Error;

use crate::core::Value;

/// Failure reported by the expression collaborator.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Expression '{expression}' failed: {message}")]
pub struct EvaluationError {
    pub expression: String,
    pub message: String,
}

impl EvaluationError {
    pub fn new(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            message: message.into(),
        }
    }
}

/// Integration contract for the external expression-language evaluator.
///
/// `:#{expr}` placeholders are resolved through this trait: the evaluator
/// receives the expression text and the full invocation argument array
/// (zero-indexed) and returns a single bound value. Evaluation happens
/// immediately before statement construction, never at definition time.
///
/// The crate deliberately ships no expression language of its own; wire
/// in whatever engine the application uses via [`FnEvaluator`] or a
/// custom implementation.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, arguments: &[Value])
    -> Result<Value, EvaluationError>;
}

/// Adapts a closure into an [`ExpressionEvaluator`].
pub struct FnEvaluator<F>(F);

impl<F> FnEvaluator<F>
where
    F: Fn(&str, &[Value]) -> Result<Value, EvaluationError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> ExpressionEvaluator for FnEvaluator<F>
where
    F: Fn(&str, &[Value]) -> Result<Value, EvaluationError> + Send + Sync,
{
    fn evaluate(
        &self,
        expression: &str,
        arguments: &[Value],
    ) -> Result<Value, EvaluationError> {
        (self.0)(expression, arguments)
    }
}

/// Default evaluator for factories with no expression engine wired in.
/// Any expression placeholder fails the invocation.
pub struct NoExpressions;

impl ExpressionEvaluator for NoExpressions {
    fn evaluate(
        &self,
        expression: &str,
        _arguments: &[Value],
    ) -> Result<Value, EvaluationError> {
        Err(EvaluationError::new(
            expression,
            "no expression evaluator registered",
        ))
    }
}
