pub mod binder;
pub mod template;

use serde::Serialize;

use crate::core::{RepoError, Result};
use crate::expr::ExpressionEvaluator;

pub use binder::{Arguments, BoundStatement};
pub use template::{PlaceholderKind, PlaceholderStyle, QueryTemplate};

/// Declared result shape of a query method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReturnShape {
    /// At most one mapped entity.
    Single,
    /// An unbounded sequence of mapped entities.
    Collection,
    /// A scalar count. For modifying queries: the affected-row count.
    Count,
    /// A boolean. For modifying queries: whether any row was affected.
    Boolean,
    /// Completion only. Legal for modifying queries alone.
    Void,
}

/// An immutable declared query.
///
/// The template is parsed once, here, and the definition is cached by
/// the repository for the process lifetime. Bound statements are built
/// fresh on every invocation.
#[derive(Debug, Clone, Serialize)]
pub struct QueryDefinition {
    name: String,
    template: QueryTemplate,
    modifying: bool,
    shape: ReturnShape,
    partial: bool,
    parameters: Vec<String>,
}

impl QueryDefinition {
    /// Declares a read query. Defaults to a [`ReturnShape::Collection`]
    /// result.
    pub fn new(name: impl Into<String>, template: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            template: QueryTemplate::parse(template)?,
            modifying: false,
            shape: ReturnShape::Collection,
            partial: false,
            parameters: Vec::new(),
        })
    }

    /// Marks the query as data-modifying. Defaults the shape to
    /// [`ReturnShape::Void`] unless one was declared already.
    pub fn modifying(mut self) -> Self {
        if !self.modifying && matches!(self.shape, ReturnShape::Collection) {
            self.shape = ReturnShape::Void;
        }
        self.modifying = true;
        self
    }

    pub fn returns(mut self, shape: ReturnShape) -> Self {
        self.shape = shape;
        self
    }

    /// Marks entity results as a partial projection: absent columns map
    /// to property defaults instead of failing.
    pub fn projecting(mut self) -> Self {
        self.partial = true;
        self
    }

    /// Declares the method's parameter names, in declaration order.
    /// When present, named placeholders are checked against this list at
    /// registration time instead of first failing at call time.
    pub fn parameters<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parameters = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &QueryTemplate {
        &self.template
    }

    pub fn is_modifying(&self) -> bool {
        self.modifying
    }

    pub fn shape(&self) -> ReturnShape {
        self.shape
    }

    pub fn is_partial(&self) -> bool {
        self.partial
    }

    pub fn declared_parameters(&self) -> &[String] {
        &self.parameters
    }

    /// Registration-time validation.
    ///
    /// Shape/modifying mismatches and statically detectable binding
    /// problems are configuration errors here, not call-time failures.
    pub fn validate(&self) -> Result<()> {
        if self.modifying {
            match self.shape {
                ReturnShape::Void | ReturnShape::Count | ReturnShape::Boolean => {}
                other => {
                    return Err(RepoError::Configuration(format!(
                        "Modifying query '{}' cannot return {:?}; legal shapes are Void, Count and Boolean",
                        self.name, other
                    )));
                }
            }
        } else if matches!(self.shape, ReturnShape::Void) {
            return Err(RepoError::Configuration(format!(
                "Read query '{}' must produce a result; Void is reserved for modifying queries",
                self.name
            )));
        }

        if self.partial && !matches!(self.shape, ReturnShape::Single | ReturnShape::Collection) {
            return Err(RepoError::Configuration(format!(
                "Query '{}' declares a projection but does not return entities",
                self.name
            )));
        }

        if !self.parameters.is_empty() {
            for name in self.template.named_parameters() {
                if !self.parameters.iter().any(|p| p == name) {
                    return Err(RepoError::Configuration(format!(
                        "Query '{}' uses placeholder ':{name}' but declares no parameter of that name",
                        self.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Binds this definition's template against invocation arguments.
    pub fn bind(
        &self,
        arguments: &Arguments,
        evaluator: &dyn ExpressionEvaluator,
    ) -> Result<BoundStatement> {
        binder::bind(&self.template, arguments, evaluator)
    }
}
