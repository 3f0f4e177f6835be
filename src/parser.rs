//! HCL parsing on top of `hcl-edit`, plus the expression queries the schema
//! translation needs.

use crate::error::ParserError;
use hcl_edit::expr::{Expression, FuncCall, TraversalOperator};
use hcl_edit::structure::Body;
use hcl_edit::Span;
use miette::NamedSource;

/// Parses one `.tf` file. The name is only used to label diagnostics.
#[derive(Debug)]
pub struct Parser<'a> {
    source_text: &'a str,
    name: String,
}

impl<'a> Parser<'a> {
    pub fn new(source_text: &'a str) -> Self {
        Self::new_with_name(source_text, "main.tf".to_string())
    }

    pub fn new_with_name(source_text: &'a str, name: String) -> Self {
        Self { source_text, name }
    }

    pub fn parse_body(&self) -> Result<Body, ParserError> {
        hcl_edit::parser::parse_body(self.source_text).map_err(|err| {
            let offset = err.location().offset().min(self.source_text.len());
            let len = usize::from(offset < self.source_text.len());
            ParserError::InvalidSyntax {
                src: NamedSource::new(self.name.clone(), self.source_text.to_string()),
                span: (offset, len).into(),
                message: err.message().to_string(),
            }
        })
    }
}

/// Structural queries on `hcl-edit` expressions.
pub trait ExpressionExt {
    /// Strips any number of wrapping parentheses.
    fn unwrapped(&self) -> &Expression;

    /// The name in `var.<name>`, if that is all this expression is.
    fn input_variable(&self) -> Option<&str>;

    /// A call to a built-in (non-namespaced) function, with its name.
    fn builtin_call(&self) -> Option<(&str, &FuncCall)>;

    /// The exact text this expression was parsed from.
    fn source_text<'s>(&self, source: &'s str) -> &'s str;
}

impl ExpressionExt for Expression {
    fn unwrapped(&self) -> &Expression {
        match self {
            Expression::Parenthesis(inner) => inner.inner().unwrapped(),
            _ => self,
        }
    }

    fn input_variable(&self) -> Option<&str> {
        let Expression::Traversal(traversal) = self.unwrapped() else {
            return None;
        };
        match (&traversal.expr, traversal.operators.as_slice()) {
            (Expression::Variable(root), [operator]) if root.as_str() == "var" => {
                match operator.value() {
                    TraversalOperator::GetAttr(name) => Some(name.as_str()),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn builtin_call(&self) -> Option<(&str, &FuncCall)> {
        match self.unwrapped() {
            Expression::FuncCall(call) if call.name.namespace.is_empty() => {
                Some((call.name.name.as_str(), call))
            }
            _ => None,
        }
    }

    fn source_text<'s>(&self, source: &'s str) -> &'s str {
        self.span()
            .and_then(|range| source.get(range))
            .unwrap_or_default()
    }
}

/// Arguments of a call, in order. `None` when the last one is expanded
/// with `...`, since its arity is then unknown.
pub fn call_args(call: &FuncCall) -> Option<Vec<&Expression>> {
    if call.args.expand_final() {
        return None;
    }
    Some(call.args.iter().collect())
}
