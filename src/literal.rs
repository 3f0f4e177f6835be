use crate::parser::ExpressionExt;
use hcl_edit::expr::{Expression, ObjectKey, UnaryOperator};
use hcl_edit::template::Element;
use hcl_edit::Span;
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// An expression that needs the configuration engine to evaluate.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{kind} cannot be evaluated statically")]
pub struct NonLiteral {
    pub kind: &'static str,
    pub span: Option<std::ops::Range<usize>>,
}

impl NonLiteral {
    fn at(kind: &'static str, expr: &Expression) -> Self {
        Self {
            kind,
            span: expr.span(),
        }
    }
}

/// Converts a literal expression into the equivalent JSON value.
///
/// Strings, heredocs without interpolation, numbers, bools and null convert
/// directly; tuples and objects convert element by element. Integral numbers
/// become JSON integers.
pub fn expression_to_json(expr: &Expression) -> Result<Value, NonLiteral> {
    match expr {
        Expression::Null(_) => Ok(Value::Null),
        Expression::Bool(b) => Ok(Value::Bool(*b.value())),
        Expression::Number(n) => hcl_number(n.value()).ok_or_else(|| NonLiteral::at("number", expr)),
        Expression::String(s) => Ok(Value::String(s.value().clone())),
        Expression::Array(elements) => elements
            .iter()
            .map(expression_to_json)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expression::Object(object) => {
            let mut map = Map::new();
            for (key, value) in object.iter() {
                map.insert(object_key(key)?, expression_to_json(value.expr())?);
            }
            Ok(Value::Object(map))
        }
        Expression::Parenthesis(inner) => expression_to_json(inner.inner()),
        Expression::HeredocTemplate(heredoc) => {
            let mut text = String::new();
            for element in heredoc.template.iter() {
                match element {
                    Element::Literal(literal) => text.push_str(literal.value()),
                    _ => return Err(NonLiteral::at("template", expr)),
                }
            }
            Ok(Value::String(text))
        }
        Expression::UnaryOp(op) if *op.operator.value() == UnaryOperator::Neg => {
            match op.expr.unwrapped() {
                Expression::Number(n) => n
                    .value()
                    .as_f64()
                    .and_then(|n| number_to_json(-n))
                    .ok_or_else(|| NonLiteral::at("number", expr)),
                _ => Err(NonLiteral::at("negation of a non-number", expr)),
            }
        }
        Expression::StringTemplate(_) => Err(NonLiteral::at("template", expr)),
        Expression::Variable(_) | Expression::Traversal(_) => Err(NonLiteral::at("reference", expr)),
        Expression::FuncCall(_) => Err(NonLiteral::at("function call", expr)),
        Expression::UnaryOp(_) | Expression::BinaryOp(_) => Err(NonLiteral::at("operation", expr)),
        Expression::Conditional(_) => Err(NonLiteral::at("conditional", expr)),
        Expression::ForExpr(_) => Err(NonLiteral::at("for expression", expr)),
    }
}

/// A bare identifier key is a literal name; any other key is an expression
/// and must itself evaluate to a string.
fn object_key(key: &ObjectKey) -> Result<String, NonLiteral> {
    match key {
        ObjectKey::Ident(ident) => Ok(ident.as_str().to_string()),
        ObjectKey::Expression(expr) => match expression_to_json(expr)? {
            Value::String(s) => Ok(s),
            _ => Err(NonLiteral::at("non-string object key", expr)),
        },
    }
}

fn hcl_number(n: &hcl_edit::Number) -> Option<Value> {
    if let Some(i) = n.as_i64() {
        return Some(Value::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(Value::from(u));
    }
    n.as_f64().and_then(number_to_json)
}

/// Integral values that fit in an `i64` without losing precision stay
/// integers, so `1` renders as `1` rather than `1.0`.
pub(crate) fn number_to_json(n: f64) -> Option<Value> {
    const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        Some(Value::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number)
    }
}
