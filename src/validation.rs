//! Best-effort translation of `validation { condition = ... }` blocks into
//! JSON Schema keywords.
//!
//! Only a handful of common idioms are recognised:
//!
//! - `length(var.x) <op> N` becomes a length bound (`minLength`, `minItems`
//!   or `minProperties`, depending on the variable's type)
//! - `var.x <op> N` becomes `minimum`/`maximum` for numbers
//! - `can(regex("...", var.x))` and `length(regexall("...", var.x)) > 0`
//!   become `pattern`
//! - `contains([...], var.x)` and `var.x == a || var.x == b` become `enum`
//! - `a && b` combines the translations of both sides
//!
//! Anything else yields an [`UnsupportedCondition`]. Callers log it and carry
//! on; a condition that cannot be translated never fails schema generation.

use crate::literal::{expression_to_json, number_to_json};
use crate::parser::{call_args, ExpressionExt};
use crate::types::{CollectionKind, PrimitiveKind, TypeConstraint};
use hcl_edit::expr::{BinaryOperator, Expression};
use serde_json::{Map, Value};
use thiserror::Error;

/// Schema keywords produced by a condition, ready to merge into a node.
pub type Constraints = Map<String, Value>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnsupportedCondition {
    #[error("the condition does not match a known pattern")]
    UnknownPattern,

    #[error("the condition refers to var.{found} instead of var.{expected}")]
    OtherVariable { expected: String, found: String },

    #[error("{keyword} does not apply to a variable of this type")]
    TypeMismatch { keyword: &'static str },

    #[error("the bound {value} is out of range for {keyword}")]
    InvalidBound { keyword: &'static str, value: f64 },

    #[error("the regular expression must be a literal string")]
    NonLiteralPattern,

    #[error("the allowed values must be literals")]
    NonLiteralEnum,
}

/// Translates one validation condition guarding `variable`.
pub fn translate_condition(
    condition: &Expression,
    variable: &str,
    constraint: &TypeConstraint,
) -> Result<Constraints, UnsupportedCondition> {
    ConditionTranslator {
        variable,
        constraint,
    }
    .translate(condition)
}

/// Merges `incoming` into `node` so that both sets of constraints hold.
///
/// Range keywords keep the tighter bound, `enum` lists are intersected, and
/// a second distinct `pattern` goes into `allOf`.
pub fn merge_constraints(node: &mut Map<String, Value>, incoming: Constraints) {
    for (keyword, value) in incoming {
        let Some(existing) = node.get_mut(&keyword) else {
            node.insert(keyword, value);
            continue;
        };
        match keyword.as_str() {
            "minLength" | "minItems" | "minProperties" | "minimum" | "exclusiveMinimum" => {
                if value.as_f64() > existing.as_f64() {
                    *existing = value;
                }
            }
            "maxLength" | "maxItems" | "maxProperties" | "maximum" | "exclusiveMaximum" => {
                if matches!((value.as_f64(), existing.as_f64()), (Some(new), Some(old)) if new < old) {
                    *existing = value;
                }
            }
            "enum" => {
                if let (Value::Array(current), Value::Array(allowed)) = (existing, &value) {
                    current.retain(|v| allowed.contains(v));
                }
            }
            "pattern" => {
                if *existing != value {
                    push_all_of(node, json_object("pattern", value));
                }
            }
            "allOf" => {
                if let Value::Array(schemas) = value {
                    for schema in schemas {
                        push_all_of(node, schema);
                    }
                }
            }
            _ => *existing = value,
        }
    }
}

fn push_all_of(node: &mut Map<String, Value>, schema: Value) {
    let all_of = node
        .entry("allOf")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(schemas) = all_of {
        if !schemas.contains(&schema) {
            schemas.push(schema);
        }
    }
}

fn json_object(keyword: &str, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(keyword.to_string(), value);
    Value::Object(map)
}

struct ConditionTranslator<'a> {
    variable: &'a str,
    constraint: &'a TypeConstraint,
}

/// What a comparison constrains.
enum Subject<'e> {
    Length,
    Value,
    /// `length(regexall(pattern, var.x))`
    RegexMatches(Vec<&'e Expression>),
}

impl ConditionTranslator<'_> {
    fn translate(&self, expr: &Expression) -> Result<Constraints, UnsupportedCondition> {
        let expr = expr.unwrapped();
        if let Expression::BinaryOp(op) = expr {
            return match *op.operator.value() {
                BinaryOperator::And => {
                    let mut constraints = self.translate(&op.lhs_expr)?;
                    merge_constraints(&mut constraints, self.translate(&op.rhs_expr)?);
                    Ok(constraints)
                }
                BinaryOperator::Or => self.equality_chain(expr),
                operator => self.comparison(operator, &op.lhs_expr, &op.rhs_expr),
            };
        }

        let Some((name, call)) = expr.builtin_call() else {
            return Err(UnsupportedCondition::UnknownPattern);
        };
        match (name, call_args(call).as_deref()) {
            ("can", Some([inner])) => self.can(inner),
            ("contains", Some([list, value])) => self.contains(list, value),
            _ => Err(UnsupportedCondition::UnknownPattern),
        }
    }

    /// `var.x <op> N`, `length(var.x) <op> N`, either way round.
    fn comparison(
        &self,
        op: BinaryOperator,
        lhs: &Expression,
        rhs: &Expression,
    ) -> Result<Constraints, UnsupportedCondition> {
        let (op, subject, bound) = match (number_literal(rhs), number_literal(lhs)) {
            (Some(bound), _) => (op, lhs, bound),
            (None, Some(bound)) => (mirrored(op), rhs, bound),
            (None, None) => {
                // `var.x == "a"` is a one-element enum; anything else is unknown.
                return if op == BinaryOperator::Eq {
                    self.equality_chain_values(lhs, rhs).map(enum_constraint)
                } else {
                    Err(UnsupportedCondition::UnknownPattern)
                };
            }
        };

        match self.subject(subject)? {
            Subject::Length => self.length_bounds(op, bound),
            Subject::Value => self.value_bounds(op, bound),
            Subject::RegexMatches(args) => match (op, bound) {
                (BinaryOperator::Greater, b) if b == 0.0 => self.pattern(&args),
                (BinaryOperator::GreaterEq, b) if b == 1.0 => self.pattern(&args),
                _ => Err(UnsupportedCondition::UnknownPattern),
            },
        }
    }

    fn subject<'e>(&self, expr: &'e Expression) -> Result<Subject<'e>, UnsupportedCondition> {
        let Some((name, call)) = expr.builtin_call() else {
            self.expect_own_variable(expr)?;
            return Ok(Subject::Value);
        };
        let args = call_args(call).unwrap_or_default();
        let ("length", [arg]) = (name, args.as_slice()) else {
            return Err(UnsupportedCondition::UnknownPattern);
        };
        let arg: &'e Expression = *arg;
        if let Some(("regexall", inner)) = arg.builtin_call() {
            let args = call_args(inner).ok_or(UnsupportedCondition::UnknownPattern)?;
            return Ok(Subject::RegexMatches(args));
        }
        self.expect_own_variable(arg)?;
        Ok(Subject::Length)
    }

    fn length_bounds(&self, op: BinaryOperator, bound: f64) -> Result<Constraints, UnsupportedCondition> {
        let (min_keyword, max_keyword) = match self.constraint {
            TypeConstraint::Primitive(PrimitiveKind::String) => ("minLength", "maxLength"),
            TypeConstraint::Collection(CollectionKind::List | CollectionKind::Set, _)
            | TypeConstraint::Tuple(_) => ("minItems", "maxItems"),
            TypeConstraint::Collection(CollectionKind::Map, _) | TypeConstraint::Object(_) => {
                ("minProperties", "maxProperties")
            }
            TypeConstraint::Primitive(_) => {
                return Err(UnsupportedCondition::TypeMismatch { keyword: "length" })
            }
        };

        let mut constraints = Constraints::new();
        let mut set = |keyword: &'static str, value: f64| {
            if value < 0.0 || value.fract() != 0.0 {
                return Err(UnsupportedCondition::InvalidBound { keyword, value });
            }
            constraints.insert(keyword.to_string(), Value::from(value as u64));
            Ok(())
        };
        match op {
            BinaryOperator::GreaterEq => set(min_keyword, bound)?,
            BinaryOperator::Greater => set(min_keyword, bound + 1.0)?,
            BinaryOperator::LessEq => set(max_keyword, bound)?,
            BinaryOperator::Less => set(max_keyword, bound - 1.0)?,
            BinaryOperator::Eq => {
                set(min_keyword, bound)?;
                set(max_keyword, bound)?;
            }
            _ => return Err(UnsupportedCondition::UnknownPattern),
        }
        Ok(constraints)
    }

    /// Strict bounds on whole numbers shift by one, like length bounds;
    /// strict bounds on fractions use the exclusive keywords instead.
    fn value_bounds(&self, op: BinaryOperator, bound: f64) -> Result<Constraints, UnsupportedCondition> {
        if !matches!(
            self.constraint,
            TypeConstraint::Primitive(PrimitiveKind::Number | PrimitiveKind::Any)
        ) {
            return Err(UnsupportedCondition::TypeMismatch { keyword: "minimum/maximum" });
        }

        let integral = bound.fract() == 0.0;
        let (keyword, value) = match op {
            BinaryOperator::GreaterEq => ("minimum", bound),
            BinaryOperator::LessEq => ("maximum", bound),
            BinaryOperator::Greater if integral => ("minimum", bound + 1.0),
            BinaryOperator::Less if integral => ("maximum", bound - 1.0),
            BinaryOperator::Greater => ("exclusiveMinimum", bound),
            BinaryOperator::Less => ("exclusiveMaximum", bound),
            BinaryOperator::Eq => return Ok(enum_constraint(vec![number_value(bound)?])),
            _ => return Err(UnsupportedCondition::UnknownPattern),
        };

        let mut constraints = Constraints::new();
        constraints.insert(keyword.to_string(), number_value(value)?);
        Ok(constraints)
    }

    /// `can(regex("pattern", var.x))`
    fn can(&self, inner: &Expression) -> Result<Constraints, UnsupportedCondition> {
        match inner.builtin_call() {
            Some(("regex", call)) => {
                let args = call_args(call).ok_or(UnsupportedCondition::UnknownPattern)?;
                self.pattern(&args)
            }
            _ => Err(UnsupportedCondition::UnknownPattern),
        }
    }

    fn pattern(&self, args: &[&Expression]) -> Result<Constraints, UnsupportedCondition> {
        let [pattern, subject] = args else {
            return Err(UnsupportedCondition::UnknownPattern);
        };
        self.expect_own_variable(subject)?;
        if !matches!(
            self.constraint,
            TypeConstraint::Primitive(PrimitiveKind::String | PrimitiveKind::Any)
        ) {
            return Err(UnsupportedCondition::TypeMismatch { keyword: "pattern" });
        }
        let Expression::String(pattern) = pattern.unwrapped() else {
            return Err(UnsupportedCondition::NonLiteralPattern);
        };
        let mut constraints = Constraints::new();
        constraints.insert("pattern".to_string(), Value::String(pattern.value().clone()));
        Ok(constraints)
    }

    /// `contains(["a", "b"], var.x)`
    fn contains(&self, list: &Expression, value: &Expression) -> Result<Constraints, UnsupportedCondition> {
        self.expect_own_variable(value)?;
        match expression_to_json(list.unwrapped()) {
            Ok(Value::Array(values)) => Ok(enum_constraint(values)),
            Ok(_) => Err(UnsupportedCondition::UnknownPattern),
            Err(_) => Err(UnsupportedCondition::NonLiteralEnum),
        }
    }

    /// `var.x == "a" || var.x == "b" || ...`
    fn equality_chain(&self, expr: &Expression) -> Result<Constraints, UnsupportedCondition> {
        let mut values = Vec::new();
        self.collect_equalities(expr, &mut values)?;
        Ok(enum_constraint(values))
    }

    fn collect_equalities(&self, expr: &Expression, values: &mut Vec<Value>) -> Result<(), UnsupportedCondition> {
        let Expression::BinaryOp(op) = expr.unwrapped() else {
            return Err(UnsupportedCondition::UnknownPattern);
        };
        match *op.operator.value() {
            BinaryOperator::Or => {
                self.collect_equalities(&op.lhs_expr, values)?;
                self.collect_equalities(&op.rhs_expr, values)
            }
            BinaryOperator::Eq => {
                values.extend(self.equality_chain_values(&op.lhs_expr, &op.rhs_expr)?);
                Ok(())
            }
            _ => Err(UnsupportedCondition::UnknownPattern),
        }
    }

    /// One `var.x == literal` comparison, either way round.
    fn equality_chain_values(&self, lhs: &Expression, rhs: &Expression) -> Result<Vec<Value>, UnsupportedCondition> {
        let literal = if lhs.input_variable().is_some() {
            self.expect_own_variable(lhs)?;
            rhs
        } else {
            self.expect_own_variable(rhs)?;
            lhs
        };
        expression_to_json(literal.unwrapped())
            .map(|value| vec![value])
            .map_err(|_| UnsupportedCondition::NonLiteralEnum)
    }

    fn expect_own_variable(&self, expr: &Expression) -> Result<(), UnsupportedCondition> {
        match expr.input_variable() {
            Some(name) if name == self.variable => Ok(()),
            Some(name) => Err(UnsupportedCondition::OtherVariable {
                expected: self.variable.to_string(),
                found: name.to_string(),
            }),
            None => Err(UnsupportedCondition::UnknownPattern),
        }
    }
}

/// `a < b` is `b > a`.
fn mirrored(op: BinaryOperator) -> BinaryOperator {
    match op {
        BinaryOperator::Less => BinaryOperator::Greater,
        BinaryOperator::LessEq => BinaryOperator::GreaterEq,
        BinaryOperator::Greater => BinaryOperator::Less,
        BinaryOperator::GreaterEq => BinaryOperator::LessEq,
        other => other,
    }
}

fn number_literal(expr: &Expression) -> Option<f64> {
    match expression_to_json(expr.unwrapped()).ok()? {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn number_value(n: f64) -> Result<Value, UnsupportedCondition> {
    number_to_json(n).ok_or(UnsupportedCondition::InvalidBound {
        keyword: "number",
        value: n,
    })
}

/// Duplicates are dropped, keeping first occurrences in order.
fn enum_constraint(values: Vec<Value>) -> Constraints {
    let mut unique: Vec<Value> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    let mut constraints = Constraints::new();
    constraints.insert("enum".to_string(), Value::Array(unique));
    constraints
}
