//! Type constraints: the parsed form of a variable's `type` expression.
//!
//! Type expressions reuse the expression grammar: `list(string)` is a call,
//! `object({ a = string })` a call taking an object constructor and `string`
//! a bare identifier. Parsing walks that tree and rejects anything that is
//! not one of the fixed type keywords; it never falls back to `any`.

use crate::literal::expression_to_json;
use crate::parser::{call_args, ExpressionExt};
use hcl_edit::expr::{Expression, ObjectKey};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Number,
    Bool,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Set,
    Map,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeConstraint {
    Primitive(PrimitiveKind),
    Collection(CollectionKind, Box<TypeConstraint>),
    Tuple(Vec<TypeConstraint>),
    /// Attributes in source order.
    Object(Vec<ObjectAttribute>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectAttribute {
    pub name: String,
    pub constraint: TypeConstraint,
    /// Declared through `optional(...)`.
    pub optional: bool,
    /// The second argument of `optional(T, default)`.
    pub default: Option<Value>,
}

impl ObjectAttribute {
    pub fn is_required(&self) -> bool {
        !self.optional && self.default.is_none()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    /// A known keyword used with the wrong shape.
    #[error("malformed type syntax at {path}: {token}")]
    Malformed { path: String, token: String },

    /// A keyword or expression that is not a type.
    #[error("unsupported type expression at {path}: {token}")]
    Unsupported { path: String, token: String },

    /// The default of an `optional(T, default)` attribute is not a literal.
    #[error("default at {path} is not a literal: {expression}")]
    NonLiteralDefault { path: String, expression: String },
}

/// Parses a `type` expression into a constraint tree.
///
/// `source` is the text the expression was parsed from; it is only used to
/// quote the offending token in errors.
pub fn parse_type_constraint(expr: &Expression, source: &str) -> Result<TypeConstraint, TypeError> {
    TypeParser { source }.parse(expr, "root")
}

struct TypeParser<'s> {
    source: &'s str,
}

impl TypeParser<'_> {
    fn parse(&self, expr: &Expression, path: &str) -> Result<TypeConstraint, TypeError> {
        let expr = expr.unwrapped();
        if let Expression::Variable(keyword) = expr {
            return match keyword.as_str() {
                "string" => Ok(TypeConstraint::Primitive(PrimitiveKind::String)),
                "number" => Ok(TypeConstraint::Primitive(PrimitiveKind::Number)),
                "bool" => Ok(TypeConstraint::Primitive(PrimitiveKind::Bool)),
                "any" => Ok(TypeConstraint::Primitive(PrimitiveKind::Any)),
                "list" | "set" | "map" | "object" | "tuple" | "optional" => {
                    Err(self.malformed(expr, path))
                }
                _ => Err(self.unsupported(expr, path)),
            };
        }

        let Some((keyword, call)) = expr.builtin_call() else {
            return Err(self.unsupported(expr, path));
        };
        let Some(args) = call_args(call) else {
            return Err(self.malformed(expr, path));
        };
        match keyword {
            "list" => self.collection(CollectionKind::List, expr, &args, path),
            "set" => self.collection(CollectionKind::Set, expr, &args, path),
            "map" => self.collection(CollectionKind::Map, expr, &args, path),
            "tuple" => self.tuple(expr, &args, path),
            "object" => self.object(expr, &args, path),
            // `optional` is only valid directly on an object attribute,
            // which `object` handles before recursing.
            "optional" | "string" | "number" | "bool" | "any" => Err(self.malformed(expr, path)),
            _ => Err(self.unsupported(expr, path)),
        }
    }

    fn collection(
        &self,
        kind: CollectionKind,
        expr: &Expression,
        args: &[&Expression],
        path: &str,
    ) -> Result<TypeConstraint, TypeError> {
        let [element] = args else {
            return Err(self.malformed(expr, path));
        };
        let element = self.parse(element, &format!("{path}[*]"))?;
        Ok(TypeConstraint::Collection(kind, Box::new(element)))
    }

    fn tuple(&self, expr: &Expression, args: &[&Expression], path: &str) -> Result<TypeConstraint, TypeError> {
        let [elements] = args else {
            return Err(self.malformed(expr, path));
        };
        let Expression::Array(elements) = elements.unwrapped() else {
            return Err(self.malformed(expr, path));
        };
        elements
            .iter()
            .enumerate()
            .map(|(i, element)| self.parse(element, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(TypeConstraint::Tuple)
    }

    fn object(&self, expr: &Expression, args: &[&Expression], path: &str) -> Result<TypeConstraint, TypeError> {
        let [attributes] = args else {
            return Err(self.malformed(expr, path));
        };
        let Expression::Object(object) = attributes.unwrapped() else {
            return Err(self.malformed(expr, path));
        };

        let mut parsed = Vec::new();
        for (key, value) in object.iter() {
            let name = match key {
                ObjectKey::Ident(name) => name.as_str().to_string(),
                ObjectKey::Expression(Expression::String(name)) => name.value().clone(),
                ObjectKey::Expression(key) => return Err(self.malformed(key, path)),
            };
            let attr_path = format!("{path}.{name}");
            parsed.push(self.attribute(name, value.expr(), &attr_path)?);
        }
        Ok(TypeConstraint::Object(parsed))
    }

    /// `name = T` or `name = optional(T)` or `name = optional(T, default)`.
    fn attribute(&self, name: String, expr: &Expression, path: &str) -> Result<ObjectAttribute, TypeError> {
        let call = match expr.builtin_call() {
            Some(("optional", call)) => call,
            _ => {
                return Ok(ObjectAttribute {
                    name,
                    constraint: self.parse(expr, path)?,
                    optional: false,
                    default: None,
                })
            }
        };

        let (inner, default) = match call_args(call).as_deref() {
            Some([inner]) => (*inner, None),
            Some([inner, default]) => (*inner, Some(*default)),
            _ => return Err(self.malformed(expr, path)),
        };
        let constraint = self.parse(inner, path)?;
        let default = default
            .map(|d| {
                expression_to_json(d).map_err(|_| TypeError::NonLiteralDefault {
                    path: path.to_string(),
                    expression: d.source_text(self.source).to_string(),
                })
            })
            .transpose()?;

        Ok(ObjectAttribute {
            name,
            constraint,
            optional: true,
            default,
        })
    }

    fn malformed(&self, expr: &Expression, path: &str) -> TypeError {
        TypeError::Malformed {
            path: path.to_string(),
            token: expr.source_text(self.source).to_string(),
        }
    }

    fn unsupported(&self, expr: &Expression, path: &str) -> TypeError {
        TypeError::Unsupported {
            path: path.to_string(),
            token: expr.source_text(self.source).to_string(),
        }
    }
}
