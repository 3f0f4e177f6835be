//! Builds JSON Schema nodes from variables and assembles the final document.

use crate::api::SchemaOptions;
use crate::error::SchemaError;
use crate::literal::expression_to_json;
use crate::parser::ExpressionExt;
use crate::reader::{Module, Variable};
use crate::types::{parse_type_constraint, CollectionKind, PrimitiveKind, TypeConstraint, TypeError};
use crate::utils::get_line_and_column;
use crate::validation::{merge_constraints, translate_condition};
use hcl_edit::Span;
use rayon::prelude::*;
use serde_json::{json, Map, Value};

pub const SCHEMA_DRAFT: &str = "http://json-schema.org/draft-07/schema#";

/// Builds the schema node for one variable.
///
/// The type expression, default and description translate strictly; any
/// failure aborts. Validation conditions translate best-effort: ones that
/// cannot be expressed in the schema are logged and skipped.
pub fn build_node(variable: &Variable, options: &SchemaOptions) -> Result<Value, SchemaError> {
    let constraint = match &variable.type_expr {
        Some(expr) => parse_type_constraint(expr, &variable.source)
            .map_err(|e| type_error(&variable.name, e))?,
        None => TypeConstraint::Primitive(PrimitiveKind::Any),
    };

    let mut node = node_from_type(&constraint, variable.is_nullable(), options);

    if let Some(default) = &variable.default {
        let value = expression_to_json(default).map_err(|_| SchemaError::NonLiteralDefaultValue {
            variable: variable.name.clone(),
            path: "default".to_string(),
            expression: default.source_text(&variable.source).to_string(),
        })?;
        node.insert("default".to_string(), value);
    }

    for validation in &variable.validations {
        match translate_condition(&validation.condition, &variable.name, &constraint) {
            Ok(constraints) => merge_constraints(&mut node, constraints),
            Err(reason) => {
                let offset = validation.condition.span().map_or(0, |range| range.start);
                let (line, column) = get_line_and_column(&variable.source, offset);
                log::warn!(
                    "couldn't apply validation for {:?} with condition {:?} ({}:{}:{}): {} (error message: {:?})",
                    variable.name,
                    validation.condition_source,
                    variable.file,
                    line,
                    column,
                    reason,
                    validation.error_message.as_deref().unwrap_or_default(),
                );
            }
        }
    }

    if let Some(description) = &variable.description {
        node.insert("description".to_string(), Value::String(description.clone()));
    }

    Ok(Value::Object(node))
}

/// Assembles the top-level document from a module's variables.
///
/// Nodes are built in parallel; the document is put together only once all
/// of them are done, so its content never depends on scheduling. When
/// several variables fail, the first in declaration order is reported.
pub fn assemble(module: &Module, options: &SchemaOptions) -> Result<Value, SchemaError> {
    if !module.files_found {
        if options.allow_empty {
            log::info!("no .tf files were found in {:?}, creating empty schema", module.path);
            return Ok(json!({}));
        }
        return Err(SchemaError::FilesNotFound {
            path: module.path.clone(),
        });
    }

    if module.variables.is_empty() {
        if options.allow_empty {
            log::info!("no variables were found in {:?}, creating empty schema", module.path);
            return Ok(json!({}));
        }
        return Err(SchemaError::NoVariablesFound {
            path: module.path.clone(),
        });
    }

    let nodes: Vec<Result<Value, SchemaError>> = module
        .variables
        .par_iter()
        .map(|variable| build_node(variable, options))
        .collect();

    let mut properties = Map::new();
    let mut required = Vec::new();
    for (variable, node) in module.variables.iter().zip(nodes) {
        properties.insert(variable.name.clone(), node?);
        if variable.required || options.require_all {
            required.push(variable.name.clone());
        }
    }
    required.sort();
    required.dedup();
    log::debug!(
        "assembled schema with {} properties, {} required",
        properties.len(),
        required.len()
    );

    Ok(json!({
        "$schema": SCHEMA_DRAFT,
        "additionalProperties": options.allow_additional_properties,
        "properties": properties,
        "required": required,
    }))
}

fn node_from_type(constraint: &TypeConstraint, nullable: bool, options: &SchemaOptions) -> Map<String, Value> {
    let mut node = Map::new();
    match constraint {
        TypeConstraint::Primitive(PrimitiveKind::Any) => return node,
        TypeConstraint::Primitive(kind) => {
            let name = match kind {
                PrimitiveKind::String => "string",
                PrimitiveKind::Number => "number",
                _ => "boolean",
            };
            node.insert("type".into(), json!(name));
        }
        TypeConstraint::Collection(CollectionKind::List | CollectionKind::Set, element) => {
            node.insert("type".into(), json!("array"));
            node.insert("items".into(), Value::Object(node_from_type(element, false, options)));
        }
        TypeConstraint::Collection(CollectionKind::Map, element) => {
            node.insert("type".into(), json!("object"));
            node.insert(
                "additionalProperties".into(),
                Value::Object(node_from_type(element, false, options)),
            );
        }
        TypeConstraint::Tuple(elements) => {
            let items: Vec<Value> = elements
                .iter()
                .map(|e| Value::Object(node_from_type(e, false, options)))
                .collect();
            node.insert("type".into(), json!("array"));
            node.insert("items".into(), Value::Array(items));
            node.insert("minItems".into(), json!(elements.len()));
            node.insert("maxItems".into(), json!(elements.len()));
        }
        TypeConstraint::Object(attributes) => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for attribute in attributes {
                let mut property = node_from_type(&attribute.constraint, false, options);
                if let Some(default) = &attribute.default {
                    property.insert("default".into(), default.clone());
                }
                properties.insert(attribute.name.clone(), Value::Object(property));
                if attribute.is_required() || options.require_all {
                    required.push(attribute.name.clone());
                }
            }
            required.sort();
            node.insert("type".into(), json!("object"));
            node.insert("properties".into(), Value::Object(properties));
            node.insert("additionalProperties".into(), json!(options.allow_additional_properties));
            node.insert("required".into(), json!(required));
        }
    }

    if nullable {
        if let Some(base) = node.remove("type") {
            node.insert("type".into(), json!([base, "null"]));
        }
    }
    node
}

fn type_error(variable: &str, error: TypeError) -> SchemaError {
    let variable = variable.to_string();
    match error {
        TypeError::Malformed { path, token } => SchemaError::MalformedTypeSyntax {
            variable,
            path,
            token,
        },
        TypeError::Unsupported { path, token } => SchemaError::UnsupportedTypeExpression {
            variable,
            path,
            token,
        },
        TypeError::NonLiteralDefault { path, expression } => SchemaError::NonLiteralDefaultValue {
            variable,
            path,
            expression,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_source;

    fn module(source: &str) -> Module {
        Module {
            path: "test".to_string(),
            files_found: true,
            variables: read_source(source, "variables.tf").unwrap(),
        }
    }

    fn node(source: &str) -> Value {
        let module = module(source);
        build_node(&module.variables[0], &SchemaOptions::default()).unwrap()
    }

    #[test]
    fn test_primitive_nodes() {
        assert_eq!(node("variable \"a\" { type = string }"), json!({"type": "string"}));
        assert_eq!(node("variable \"a\" { type = number }"), json!({"type": "number"}));
        assert_eq!(node("variable \"a\" { type = bool }"), json!({"type": "boolean"}));
        assert_eq!(node("variable \"a\" { type = any }"), json!({}));
        assert_eq!(node("variable \"a\" {}"), json!({}));
    }

    #[test]
    fn test_collection_nodes() {
        assert_eq!(
            node("variable \"a\" { type = list(string) }"),
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(
            node("variable \"a\" { type = set(number) }"),
            json!({"type": "array", "items": {"type": "number"}})
        );
        assert_eq!(
            node("variable \"a\" { type = map(bool) }"),
            json!({"type": "object", "additionalProperties": {"type": "boolean"}})
        );
        assert_eq!(
            node("variable \"a\" { type = tuple([string, number]) }"),
            json!({
                "type": "array",
                "items": [{"type": "string"}, {"type": "number"}],
                "minItems": 2,
                "maxItems": 2
            })
        );
    }

    #[test]
    fn test_object_node() {
        let source = r#"
variable "server" {
  type = object({
    name = string
    port = optional(number, 8080)
    tags = optional(list(string))
    meta = object({})
  })
}
"#;
        assert_eq!(
            node(source),
            json!({
                "type": "object",
                "additionalProperties": true,
                "properties": {
                    "meta": {
                        "type": "object",
                        "additionalProperties": true,
                        "properties": {},
                        "required": []
                    },
                    "name": {"type": "string"},
                    "port": {"type": "number", "default": 8080},
                    "tags": {"type": "array", "items": {"type": "string"}}
                },
                "required": ["meta", "name"]
            })
        );
    }

    #[test]
    fn test_object_node_options() {
        let module = module("variable \"a\" { type = object({ b = optional(string, \"x\"), a = number }) }");
        let options = SchemaOptions {
            require_all: true,
            allow_additional_properties: false,
            ..SchemaOptions::default()
        };
        let node = build_node(&module.variables[0], &options).unwrap();
        assert_eq!(node["additionalProperties"], json!(false));
        assert_eq!(node["required"], json!(["a", "b"]));
    }

    #[test]
    fn test_nullable_widens_type() {
        assert_eq!(
            node("variable \"a\" {\n  type = string\n  nullable = true\n}"),
            json!({"type": ["string", "null"]})
        );
        assert_eq!(
            node("variable \"a\" {\n  type = list(string)\n  nullable = true\n}"),
            json!({"type": ["array", "null"], "items": {"type": "string"}})
        );
        assert_eq!(
            node("variable \"a\" {\n  nullable = true\n}"),
            json!({})
        );
    }

    #[test]
    fn test_default_description_and_validation() {
        let source = r#"
variable "env" {
  type        = string
  default     = "dev"
  description = "Deployment environment"

  validation {
    condition     = length(var.env) <= 10
    error_message = "Too long."
  }

  validation {
    condition     = startswith(var.env, "d")
    error_message = "Skipped: not translatable."
  }
}
"#;
        assert_eq!(
            node(source),
            json!({
                "type": "string",
                "default": "dev",
                "description": "Deployment environment",
                "maxLength": 10
            })
        );
    }

    #[test]
    fn test_validation_blocks_combine() {
        let source = r#"
variable "a" {
  type = string

  validation {
    condition     = contains(["x", "y"], var.a)
    error_message = "First."
  }

  validation {
    condition     = contains(["y", "z"], var.a)
    error_message = "Second."
  }

  validation {
    condition     = can(regex("^a", var.a)) && can(regex("b$", var.a))
    error_message = "Third."
  }
}
"#;
        assert_eq!(
            node(source),
            json!({
                "type": "string",
                "enum": ["y"],
                "pattern": "^a",
                "allOf": [{"pattern": "b$"}]
            })
        );
    }

    #[test]
    fn test_non_literal_default_fails() {
        let module = module("variable \"a\" {\n  default = var.b\n}");
        match build_node(&module.variables[0], &SchemaOptions::default()) {
            Err(SchemaError::NonLiteralDefaultValue {
                variable,
                expression,
                ..
            }) => {
                assert_eq!(variable, "a");
                assert_eq!(expression, "var.b");
            }
            other => panic!("expected a non-literal default error, got {other:?}"),
        }
    }

    #[test]
    fn test_type_errors_name_the_variable() {
        let module = module("variable \"a\" {\n  type = object({ b = strng })\n}");
        match build_node(&module.variables[0], &SchemaOptions::default()) {
            Err(SchemaError::UnsupportedTypeExpression {
                variable,
                path,
                token,
            }) => {
                assert_eq!(variable, "a");
                assert_eq!(path, "root.b");
                assert_eq!(token, "strng");
            }
            other => panic!("expected an unsupported type error, got {other:?}"),
        }
    }

    #[test]
    fn test_assemble_required_list() {
        let source = r#"
variable "zeta" { type = string }
variable "alpha" {
  type    = number
  default = 1
}
variable "mid" {
  type     = string
  nullable = true
}
"#;
        let schema = assemble(&module(source), &SchemaOptions::default()).unwrap();
        assert_eq!(schema["$schema"], json!(SCHEMA_DRAFT));
        assert_eq!(schema["additionalProperties"], json!(true));
        assert_eq!(schema["required"], json!(["mid", "zeta"]));

        let options = SchemaOptions {
            require_all: true,
            ..SchemaOptions::default()
        };
        let schema = assemble(&module(source), &options).unwrap();
        assert_eq!(schema["required"], json!(["alpha", "mid", "zeta"]));
    }

    #[test]
    fn test_assemble_empty_module() {
        let empty = Module {
            path: "empty".to_string(),
            files_found: true,
            variables: vec![],
        };
        assert!(matches!(
            assemble(&empty, &SchemaOptions::default()),
            Err(SchemaError::NoVariablesFound { .. })
        ));

        let allow_empty = SchemaOptions {
            allow_empty: true,
            ..SchemaOptions::default()
        };
        assert_eq!(assemble(&empty, &allow_empty).unwrap(), json!({}));

        let no_files = Module {
            files_found: false,
            ..empty
        };
        assert!(matches!(
            assemble(&no_files, &SchemaOptions::default()),
            Err(SchemaError::FilesNotFound { .. })
        ));
        assert_eq!(assemble(&no_files, &allow_empty).unwrap(), json!({}));
    }

    #[test]
    fn test_assemble_fails_fast() {
        let source = "variable \"ok\" { type = string }\nvariable \"bad\" {\n  default = upper(\"x\")\n}\n";
        assert!(matches!(
            assemble(&module(source), &SchemaOptions::default()),
            Err(SchemaError::NonLiteralDefaultValue { .. })
        ));
    }
}
