//! Discovers `.tf` files in a module directory and collects their
//! `variable` blocks.

use crate::error::{HclSchemaError, SchemaError};
use crate::literal::expression_to_json;
use crate::parser::{ExpressionExt, Parser};
use hcl_edit::expr::Expression;
use hcl_edit::structure::{Block, BlockLabel, Body};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A `variable "<name>" { ... }` block.
#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    /// The file the block was declared in.
    pub file: String,
    /// Full text of `file`; expressions index into it.
    pub source: Arc<str>,
    /// The raw `type` expression. Absent means `any`.
    pub type_expr: Option<Expression>,
    pub nullable: Option<bool>,
    pub default: Option<Expression>,
    pub validations: Vec<Validation>,
    pub description: Option<String>,
    /// True when no default is declared.
    pub required: bool,
}

#[derive(Debug, Clone)]
pub struct Validation {
    pub condition: Expression,
    /// The condition exactly as written.
    pub condition_source: String,
    pub error_message: Option<String>,
}

impl Variable {
    pub fn is_nullable(&self) -> bool {
        self.nullable.unwrap_or(false)
    }
}

/// All variables of one module directory, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub path: String,
    /// Whether any `.tf` files were found at all.
    pub files_found: bool,
    pub variables: Vec<Variable>,
}

/// Reads every `*.tf` file directly inside `dir`, in name order.
///
/// An empty directory is not an error here: the result has
/// `files_found == false` and the caller decides what that means.
///
/// # Errors
///
/// Returns an error if a file cannot be read or parsed, or if two files
/// declare the same variable.
pub fn read_module(dir: impl AsRef<Path>) -> Result<Module, HclSchemaError> {
    let dir = dir.as_ref();
    let files = find_tf_files(dir)?;
    log::debug!("found {} .tf file(s) in {}", files.len(), dir.display());

    let mut module = Module {
        path: dir.display().to_string(),
        files_found: !files.is_empty(),
        variables: Vec::new(),
    };
    for file in files {
        let source = std::fs::read_to_string(&file)
            .map_err(|e| SchemaError::io(file.display().to_string(), e))?;
        let variables = read_source(&source, &file.display().to_string())?;
        add_variables(&mut module, variables)?;
    }
    Ok(module)
}

/// Parses one file and returns its variables.
///
/// # Errors
///
/// Returns a `ParserError` if the text is not valid HCL.
pub fn read_source(source: &str, file_name: &str) -> Result<Vec<Variable>, HclSchemaError> {
    let body = Parser::new_with_name(source, file_name.to_string()).parse_body()?;
    let shared: Arc<str> = Arc::from(source);

    Ok(variable_blocks(&body)
        .map(|(name, block)| to_variable(name, block, file_name, &shared))
        .collect())
}

/// Appends `variables` to `module`, rejecting names declared twice.
pub fn add_variables(module: &mut Module, variables: Vec<Variable>) -> Result<(), SchemaError> {
    let mut seen: HashMap<&str, &str> = module
        .variables
        .iter()
        .map(|v| (v.name.as_str(), v.file.as_str()))
        .collect();
    for variable in &variables {
        if let Some(first) = seen.insert(&variable.name, &variable.file) {
            return Err(SchemaError::DuplicateVariable {
                name: variable.name.clone(),
                first: first.to_string(),
                second: variable.file.clone(),
            });
        }
    }
    module.variables.extend(variables);
    Ok(())
}

fn find_tf_files(dir: &Path) -> Result<Vec<PathBuf>, SchemaError> {
    let pattern = format!(
        "{}/*.tf",
        glob::Pattern::escape(&dir.to_string_lossy())
    );
    let discovery_error = |message: String| SchemaError::Discovery {
        path: dir.display().to_string(),
        message,
    };

    let mut files = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| discovery_error(e.to_string()))? {
        let path = entry.map_err(|e| discovery_error(e.to_string()))?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn variable_blocks(body: &Body) -> impl Iterator<Item = (&str, &Block)> {
    body.iter()
        .filter_map(|structure| structure.as_block())
        .filter_map(|block| match block.labels.as_slice() {
            [BlockLabel::String(name)] if block.ident.as_str() == "variable" => {
                Some((name.value().as_str(), block))
            }
            [BlockLabel::Ident(name)] if block.ident.as_str() == "variable" => {
                Some((name.as_str(), block))
            }
            _ => None,
        })
}

fn attribute<'b>(body: &'b Body, name: &str) -> Option<&'b Expression> {
    body.iter()
        .filter_map(|structure| structure.as_attribute())
        .filter(|attribute| attribute.key.as_str() == name)
        .last()
        .map(|attribute| &attribute.value)
}

/// A literal string, including heredocs without interpolation.
fn literal_string(expr: &Expression) -> Option<String> {
    match expression_to_json(expr) {
        Ok(Value::String(s)) => Some(s),
        _ => None,
    }
}

fn to_variable(name: &str, block: &Block, file: &str, source: &Arc<str>) -> Variable {
    let body = &block.body;

    let nullable = attribute(body, "nullable").and_then(|expr| match expr.unwrapped() {
        Expression::Bool(b) => Some(*b.value()),
        _ => {
            log::warn!("variable {name:?}: ignoring non-literal `nullable` in {file}");
            None
        }
    });
    let description = attribute(body, "description").and_then(|expr| {
        let description = literal_string(expr);
        if description.is_none() {
            log::warn!("variable {name:?}: ignoring non-literal `description` in {file}");
        }
        description
    });

    let validations = body
        .iter()
        .filter_map(|structure| structure.as_block())
        .filter(|b| b.ident.as_str() == "validation")
        .filter_map(|b| {
            let condition = attribute(&b.body, "condition")?.clone();
            Some(Validation {
                condition_source: condition.source_text(source).to_string(),
                error_message: attribute(&b.body, "error_message").and_then(literal_string),
                condition,
            })
        })
        .collect();

    let default = attribute(body, "default").cloned();
    Variable {
        name: name.to_string(),
        file: file.to_string(),
        source: Arc::clone(source),
        type_expr: attribute(body, "type").cloned(),
        nullable,
        required: default.is_none(),
        default,
        validations,
        description,
    }
}
