use crate::error::HclSchemaError;
use crate::reader::{self, Module};
use crate::schema;
use serde::{Deserialize, Serialize};
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::path::Path;

/// Options controlling how a schema is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SchemaOptions {
    /// Mark every property required, defaults notwithstanding.
    pub require_all: bool,
    /// Value of `additionalProperties` on the root and on every object type.
    pub allow_additional_properties: bool,
    /// Return `{}` instead of failing when there is nothing to describe.
    pub allow_empty: bool,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            require_all: false,
            allow_additional_properties: true,
            allow_empty: false,
        }
    }
}

/// Generates the JSON Schema for the module in `dir`.
///
/// # Errors
/// Returns an `HclSchemaError` if a file cannot be read or parsed, if the
/// module has no files or variables (unless `allow_empty` is set), or if a
/// variable's type or default cannot be translated.
pub fn create_schema(dir: impl AsRef<Path>, options: &SchemaOptions) -> Result<Value, HclSchemaError> {
    let module = reader::read_module(dir)?;
    Ok(schema::assemble(&module, options)?)
}

/// Generates a schema from the text of a single file.
///
/// # Errors
/// Same as [`create_schema`], minus the I/O.
pub fn create_schema_from_source(
    source: &str,
    file_name: &str,
    options: &SchemaOptions,
) -> Result<Value, HclSchemaError> {
    let mut module = Module {
        path: file_name.to_string(),
        files_found: true,
        variables: Vec::new(),
    };
    reader::add_variables(&mut module, reader::read_source(source, file_name)?)?;
    Ok(schema::assemble(&module, options)?)
}

/// Renders a schema as JSON indented by four spaces.
///
/// # Errors
/// Returns a `serde_json::Error` if serialization fails.
pub fn to_json_string(schema: &Value) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    schema.serialize(&mut serializer)?;
    // serde_json only ever writes valid UTF-8.
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
