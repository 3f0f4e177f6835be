pub mod api;
pub mod error;
pub mod literal;
pub mod parser;
pub mod reader;
pub mod schema;
pub mod types;
pub mod utils;
pub mod validation;

pub use api::{create_schema, create_schema_from_source, to_json_string, SchemaOptions};
pub use error::{HclSchemaError, ParserError, SchemaError};
