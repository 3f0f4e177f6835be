use miette::{Diagnostic, NamedSource, SourceSpan};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum HclSchemaError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Schema(#[from] SchemaError),
}

#[derive(Error, Debug, Diagnostic, Clone)]
#[error("Parser Error")]
pub enum ParserError {
    #[error("Invalid HCL syntax")]
    #[diagnostic(
        code(parser::invalid_syntax),
        help("Check for unclosed blocks, brackets, strings or heredocs near the marked position.")
    )]
    InvalidSyntax {
        #[source_code]
        src: NamedSource<String>,
        #[label("{message}")]
        span: SourceSpan,
        message: String,
    },
}

/// Failures while turning a module's variables into a schema.
///
/// Everything here is fatal: generation stops and no partial schema is
/// returned. Validation conditions that cannot be translated are not errors;
/// they are logged and skipped.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    #[error("no .tf files found in {path:?}")]
    #[diagnostic(
        code(schema::files_not_found),
        help("Point the input at a module directory, or pass --allow-empty.")
    )]
    FilesNotFound { path: String },

    #[error("no variables found in the .tf files in {path:?}")]
    #[diagnostic(
        code(schema::no_variables_found),
        help("Pass --allow-empty to emit an empty schema instead.")
    )]
    NoVariablesFound { path: String },

    #[error("variable {name:?} is declared in both {first:?} and {second:?}")]
    #[diagnostic(code(schema::duplicate_variable))]
    DuplicateVariable {
        name: String,
        first: String,
        second: String,
    },

    #[error("variable {variable:?}: malformed type expression at {path}: {token}")]
    #[diagnostic(
        code(schema::malformed_type_syntax),
        help("Type keywords take a fixed shape, e.g. list(string) or object({{ name = string }}).")
    )]
    MalformedTypeSyntax {
        variable: String,
        path: String,
        token: String,
    },

    #[error("variable {variable:?}: unsupported type expression at {path}: {token}")]
    #[diagnostic(
        code(schema::unsupported_type_expression),
        help("Supported types are string, number, bool, any, list, set, map, tuple and object.")
    )]
    UnsupportedTypeExpression {
        variable: String,
        path: String,
        token: String,
    },

    #[error("variable {variable:?}: default value at {path} is not a literal: {expression}")]
    #[diagnostic(
        code(schema::non_literal_default),
        help("Defaults must be statically known: strings, numbers, bools, null, lists and objects of those.")
    )]
    NonLiteralDefaultValue {
        variable: String,
        path: String,
        expression: String,
    },

    #[error("could not read {path:?}")]
    #[diagnostic(code(schema::io))]
    Io {
        path: String,
        #[source]
        source: Arc<std::io::Error>,
    },

    #[error("could not list .tf files in {path:?}: {message}")]
    #[diagnostic(code(schema::discovery))]
    Discovery { path: String, message: String },
}

impl SchemaError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        SchemaError::Io {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}
