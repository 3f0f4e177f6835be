//! Command-line front end: flags, logging setup and output handling.

use clap::Parser;
use hclschema::{create_schema, to_json_string, SchemaOptions};
use miette::{Diagnostic, IntoDiagnostic};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Generate a JSON Schema from the variable blocks of an HCL module
#[derive(Parser, Debug)]
#[command(name = "hclschema", version, about)]
pub struct Args {
    /// module directory containing .tf files
    #[arg(short, long, default_value = ".")]
    pub input: PathBuf,

    /// output .json file
    #[arg(short, long, default_value = "schema.json")]
    pub output: PathBuf,

    /// replace the output file if it already exists
    #[arg(long)]
    pub overwrite: bool,

    /// print the schema instead of writing a file
    #[arg(long)]
    pub stdout: bool,

    /// set additionalProperties to false on the root and every object type
    #[arg(long)]
    pub disallow_additional_properties: bool,

    /// emit `{}` rather than failing when no variables are found
    #[arg(long)]
    pub allow_empty: bool,

    /// mark every variable required, even those with a default
    #[arg(long)]
    pub require_all: bool,

    /// log discovery and assembly details
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("input {path:?} is not a directory")]
    #[diagnostic(code(cli::input_not_directory), help("Pass the module directory with -i/--input."))]
    InputNotDirectory { path: String },

    #[error("output file {path:?} already exists")]
    #[diagnostic(code(cli::output_exists), help("Pass --overwrite to replace it, or --stdout to print instead."))]
    OutputExists { path: String },
}

impl Args {
    pub fn options(&self) -> SchemaOptions {
        SchemaOptions {
            require_all: self.require_all,
            allow_additional_properties: !self.disallow_additional_properties,
            allow_empty: self.allow_empty,
        }
    }

    fn default_filter(&self) -> &'static str {
        if self.stdout {
            "error"
        } else if self.verbose {
            "hclschema=debug"
        } else {
            "hclschema=info"
        }
    }
}

/// Installs the stderr subscriber. `RUST_LOG` overrides the flag-derived level.
pub fn init_logging(args: &Args) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| args.default_filter().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub fn run(args: &Args) -> miette::Result<()> {
    if !args.input.is_dir() {
        return Err(CliError::InputNotDirectory {
            path: args.input.display().to_string(),
        }
        .into());
    }
    if !args.stdout && args.output.exists() && !args.overwrite {
        return Err(CliError::OutputExists {
            path: args.output.display().to_string(),
        }
        .into());
    }

    let schema = create_schema(&args.input, &args.options())?;
    let text = to_json_string(&schema).into_diagnostic()?;

    if args.stdout {
        println!("{text}");
        return Ok(());
    }
    write_atomically(&args.output, &text)?;
    log::info!("schema written to {}", args.output.display());
    Ok(())
}

/// Writes through a temp file in the destination directory, then renames it
/// into place, so readers never observe a half-written schema.
fn write_atomically(path: &Path, contents: &str) -> miette::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).into_diagnostic()?;

    let mut file = tempfile::NamedTempFile::new_in(parent).into_diagnostic()?;
    file.write_all(contents.as_bytes()).into_diagnostic()?;
    file.write_all(b"\n").into_diagnostic()?;
    file.persist(path).map_err(|e| e.error).into_diagnostic()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_to_options() {
        let args = Args::parse_from(["hclschema", "--disallow-additional-properties", "--require-all"]);
        assert_eq!(args.input, PathBuf::from("."));
        assert_eq!(args.output, PathBuf::from("schema.json"));
        assert_eq!(
            args.options(),
            SchemaOptions {
                require_all: true,
                allow_additional_properties: false,
                allow_empty: false,
            }
        );
    }

    #[test]
    fn test_stdout_quiets_logging() {
        let args = Args::parse_from(["hclschema", "--stdout", "-v"]);
        assert_eq!(args.default_filter(), "error");
        let args = Args::parse_from(["hclschema", "-v"]);
        assert_eq!(args.default_filter(), "hclschema=debug");
    }

    #[test]
    fn test_existing_output_requires_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("main.tf"), "variable \"a\" {}\n").unwrap();
        let output = dir.path().join("schema.json");
        std::fs::write(&output, "{}").unwrap();

        let input = dir.path().to_str().unwrap();
        let target = output.to_str().unwrap();
        let args = Args::parse_from(["hclschema", "-i", input, "-o", target]);
        assert!(run(&args).is_err());

        let args = Args::parse_from(["hclschema", "-i", input, "-o", target, "--overwrite"]);
        run(&args).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["required"], serde_json::json!(["a"]));
    }

    #[test]
    fn test_output_parents_are_created() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("vars.tf"), "variable \"a\" {}\n").unwrap();
        let output = dir.path().join("nested/out/schema.json");
        let args = Args::parse_from([
            "hclschema",
            "-i",
            dir.path().to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ]);
        run(&args).unwrap();
        assert!(output.is_file());
    }

    #[test]
    fn test_input_must_be_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("main.tf");
        std::fs::write(&file, "").unwrap();
        let args = Args::parse_from(["hclschema", "-i", file.to_str().unwrap(), "--stdout"]);
        assert!(run(&args).is_err());
    }
}
