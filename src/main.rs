mod cli;

use clap::Parser;

fn main() -> miette::Result<()> {
    let args = cli::Args::parse();
    cli::init_logging(&args);
    cli::run(&args)
}
