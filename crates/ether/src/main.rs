mod bindings;
mod cli;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    match cli.command {
        Some(Command::Run(args)) => run::run(args),
        Some(Command::Css(args)) => run::css(args),
        Some(Command::Snapshot(args)) => run::snapshot(args),
        Some(Command::Probe(args)) => run::probe(args),
        Some(Command::Paths) => run::paths(),
        None => run::run(cli.run),
    }
}
