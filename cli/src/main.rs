use clap::Parser;
use fb2merge_cli::Cli;
use fb2merge_cli::command::CommandResult;
use std::process::ExitCode;

fn main() -> CommandResult<ExitCode> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    cli.merge.merge()
}
