use std::process::ExitCode;

use clap::Parser;

use flatscout_sw::cli::{Cli, Command};
use flatscout_sw::commands;
use flatscout_sw::error::CliError;
use flatscout_sw::output::{self, OutputFormat};

fn main() -> ExitCode {
    let cli = Cli::parse();
    flatscout_sw::logging::init(cli.verbose);

    let format = cli.output;
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::emit_error(format, e.code(), &e.to_string());
            e.exit_code()
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = commands::load_config(cli.config.as_deref())?;
    let format = cli.output;

    match cli.command {
        Command::Route(args) => emit(format, &commands::route(&config, &args)?),
        Command::Notify(args) => {
            let mut stdin = std::io::stdin().lock();
            emit(format, &commands::notify(&config, &args, &mut stdin)?)
        }
        Command::ClickTarget(args) => emit(format, &commands::click_target(&config, &args)?),
        Command::Caches(args) => emit(format, &commands::caches(&config, &args.snapshot)?),
        Command::Activate(args) => emit(format, &commands::activate(&config, &args)?),
        Command::Config => emit(format, &commands::config(config)?),
    }
}

fn emit<T: serde::Serialize + std::fmt::Display>(
    format: OutputFormat,
    value: &T,
) -> Result<(), CliError> {
    output::emit(format, value)?;
    Ok(())
}
