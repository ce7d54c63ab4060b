//! Subcommand dispatch and execution.
//!
//! The [`dispatch`] function routes the parsed CLI to the appropriate
//! subcommand handler: [`run`] or [`health`]. Each handler lives in its
//! own submodule.

pub mod health;
pub mod run;

use crate::cli::{Cli, Commands};
use crate::error::SprayError;

pub async fn dispatch(cli: Cli) -> Result<(), SprayError> {
    match cli.command {
        Some(Commands::Run(args)) => run::execute(*args).await,
        Some(Commands::Health(args)) => health::execute(args).await,
        None => {
            print_welcome();
            Ok(())
        }
    }
}

fn print_welcome() {
    let version = env!("CARGO_PKG_VERSION");
    println!(
        "\n  spraycast v{version} \u{2014} webhook broadcast reverse proxy\n\n  \
         No command provided. To get started:\n\n    \
         spraycast run --backend http://localhost:8081    Broadcast to one backend\n    \
         spraycast run --enable-dynamic-backends          Allow runtime registration\n    \
         spraycast health                                 Check a running instance\n    \
         spraycast --help                                 See all commands and options\n"
    );
}
