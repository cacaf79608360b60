use clap::Subcommand;
use meditera_core::Config;

use super::{print_json, CommandResult};

#[derive(Subcommand)]
pub enum RoutineAction {
    /// List the exercises of the configured routine
    List,
}

pub fn run(action: RoutineAction, config: &Config) -> CommandResult {
    match action {
        RoutineAction::List => print_json(&config.routine()),
    }
}
