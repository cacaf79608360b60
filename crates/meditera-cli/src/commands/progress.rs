use clap::Subcommand;
use meditera_core::Config;
use serde_json::json;

use super::{print_json, CommandResult, Context};

#[derive(Subcommand)]
pub enum ProgressAction {
    /// Workout count and achievements of the signed-in user
    Show,
}

pub fn run(action: ProgressAction, config: &Config) -> CommandResult {
    let ctx = Context::open(config)?;

    match action {
        ProgressAction::Show => {
            let user_id = ctx.auth.require_user()?;
            let record = ctx.tracker.load(&user_id)?;
            let achievements: Vec<_> = record
                .achievements
                .iter()
                .map(|a| json!({ "name": a.name(), "awarded_at": a.awarded_at }))
                .collect();
            print_json(&json!({
                "user_id": record.user_id,
                "workout_count": record.workout_count,
                "achievements": achievements,
            }))
        }
    }
}
