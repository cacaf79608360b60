use clap::Subcommand;
use meditera_core::Config;
use serde_json::json;

use super::{print_json, CommandResult, Context};

#[derive(Subcommand)]
pub enum AccountAction {
    /// Create an account and sign in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign in with email and password
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out
    Logout,
    /// Print signed-in state as JSON
    Status,
}

pub fn run(action: AccountAction, config: &Config) -> CommandResult {
    let ctx = Context::open(config)?;

    match action {
        AccountAction::Signup { email, password } => {
            let user_id = ctx.auth.sign_up(&email, &password)?;
            ctx.store.set_current_user(Some(&user_id))?;
            let achievement = ctx.tracker.record_account_created(&user_id)?;
            print_json(&json!({
                "user_id": user_id,
                "achievement": achievement.name(),
            }))?;
        }
        AccountAction::Login { email, password } => {
            let user_id = ctx.auth.log_in(&email, &password)?;
            ctx.store.set_current_user(Some(&user_id))?;
            let record = ctx.tracker.load(&user_id)?;
            print_json(&json!({
                "user_id": user_id,
                "workout_count": record.workout_count,
                "achievements": record.achievement_names(),
            }))?;
        }
        AccountAction::Logout => {
            if let Some(user_id) = ctx.auth.current_user() {
                ctx.tracker.forget(&user_id);
            }
            ctx.auth.sign_out();
            ctx.store.set_current_user(None)?;
            println!("signed out");
        }
        AccountAction::Status => {
            print_json(&ctx.auth.state())?;
        }
    }
    Ok(())
}
