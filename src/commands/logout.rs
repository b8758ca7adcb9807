use async_trait::async_trait;

use super::{Command, CommandResult, Ctx};
use crate::auth;

pub struct LogoutCommand;

#[async_trait]
impl Command for LogoutCommand {
    fn name(&self) -> &str {
        "/logout"
    }

    fn description(&self) -> &str {
        "sign out and drop the loaded backlog"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        ctx.session.sign_out();
        if let Err(e) = auth::logout(&ctx.session.settings().state.db) {
            eprintln!("  ✗ failed to remove identity: {e:#}");
            return CommandResult::Handled;
        }
        println!("  ✓ signed out");
        CommandResult::Handled
    }
}
