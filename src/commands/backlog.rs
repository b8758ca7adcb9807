use async_trait::async_trait;

use super::{Command, CommandResult, Ctx};
use crate::render;

pub struct BacklogCommand;

#[async_trait]
impl Command for BacklogCommand {
    fn name(&self) -> &str {
        "/backlog"
    }

    fn aliases(&self) -> &[&str] {
        &["/b"]
    }

    fn description(&self) -> &str {
        "list messages matching the current filters"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        if let Err(e) = ctx.session.authorize() {
            eprintln!("  ✗ {e}");
            return CommandResult::Handled;
        }
        if ctx.session.snapshot().is_none() {
            println!("  no backlog loaded; run /refresh");
            return CommandResult::Handled;
        }
        print!("{}", render::backlog_table(&ctx.session.visible()));
        CommandResult::Handled
    }
}
