use async_trait::async_trait;

use super::{Command, CommandResult, Ctx, print_current};
use crate::render;

pub struct ShowCommand;

#[async_trait]
impl Command for ShowCommand {
    fn name(&self) -> &str {
        "/show"
    }

    fn aliases(&self) -> &[&str] {
        &["/s"]
    }

    fn description(&self) -> &str {
        "show the current message, its history and your draft"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        if let Err(e) = ctx.session.authorize() {
            eprintln!("  ✗ {e}");
            return CommandResult::Handled;
        }
        print_current(ctx.session);
        if ctx.session.current().is_some() {
            println!();
            print!("{}", render::draft_summary(ctx.session.workflow().draft()));
        }
        CommandResult::Handled
    }
}

pub struct EscalationCommand;

#[async_trait]
impl Command for EscalationCommand {
    fn name(&self) -> &str {
        "/escalation"
    }

    fn aliases(&self) -> &[&str] {
        &["/esc"]
    }

    fn description(&self) -> &str {
        "print every field of the current message for escalation"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        if let Err(e) = ctx.session.authorize() {
            eprintln!("  ✗ {e}");
            return CommandResult::Handled;
        }
        match ctx.session.current() {
            Some(record) => print!("{}", render::escalation(record)),
            None => println!("  no message on screen; run /start"),
        }
        CommandResult::Handled
    }
}
