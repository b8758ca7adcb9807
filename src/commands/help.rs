use async_trait::async_trait;

use super::{Command, CommandResult, Ctx};

/// Listed by the registry itself; see [`super::CommandRegistry::dispatch`].
pub struct HelpCommand;

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &str {
        "/help"
    }

    fn aliases(&self) -> &[&str] {
        &["/h", "/?"]
    }

    fn description(&self) -> &str {
        "list available commands"
    }

    async fn execute(&self, _args: &str, _ctx: &mut Ctx<'_>) -> CommandResult {
        CommandResult::Handled
    }
}
