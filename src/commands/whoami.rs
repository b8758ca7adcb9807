use async_trait::async_trait;

use super::{Command, CommandResult, Ctx};

pub struct WhoamiCommand;

#[async_trait]
impl Command for WhoamiCommand {
    fn name(&self) -> &str {
        "/whoami"
    }

    fn description(&self) -> &str {
        "show the signed-in agent and data sources"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let session = &*ctx.session;
        let settings = session.settings();
        let agent = session
            .identity()
            .map(|i| i.email.as_str())
            .unwrap_or("not signed in");
        println!("  agent     {agent}");
        println!("  warehouse {}", settings.warehouse.path);
        println!("  api       {}", settings.api.base_url);
        match session.snapshot() {
            Some(s) => println!(
                "  loaded    {} ({} messages)",
                s.loaded_at.format("%Y-%m-%d %H:%M UTC"),
                s.backlog.len()
            ),
            None => println!("  loaded    -"),
        }
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{no_templates, test_session};

    #[tokio::test]
    async fn returns_handled() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, vec![]);
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        assert_eq!(WhoamiCommand.execute("", &mut ctx).await, CommandResult::Handled);
    }

    #[test]
    fn metadata() {
        assert_eq!(WhoamiCommand.name(), "/whoami");
        assert!(WhoamiCommand.aliases().is_empty());
    }
}
