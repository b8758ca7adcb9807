use async_trait::async_trait;

use super::{Command, CommandResult, Ctx, print_current};

pub struct StartCommand;

#[async_trait]
impl Command for StartCommand {
    fn name(&self) -> &str {
        "/start"
    }

    fn description(&self) -> &str {
        "start triage at the first unanswered message"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        match ctx.session.start() {
            Ok(_) => print_current(ctx.session),
            Err(e) => eprintln!("  ✗ {e:#}"),
        }
        CommandResult::Handled
    }
}

pub struct StopCommand;

#[async_trait]
impl Command for StopCommand {
    fn name(&self) -> &str {
        "/stop"
    }

    fn description(&self) -> &str {
        "stop triage and discard the current draft"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        ctx.session.stop();
        println!("  triage stopped");
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{no_templates, test_session, two_records};
    use crate::triage::Phase;

    #[tokio::test]
    async fn start_then_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, two_records());
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        StartCommand.execute("", &mut ctx).await;
        assert_eq!(ctx.session.workflow().phase(), Phase::Showing);
        StopCommand.execute("", &mut ctx).await;
        assert_eq!(ctx.session.workflow().phase(), Phase::Idle);
    }

    #[tokio::test]
    async fn start_on_empty_view_is_done() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, vec![]);
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        StartCommand.execute("", &mut ctx).await;
        assert_eq!(ctx.session.workflow().phase(), Phase::AllDone);
    }
}
