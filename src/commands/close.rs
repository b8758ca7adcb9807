use async_trait::async_trait;

use super::{Command, CommandResult, Ctx, print_current};

pub struct CloseCommand;

#[async_trait]
impl Command for CloseCommand {
    fn name(&self) -> &str {
        "/close"
    }

    fn description(&self) -> &str {
        "send the reply (if any), close the case and move to the next message"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let outbound = ctx.outbound;
        match ctx.session.close(outbound).await {
            Ok(report) => {
                if let Some(text) = &report.sent {
                    println!("  ✓ reply sent: {text}");
                }
                match &report.close_error {
                    Some(e) => eprintln!("  ✗ case close failed: {e}"),
                    None => println!("  ✓ case closed ({})", report.status),
                }
                println!();
                print_current(ctx.session);
            }
            Err(e) => eprintln!("  ✗ {e:#}"),
        }
        CommandResult::Handled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{no_templates, test_session, two_records};
    use crate::consts::{STATUS_CLOSED_NO_RESPONSE, WRONG_NUMBER_CODE};
    use crate::triage::{Action, Phase};

    #[tokio::test]
    async fn close_without_subcode_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, two_records());
        session.start().unwrap();
        session.workflow_mut().choose(Action::NoResponse).unwrap();
        session.workflow_mut().set_outcome("Inbound SMS").unwrap();
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        CloseCommand.execute("", &mut ctx).await;
        assert!(out.closed().is_empty());
        assert_eq!(ctx.session.workflow().cursor(), 0);
    }

    #[tokio::test]
    async fn close_advances_to_next_message() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, two_records());
        session.start().unwrap();
        session.workflow_mut().choose(Action::NoResponse).unwrap();
        session.workflow_mut().set_outcome(WRONG_NUMBER_CODE).unwrap();
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        CloseCommand.execute("", &mut ctx).await;
        assert_eq!(out.closed().len(), 1);
        assert!(out.sent().is_empty());
        assert_eq!(ctx.session.workflow().phase(), Phase::Showing);
        assert_eq!(ctx.session.workflow().cursor(), 1);
        let first = &ctx.session.snapshot().unwrap().backlog[0];
        assert_eq!(first.status.as_deref(), Some(STATUS_CLOSED_NO_RESPONSE));
    }
}
