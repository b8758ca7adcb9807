use async_trait::async_trait;

use super::{Command, CommandResult, Ctx};
use crate::render;
use crate::triage::{Action, TemplateChoice};

pub struct ActionCommand;

#[async_trait]
impl Command for ActionCommand {
    fn name(&self) -> &str {
        "/action"
    }

    fn aliases(&self) -> &[&str] {
        &["/a"]
    }

    fn usage(&self) -> &str {
        "none|respond"
    }

    fn description(&self) -> &str {
        "close without replying, or reply with a template"
    }

    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let action: Action = match args.parse() {
            Ok(a) => a,
            Err(e) => {
                eprintln!("  ✗ {e}");
                return CommandResult::Handled;
            }
        };
        if let Err(e) = ctx.session.workflow_mut().choose(action) {
            eprintln!("  ✗ {e}");
            return CommandResult::Handled;
        }
        match action {
            Action::NoResponse => println!("  next: /outcome, /subcode, then /close"),
            Action::Respond => fetch_and_print(ctx).await,
        }
        CommandResult::Handled
    }
}

pub struct TemplatesCommand;

#[async_trait]
impl Command for TemplatesCommand {
    fn name(&self) -> &str {
        "/templates"
    }

    fn aliases(&self) -> &[&str] {
        &["/t"]
    }

    fn description(&self) -> &str {
        "fetch the replies available for this member"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        fetch_and_print(ctx).await;
        CommandResult::Handled
    }
}

async fn fetch_and_print(ctx: &mut Ctx<'_>) {
    let outbound = ctx.outbound;
    match ctx.session.fetch_templates(outbound).await {
        Ok(templates) if templates.is_empty() => {
            println!("  no templated responses for this member; /action none to close");
        }
        Ok(templates) => {
            print!("{}", render::numbered(&template_lines(templates)));
            println!("  next: /pick <n>, optionally /edit <text>");
        }
        Err(e) => eprintln!("  ✗ {e:#}"),
    }
}

fn template_lines(templates: &[TemplateChoice]) -> Vec<String> {
    templates
        .iter()
        .map(|t| {
            format!(
                "{} / {}: {}",
                t.subject, t.message.name, t.message.message_source
            )
        })
        .collect()
}

pub struct PickCommand;

#[async_trait]
impl Command for PickCommand {
    fn name(&self) -> &str {
        "/pick"
    }

    fn aliases(&self) -> &[&str] {
        &["/p"]
    }

    fn usage(&self) -> &str {
        "<n>"
    }

    fn description(&self) -> &str {
        "choose a templated reply"
    }

    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let Ok(n) = args.trim().parse::<usize>() else {
            eprintln!("  ✗ usage: /pick <n>");
            return CommandResult::Handled;
        };
        match ctx.session.workflow_mut().pick(n) {
            Ok(t) => println!("  ✓ reply: {}", t.message.message_source),
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}

pub struct EditCommand;

#[async_trait]
impl Command for EditCommand {
    fn name(&self) -> &str {
        "/edit"
    }

    fn usage(&self) -> &str {
        "<text>"
    }

    fn description(&self) -> &str {
        "replace the text of the chosen reply"
    }

    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        if args.is_empty() {
            eprintln!("  ✗ usage: /edit <text>");
            return CommandResult::Handled;
        }
        match ctx.session.workflow_mut().edit(args) {
            Ok(()) => println!("  ✓ reply edited"),
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}
