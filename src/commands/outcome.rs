use async_trait::async_trait;

use super::{Command, CommandResult, Ctx, pick_option};
use crate::consts::{WRONG_LANGUAGE_SUBCODE, WRONG_NUMBER_CODE};
use crate::render;
use crate::session::Session;

fn outcome_options(session: &Session) -> Vec<String> {
    session
        .snapshot()
        .map(|s| s.outcome_codes().into_iter().map(str::to_string).collect())
        .unwrap_or_default()
}

fn subcode_options(session: &Session) -> Vec<String> {
    let code = session.workflow().draft().outcome_code.as_deref();
    match (session.snapshot(), code) {
        (Some(s), Some(code)) => s.subcodes_for(code).into_iter().map(str::to_string).collect(),
        _ => Vec::new(),
    }
}

fn language_options(session: &Session) -> Vec<String> {
    session
        .snapshot()
        .map(|s| s.languages.clone())
        .unwrap_or_default()
}

fn resolve(options: &[String], arg: &str) -> Option<String> {
    let refs: Vec<&str> = options.iter().map(String::as_str).collect();
    pick_option(&refs, arg).map(str::to_string)
}

pub struct OutcomeCommand;

#[async_trait]
impl Command for OutcomeCommand {
    fn name(&self) -> &str {
        "/outcome"
    }

    fn aliases(&self) -> &[&str] {
        &["/o"]
    }

    fn usage(&self) -> &str {
        "[n]"
    }

    fn description(&self) -> &str {
        "list or choose the outcome code"
    }

    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let options = outcome_options(ctx.session);
        if args.is_empty() {
            print!("{}", render::numbered(&options));
            return CommandResult::Handled;
        }
        let Some(code) = resolve(&options, args) else {
            eprintln!("  ✗ no outcome code matches {args}");
            return CommandResult::Handled;
        };
        if let Err(e) = ctx.session.workflow_mut().set_outcome(&code) {
            eprintln!("  ✗ {e}");
            return CommandResult::Handled;
        }
        println!("  ✓ outcome: {code}");
        let subcodes = subcode_options(ctx.session);
        if code == WRONG_NUMBER_CODE {
            println!("  subcode is optional for this outcome");
        }
        if !subcodes.is_empty() {
            println!("  subcodes:");
            print!("{}", render::numbered(&subcodes));
        }
        CommandResult::Handled
    }
}

pub struct SubcodeCommand;

#[async_trait]
impl Command for SubcodeCommand {
    fn name(&self) -> &str {
        "/subcode"
    }

    fn usage(&self) -> &str {
        "[n|none]"
    }

    fn description(&self) -> &str {
        "list or choose the outcome subcode"
    }

    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let options = subcode_options(ctx.session);
        if args.is_empty() {
            if options.is_empty() {
                println!("  choose an outcome first (/outcome)");
            } else {
                print!("{}", render::numbered(&options));
            }
            return CommandResult::Handled;
        }
        let subcode = if args.eq_ignore_ascii_case("none") {
            None
        } else {
            match resolve(&options, args) {
                Some(s) => Some(s),
                None => {
                    eprintln!("  ✗ no subcode matches {args}");
                    return CommandResult::Handled;
                }
            }
        };
        if let Err(e) = ctx.session.workflow_mut().set_subcode(subcode.as_deref()) {
            eprintln!("  ✗ {e}");
            return CommandResult::Handled;
        }
        println!("  ✓ subcode: {}", subcode.as_deref().unwrap_or("-"));
        if subcode.as_deref() == Some(WRONG_LANGUAGE_SUBCODE) {
            println!("  correct the member's language with /language <n>:");
            print!("{}", render::numbered(&language_options(ctx.session)));
        }
        CommandResult::Handled
    }
}

pub struct LanguageCommand;

#[async_trait]
impl Command for LanguageCommand {
    fn name(&self) -> &str {
        "/language"
    }

    fn usage(&self) -> &str {
        "[n]"
    }

    fn description(&self) -> &str {
        "correct the member's language (Wrong Language subcode)"
    }

    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let options = language_options(ctx.session);
        if args.is_empty() {
            print!("{}", render::numbered(&options));
            return CommandResult::Handled;
        }
        let Some(language) = resolve(&options, args) else {
            eprintln!("  ✗ no language matches {args}");
            return CommandResult::Handled;
        };
        match ctx.session.workflow_mut().set_language(&language) {
            Ok(()) => println!("  ✓ language: {language}"),
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}

pub struct NotesCommand;

#[async_trait]
impl Command for NotesCommand {
    fn name(&self) -> &str {
        "/notes"
    }

    fn usage(&self) -> &str {
        "other|positive <text>"
    }

    fn description(&self) -> &str {
        "set other-outcome or positive-interaction notes"
    }

    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let (kind, text) = args
            .split_once(char::is_whitespace)
            .map(|(k, t)| (k, t.trim()))
            .unwrap_or((args, ""));
        let workflow = ctx.session.workflow_mut();
        let result = match kind.to_ascii_lowercase().as_str() {
            "other" => workflow.set_other_notes(text),
            "positive" => workflow.set_positive_notes(text),
            _ => {
                eprintln!("  ✗ usage: /notes other|positive <text>");
                return CommandResult::Handled;
            }
        };
        match result {
            Ok(()) => println!("  ✓ {kind} notes saved"),
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}
