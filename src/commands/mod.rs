//! Built-in REPL commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and are registered in a
//! [`CommandRegistry`]. The registry handles dispatch, alias resolution,
//! and dynamic help generation. Each command receives the text after its
//! name plus the session context.

mod backlog;
mod close;
mod filter;
mod help;
mod login;
mod logout;
mod outcome;
mod quit;
mod refresh;
mod respond;
mod show;
mod start;
mod whoami;

use async_trait::async_trait;
use chrono::Local;
use std::sync::Arc;

use crate::outbound::Outbound;
use crate::render;
use crate::session::Session;
use crate::triage::Phase;

/// What a command can reach while it runs.
pub struct Ctx<'a> {
    pub session: &'a mut Session,
    pub outbound: &'a dyn Outbound,
}

/// What the REPL should do after a command runs.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    /// Input did not start with `/`.
    NotACommand,
    /// Command handled, continue the REPL loop.
    Handled,
    /// Exit the REPL.
    Quit,
}

/// A REPL command. Implement this trait to add new commands.
#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/whoami"`.
    fn name(&self) -> &str;

    /// Alternative names, e.g. `&["/h", "/?"]`.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Argument hint for `/help`, e.g. `"<n>"`.
    fn usage(&self) -> &str {
        ""
    }

    /// One-line description for `/help`.
    fn description(&self) -> &str;

    /// Run the command with everything after its name.
    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult;
}

/// Holds registered commands.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    /// Create a registry with all built-in commands.
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(whoami::WhoamiCommand),
            Arc::new(login::LoginCommand),
            Arc::new(logout::LogoutCommand),
            Arc::new(refresh::RefreshCommand),
            Arc::new(backlog::BacklogCommand),
            Arc::new(filter::FilterCommand),
            Arc::new(start::StartCommand),
            Arc::new(start::StopCommand),
            Arc::new(show::ShowCommand),
            Arc::new(show::EscalationCommand),
            Arc::new(respond::ActionCommand),
            Arc::new(respond::TemplatesCommand),
            Arc::new(respond::PickCommand),
            Arc::new(respond::EditCommand),
            Arc::new(outcome::OutcomeCommand),
            Arc::new(outcome::SubcodeCommand),
            Arc::new(outcome::LanguageCommand),
            Arc::new(outcome::NotesCommand),
            Arc::new(close::CloseCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    /// Register an additional command.
    pub fn register(&mut self, command: Arc<dyn Command>) {
        self.commands.push(command);
    }

    /// Dispatch input to a matching command, or return `NotACommand`.
    pub async fn dispatch(&self, input: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let input = input.trim();
        let (cmd, args) = input
            .split_once(char::is_whitespace)
            .map(|(c, a)| (c, a.trim()))
            .unwrap_or((input, ""));

        for command in &self.commands {
            if cmd == command.name() || command.aliases().contains(&cmd) {
                // /help needs the registry to list all commands
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(args, ctx).await;
            }
        }

        if cmd.starts_with('/') {
            println!("unknown command: {cmd}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    /// Generate help text from all registered commands.
    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.usage(), c.aliases()), c.description()))
            .collect();

        let max_width = entries
            .iter()
            .map(|(label, _)| label.len())
            .max()
            .unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<max_width$}  {desc}\n"));
        }
        out
    }

    /// All registered command names (for testing).
    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    /// All registered names and aliases (for duplicate detection).
    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, usage: &str, aliases: &[&str]) -> String {
    let mut label = name.to_string();
    if !usage.is_empty() {
        label.push(' ');
        label.push_str(usage);
    }
    if !aliases.is_empty() {
        label.push_str(&format!(" ({})", aliases.join(", ")));
    }
    label
}

/// Resolve a 1-based position or an exact (case-insensitive) value.
fn pick_option<'a>(options: &[&'a str], arg: &str) -> Option<&'a str> {
    let arg = arg.trim();
    if let Ok(n) = arg.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i)).copied();
    }
    options.iter().find(|o| o.eq_ignore_ascii_case(arg)).copied()
}

/// Print the record on screen with its history, or the terminal message.
fn print_current(session: &Session) {
    match session.workflow().phase() {
        Phase::Idle => println!("  triage is stopped; run /start"),
        Phase::AllDone => println!("  ✓ you have responded to all the text messages"),
        _ => {
            let Some(record) = session.current() else {
                println!("  no record selected");
                return;
            };
            let position = session.workflow().cursor() + 1;
            println!("  message {position} of {}\n", session.view().len());
            print!("{}", render::record_detail(record, Local::now().date_naive()));
            println!("\n  history:");
            print!("{}", render::history_table(&session.current_history()));
            println!("\n  next: /action none | /action respond");
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::config::Settings;
    use crate::outbound::ListOutcome;
    use crate::outbound::mock::MockOutbound;
    use crate::warehouse::BacklogRecord;
    use crate::warehouse::tests::{FixedWarehouse, record};
    use chrono::Utc;

    /// A signed-in session loaded with `backlog`, created just now.
    pub(crate) fn test_session(dir: &tempfile::TempDir, backlog: Vec<BacklogRecord>) -> Session {
        let languages = dir.path().join("languages.csv");
        std::fs::write(&languages, "Lang\nEnglish\nSpanish\n").unwrap();
        let mut settings = Settings::default();
        settings.reference.languages = languages.to_string_lossy().into_owned();
        settings.authorization.allowed_users = vec!["agent@example.com".into()];
        settings.state.db = dir.path().join("state.db").to_string_lossy().into_owned();
        settings.warehouse.path = dir.path().join("missing.db").to_string_lossy().into_owned();
        let mut session = Session::new(
            settings,
            Some(Identity {
                email: "agent@example.com".into(),
                id_token: "tok".into(),
                expires: u64::MAX,
            }),
        );
        let now = Utc::now();
        let backlog = backlog
            .into_iter()
            .map(|mut r| {
                r.created = now;
                r
            })
            .collect();
        session
            .refresh(&FixedWarehouse::new(backlog), now)
            .unwrap();
        session
    }

    pub(crate) fn two_records() -> Vec<BacklogRecord> {
        vec![record("1", "ACME", "Diabetes"), record("2", "ACME", "Asthma")]
    }

    pub(crate) fn no_templates() -> MockOutbound {
        MockOutbound::new(ListOutcome::Templates(vec![]))
    }

    #[test]
    fn all_builtins_registered() {
        let reg = CommandRegistry::new();
        let names = reg.names();
        for name in [
            "/help",
            "/whoami",
            "/login",
            "/logout",
            "/refresh",
            "/backlog",
            "/filter",
            "/start",
            "/stop",
            "/show",
            "/escalation",
            "/action",
            "/templates",
            "/pick",
            "/edit",
            "/outcome",
            "/subcode",
            "/language",
            "/notes",
            "/close",
            "/quit",
        ] {
            assert!(names.contains(&name), "missing: {name}");
        }
    }

    #[test]
    fn no_duplicate_triggers() {
        let reg = CommandRegistry::new();
        let triggers = reg.all_triggers();
        let mut seen = Vec::new();
        for t in &triggers {
            assert!(!seen.contains(t), "duplicate trigger: {t}");
            seen.push(t);
        }
    }

    #[test]
    fn help_text_includes_all_commands() {
        let reg = CommandRegistry::new();
        let text = reg.help_text();
        for name in reg.names() {
            assert!(text.contains(name), "help missing: {name}");
        }
        assert!(text.contains("/h"));
        assert!(text.contains("/pick <n>"));
    }

    #[tokio::test]
    async fn unknown_slash_command_is_handled() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, vec![]);
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        let reg = CommandRegistry::new();
        assert_eq!(reg.dispatch("/foobar", &mut ctx).await, CommandResult::Handled);
        assert_eq!(
            reg.dispatch("hello world", &mut ctx).await,
            CommandResult::NotACommand
        );
    }

    #[tokio::test]
    async fn dispatch_passes_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, two_records());
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        let reg = CommandRegistry::new();
        reg.dispatch("/filter   program   Asthma ", &mut ctx).await;
        assert_eq!(ctx.session.view().len(), 1);
    }

    #[test]
    fn format_label_variants() {
        assert_eq!(format_label("/whoami", "", &[]), "/whoami");
        assert_eq!(format_label("/help", "", &["/h", "/?"]), "/help (/h, /?)");
        assert_eq!(format_label("/pick", "<n>", &[]), "/pick <n>");
    }

    #[test]
    fn pick_option_by_position_or_name() {
        let options = ["Inbound SMS", "Inbound SMS - Wrong Number"];
        assert_eq!(pick_option(&options, "2"), Some("Inbound SMS - Wrong Number"));
        assert_eq!(pick_option(&options, "inbound sms"), Some("Inbound SMS"));
        assert_eq!(pick_option(&options, "0"), None);
        assert_eq!(pick_option(&options, "3"), None);
        assert_eq!(pick_option(&options, "other"), None);
    }
}
