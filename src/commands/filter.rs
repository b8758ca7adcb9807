use async_trait::async_trait;
use chrono::Utc;

use super::{Command, CommandResult, Ctx, pick_option};
use crate::filter::{self, DateRange, Field, FilterState};
use crate::render;
use crate::session::Session;

pub struct FilterCommand;

#[async_trait]
impl Command for FilterCommand {
    fn name(&self) -> &str {
        "/filter"
    }

    fn aliases(&self) -> &[&str] {
        &["/f"]
    }

    fn usage(&self) -> &str {
        "[field [value|n|all]]"
    }

    fn description(&self) -> &str {
        "show or change client/program/touchpoint/language/dates filters"
    }

    async fn execute(&self, args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        if args.is_empty() {
            print_filters(ctx.session.filters());
            return CommandResult::Handled;
        }
        let (field, value) = args
            .split_once(char::is_whitespace)
            .map(|(f, v)| (f, v.trim()))
            .unwrap_or((args, ""));
        let field: Field = match field.parse() {
            Ok(f) => f,
            Err(e) => {
                eprintln!("  ✗ {e}");
                return CommandResult::Handled;
            }
        };

        let options = options_for(ctx.session, field);
        if value.is_empty() {
            print!("{}", render::numbered(&options));
            return CommandResult::Handled;
        }
        let value = pick_option(&refs(&options), value)
            .map(str::to_string)
            .unwrap_or_else(|| value.to_string());

        match ctx.session.set_filter(field, &value, Utc::now()) {
            Ok(true) => {
                println!(
                    "  ✓ {} messages match; triage reset, run /start to resume",
                    ctx.session.view().len()
                );
            }
            Ok(false) => println!("  filter unchanged"),
            Err(e) => eprintln!("  ✗ {e}"),
        }
        CommandResult::Handled
    }
}

/// `All` followed by the values available under the upstream selections.
fn options_for(session: &Session, field: Field) -> Vec<String> {
    if field == Field::Dates {
        return DateRange::ALL.iter().map(|d| d.to_string()).collect();
    }
    let Some(snapshot) = session.snapshot() else {
        return vec!["All".to_string()];
    };
    let backlog = &snapshot.backlog;
    let filters = session.filters();
    let values = match field {
        Field::Client => filter::client_options(backlog),
        Field::Program => filters.program_options(backlog),
        Field::Touchpoint => filters.touchpoint_options(backlog),
        Field::Language => filter::language_options(backlog),
        Field::Dates => Vec::new(),
    };
    std::iter::once("All")
        .chain(values)
        .map(str::to_string)
        .collect()
}

fn refs(options: &[String]) -> Vec<&str> {
    options.iter().map(String::as_str).collect()
}

fn print_filters(filters: &FilterState) {
    println!("  client     {}", filters.client);
    println!("  program    {}", filters.program);
    println!("  touchpoint {}", filters.touchpoint);
    println!("  language   {}", filters.language);
    println!("  dates      {}", filters.dates);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::tests::{no_templates, test_session, two_records};
    use crate::filter::Selection;

    #[tokio::test]
    async fn select_by_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, two_records());
        assert_eq!(
            options_for(&session, Field::Program),
            vec!["All", "Diabetes", "Asthma"]
        );
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        FilterCommand.execute("program 3", &mut ctx).await;
        assert_eq!(
            ctx.session.filters().program,
            Selection::Only("Asthma".into())
        );
        FilterCommand.execute("program 1", &mut ctx).await;
        assert_eq!(ctx.session.filters().program, Selection::All);
        assert_eq!(ctx.session.view().len(), 2);
    }

    #[tokio::test]
    async fn dates_accept_names() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, two_records());
        let out = no_templates();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &out,
        };
        FilterCommand.execute("dates Last Week", &mut ctx).await;
        assert_eq!(ctx.session.filters().dates, DateRange::LastWeek);
        FilterCommand.execute("dates 3", &mut ctx).await;
        assert_eq!(ctx.session.filters().dates, DateRange::LastTwoWeeks);
    }

    #[test]
    fn options_without_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = test_session(&dir, vec![]);
        session.invalidate();
        assert_eq!(options_for(&session, Field::Client), vec!["All"]);
        assert_eq!(options_for(&session, Field::Dates).len(), 3);
    }
}
