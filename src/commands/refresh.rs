use async_trait::async_trait;
use chrono::Utc;

use super::{Command, CommandResult, Ctx};
use crate::consts::format_number;
use crate::warehouse::sqlite::SqliteWarehouse;

pub struct RefreshCommand;

#[async_trait]
impl Command for RefreshCommand {
    fn name(&self) -> &str {
        "/refresh"
    }

    fn aliases(&self) -> &[&str] {
        &["/r"]
    }

    fn description(&self) -> &str {
        "reload the backlog from the warehouse"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let path = ctx.session.settings().warehouse.path.clone();
        let warehouse = match SqliteWarehouse::open(&path) {
            Ok(w) => w,
            Err(e) => {
                eprintln!("  ✗ {e:#}");
                return CommandResult::Handled;
            }
        };
        match ctx.session.refresh(&warehouse, Utc::now()) {
            Ok(snapshot) => {
                let total = snapshot.backlog.len() as u64;
                println!(
                    "  ✓ loaded {} messages, {} visible with current filters",
                    format_number(total),
                    format_number(ctx.session.view().len() as u64)
                );
            }
            Err(e) => eprintln!("  ✗ {e:#}"),
        }
        CommandResult::Handled
    }
}
