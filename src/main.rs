use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use sms_queue::auth::{self, AccessGate, oauth};
use sms_queue::commands::{CommandRegistry, CommandResult, Ctx};
use sms_queue::config::Settings;
use sms_queue::logging;
use sms_queue::outbound::http::HttpOutbound;
use sms_queue::render::{BannerInfo, print_banner, print_session_summary};
use sms_queue::session::Session;
use sms_queue::warehouse::sqlite::SqliteWarehouse;

#[derive(Parser)]
#[command(name = "smsq", version, about = "Triage inbound member text messages.")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Settings file (default: ./smsq.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Local state database holding the signed-in identity
    #[arg(short, long)]
    db: Option<String>,

    /// SQLite replica of the warehouse
    #[arg(short, long)]
    warehouse: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with your work account
    Login,
    /// Sign out and forget the stored identity
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.state.db = db;
    }
    if let Some(warehouse) = cli.warehouse {
        settings.warehouse.path = warehouse;
    }
    let log_file = logging::init(Path::new(&settings.log.dir), &settings.log.level)?;

    // Handle subcommands
    if let Some(command) = &cli.command {
        match command {
            Command::Login => return handle_login(&settings).await,
            Command::Logout => return handle_logout(&settings),
        }
    }

    let outbound = HttpOutbound::new(&settings.api.base_url, &settings.api.key)?;

    let mut identity = auth::current(&settings.state.db)?;
    if let Err(denied) = AccessGate::new(&settings.authorization).check(identity.as_ref()) {
        if identity.take().is_some() {
            auth::logout(&settings.state.db)?;
        }
        println!("{denied}");
    }

    let mut session = Session::new(settings, identity);

    // A failed warehouse load is fatal; nothing partial is shown.
    if session.identity().is_some() {
        let warehouse = SqliteWarehouse::open(&session.settings().warehouse.path)?;
        let snapshot = session
            .refresh(&warehouse, Utc::now())
            .context("startup load failed")?;
        info!(messages = snapshot.backlog.len(), "backlog ready");
    }

    let agent = session
        .identity()
        .map(|i| i.email.clone())
        .unwrap_or_else(|| "not signed in (run /login)".to_string());
    print_banner(&BannerInfo {
        agent: &agent,
        warehouse: &session.settings().warehouse.path,
        api: &session.settings().api.base_url,
        log_file: &log_file.display().to_string(),
    });

    let registry = CommandRegistry::new();

    // async stdin so Ctrl+C is caught at the prompt too
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\nsmsq> ");
        io::stdout().flush()?;

        // Read next line, interruptible by Ctrl+C
        let line = tokio::select! {
            result = lines.next_line() => {
                match result {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        // Ctrl+D (EOF)
                        println!();
                        break;
                    }
                    Err(e) => {
                        eprintln!("input error: {}", e);
                        break;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let signed_in = session.identity().is_some();
        let mut ctx = Ctx {
            session: &mut session,
            outbound: &outbound,
        };
        match registry.dispatch(input, &mut ctx).await {
            CommandResult::Quit => break,
            CommandResult::NotACommand => println!("commands start with /; type /help"),
            CommandResult::Handled => {}
        }

        // An identity dropped by the allow-list check is removed from disk too.
        if signed_in && session.identity().is_none() {
            if let Err(e) = auth::logout(&session.settings().state.db) {
                warn!(error = %e, "failed to clear stored identity");
            }
        }
    }

    let backlog = session
        .snapshot()
        .map(|s| s.backlog.as_slice())
        .unwrap_or_default();
    print_session_summary(backlog);
    Ok(())
}

async fn handle_login(settings: &Settings) -> anyhow::Result<()> {
    println!("Signing in...\n");

    let (url, verifier) = oauth::build_authorize_url(&settings.oauth);

    // Try to open browser, silently ignore failures (e.g. headless/SSH)
    let _ = open::that(&url);

    println!("Open this URL to authenticate:\n");
    println!("  {}\n", url);

    print!("Paste the authorization code (or the page address you were sent to): ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let code = oauth::extract_code(&input);

    if code.is_empty() {
        anyhow::bail!("no authorization code provided");
    }

    println!("\nExchanging code for tokens...");
    let identity = auth::login(
        &settings.state.db,
        &settings.oauth,
        &settings.authorization,
        &code,
        &verifier,
    )
    .await?;

    println!("✓ Signed in as {}", identity.email);
    println!("  Identity saved to {}", settings.state.db);
    Ok(())
}

fn handle_logout(settings: &Settings) -> anyhow::Result<()> {
    auth::logout(&settings.state.db)?;
    println!("✓ Signed out.");
    Ok(())
}
