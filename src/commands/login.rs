use async_trait::async_trait;

use super::{Command, CommandResult, Ctx};
use crate::auth::{self, oauth};

pub struct LoginCommand;

#[async_trait]
impl Command for LoginCommand {
    fn name(&self) -> &str {
        "/login"
    }

    fn description(&self) -> &str {
        "sign in with your work account"
    }

    async fn execute(&self, _args: &str, ctx: &mut Ctx<'_>) -> CommandResult {
        let settings = ctx.session.settings().clone();
        println!("Signing in...\n");

        let (url, verifier) = oauth::build_authorize_url(&settings.oauth);
        let _ = open::that(&url);

        println!("Open this URL to authenticate:\n");
        println!("  {url}\n");

        print!("Paste the authorization code (or the page address you were sent to): ");
        if std::io::Write::flush(&mut std::io::stdout()).is_err() {
            return CommandResult::Handled;
        }

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input).is_err() {
            eprintln!("  ✗ failed to read input");
            return CommandResult::Handled;
        }
        let code = oauth::extract_code(&input);

        if code.is_empty() {
            eprintln!("  ✗ no authorization code provided");
            return CommandResult::Handled;
        }

        println!("\nExchanging code for tokens...");
        match auth::login(
            &settings.state.db,
            &settings.oauth,
            &settings.authorization,
            &code,
            &verifier,
        )
        .await
        {
            Ok(identity) => {
                println!("  ✓ signed in as {}", identity.email);
                ctx.session.sign_in(identity);
            }
            Err(e) => {
                eprintln!("  ✗ login failed: {e:#}");
                ctx.session.sign_out();
            }
        }
        CommandResult::Handled
    }
}
