use clap::Subcommand;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::watch;

use super::{identity_client, restore_session};
use crate::auth::AccountType;
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::guard::{GuardOptions, GuardState, PageGuard};
use crate::navigation::Navigator;

#[derive(Subcommand)]
pub enum PageCommands {
    #[command(about = "Open a protected page behind the session guard")]
    Open {
        #[arg(help = "Page path, e.g. /dashboard")]
        path: String,
        #[arg(long, help = "Account type the page requires (user, store)")]
        require: Option<String>,
        #[arg(long, default_value_t = 0, help = "Press retry this many times if the session check degrades")]
        retries: u32,
    },
}

/// Terminal stand-in for client-side navigation.
struct TerminalNavigator {
    output_format: OutputFormat,
}

impl Navigator for TerminalNavigator {
    fn redirect_to(&self, path: &str) {
        if let OutputFormat::Text = self.output_format {
            println!("→ Redirecting to {} (run `binna auth login` to sign in)", path);
        }
    }
}

pub async fn handle(cmd: PageCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PageCommands::Open { path, require, retries } => open_page(&path, require, retries, output_format).await,
    }
}

async fn open_page(path: &str, require: Option<String>, retries: u32, output_format: OutputFormat) -> anyhow::Result<()> {
    let identity = identity_client()?;
    let navigator = Arc::new(TerminalNavigator {
        output_format: output_format.clone(),
    });

    let mut options = GuardOptions::from_config(&config().guard);
    if let Some(required) = require.as_deref() {
        options = options.require(AccountType::from(required));
    }
    let login_path = options.login_path.clone();

    let mut guard = PageGuard::mount(Arc::clone(&identity), navigator, options);
    let mut progress = guard.subscribe();

    // hydration: the stored session has to be attached before the first probe
    let restored = restore_session(&identity).await?;
    tracing::debug!(page = path, restored, "session restored, opening hydration gate");
    guard.hydrate();

    let mut retries_left = retries;
    let state = loop {
        match render_until_settled(&mut progress, &output_format).await {
            GuardState::Degraded { reason, .. } if retries_left > 0 => {
                retries_left -= 1;
                if let OutputFormat::Text = output_format {
                    println!("Couldn't verify your session ({}). Retrying...", reason);
                }
                guard.retry()?;
            }
            settled => break settled,
        }
    };

    report(state, path, &login_path, &output_format)
}

/// Print the settled page and turn everything but `Authorized` into an error exit.
fn report(state: GuardState, path: &str, login_path: &str, output_format: &OutputFormat) -> anyhow::Result<()> {
    match state {
        GuardState::Authorized(principal) => output_success(
            output_format,
            &format!("Rendering {} for {}", path, describe_principal(&principal)),
            Some(json!({ "page": path, "state": "authorized", "principal": principal_json(&principal) })),
        ),
        GuardState::Denied => {
            // the navigator already printed the redirect in text mode
            if let OutputFormat::Json = output_format {
                println!("{}", serde_json::to_string_pretty(&denied_json(path, login_path))?);
            }
            Err(anyhow::anyhow!("not logged in; {} redirected to {}", path, login_path))
        }
        GuardState::Forbidden { principal, required } => {
            let message = format!(
                "{} requires a {} account; signed in as {}",
                path,
                required,
                describe_principal(&principal)
            );
            output_error(output_format, &message, Some("FORBIDDEN"))?;
            Err(anyhow::anyhow!(message))
        }
        GuardState::Degraded { reason, attempts } => {
            let message = format!("Couldn't verify your session after {} attempts ({}). Try again.", attempts, reason);
            output_error(output_format, &message, Some("AUTH_CHECK_FAILED"))?;
            Err(anyhow::anyhow!(message))
        }
        GuardState::Idle | GuardState::Checking { .. } => Err(anyhow::anyhow!("session check for {} did not finish", path)),
    }
}

/// Show the loading skeleton until the guard settles, then return the terminal state.
async fn render_until_settled(progress: &mut watch::Receiver<GuardState>, output_format: &OutputFormat) -> GuardState {
    let mut last_shown = None;
    loop {
        let state = progress.borrow_and_update().clone();
        if state.is_terminal() {
            return state;
        }

        if let (GuardState::Checking { attempt, max_attempts }, OutputFormat::Text) = (&state, output_format) {
            if last_shown != Some(*attempt) {
                println!("Checking session (attempt {}/{})...", attempt, max_attempts);
                last_shown = Some(*attempt);
            }
        }

        if progress.changed().await.is_err() {
            return progress.borrow().clone();
        }
    }
}

fn denied_json(path: &str, login_path: &str) -> serde_json::Value {
    json!({
        "success": false,
        "page": path,
        "state": "denied",
        "redirect": login_path,
    })
}
