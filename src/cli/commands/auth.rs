use clap::Subcommand;
use serde_json::json;

use super::{identity_client, restore_session};
use crate::auth::{RetryPolicy, SessionProbe};
use crate::cli::config::{clear_session, save_session, StoredSession};
use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Sign in and store the session locally")]
    Login {
        #[arg(help = "Email address")]
        email: Option<String>,
        #[arg(long, env = "BINNA_PASSWORD", hide_env_values = true, help = "Password")]
        password: Option<String>,
        #[arg(long, conflicts_with = "email", help = "Store an existing access token instead of signing in")]
        token: Option<String>,
    },

    #[command(about = "Forget the locally stored session")]
    Logout,

    #[command(about = "Ask the identity provider once who the current user is")]
    Whoami,

    #[command(about = "Check the session with retries, like a protected page does")]
    Status,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::Login { email, password, token } => {
            if let Some(token) = token {
                save_session(&StoredSession::new(token, None, None, None))?;
                return output_success(&output_format, "Access token stored", None);
            }

            let email = email.ok_or_else(|| anyhow::anyhow!("Email is required (or pass --token)"))?;
            let password = password.ok_or_else(|| anyhow::anyhow!("Password is required (--password or BINNA_PASSWORD)"))?;

            let identity = identity_client()?;
            let session = identity
                .sign_in_with_password(&email, &password)
                .await
                .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;

            save_session(&StoredSession::new(
                session.access_token,
                session.refresh_token,
                Some(email),
                session.expires_in,
            ))?;

            output_success(
                &output_format,
                &format!("Logged in as {}", describe_principal(&session.principal)),
                Some(json!({ "principal": principal_json(&session.principal) })),
            )
        }
        AuthCommands::Logout => {
            let removed = clear_session()?;
            let message = if removed { "Logged out" } else { "No stored session" };
            output_success(&output_format, message, Some(json!({ "removed": removed })))
        }
        AuthCommands::Whoami => {
            let identity = identity_client()?;
            restore_session(&identity).await?;

            let probe = SessionProbe::new(identity, config().guard.attempt_timeout());
            let outcome = probe.probe().await;
            output_outcome(&output_format, &outcome)
        }
        AuthCommands::Status => {
            let identity = identity_client()?;
            restore_session(&identity).await?;

            let probe = SessionProbe::new(identity, config().guard.attempt_timeout());
            let outcome = RetryPolicy::from_config(&config().guard).run(&probe).await;
            output_outcome(&output_format, &outcome)
        }
    }
}
