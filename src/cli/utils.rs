use serde_json::{json, Value};

use crate::auth::{AuthOutcome, Principal};
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(Value::Object(extra)), Some(object)) = (data, response.as_object_mut()) {
                object.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

pub fn principal_json(principal: &Principal) -> Value {
    json!({
        "id": principal.id,
        "email": principal.email,
        "display_name": principal.display_name,
        "account_type": principal.account_type,
        "is_verified": principal.is_verified,
        "last_sign_in_at": principal.last_sign_in_at,
    })
}

pub fn describe_principal(principal: &Principal) -> String {
    let verified = if principal.is_verified { "" } else { ", unverified" };
    format!("{} ({} account{})", principal.label(), principal.account_type, verified)
}

/// Print a probe or retry outcome. Transient outcomes come back as errors so
/// the process exits non-zero without claiming the user is logged out.
pub fn output_outcome(output_format: &OutputFormat, outcome: &AuthOutcome) -> anyhow::Result<()> {
    match outcome {
        AuthOutcome::Authenticated(principal) => output_success(
            output_format,
            &format!("Signed in as {}", describe_principal(principal)),
            Some(json!({ "outcome": outcome.kind(), "principal": principal_json(principal) })),
        ),
        AuthOutcome::Unauthenticated => output_success(
            output_format,
            "Not logged in. Run `binna auth login` to sign in.",
            Some(json!({ "outcome": outcome.kind(), "principal": null })),
        ),
        AuthOutcome::TransientError(reason) => {
            output_error(
                output_format,
                &format!("Couldn't verify your session ({}). Please try again.", reason),
                Some(reason.kind()),
            )?;
            Err(anyhow::anyhow!("session check failed: {}", reason))
        }
    }
}
