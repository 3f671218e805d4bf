use clap::Subcommand;
use serde_json::json;
use uuid::Uuid;

use crate::auth::AuthService;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;

#[derive(Subcommand)]
pub enum TokenCommands {
    #[command(about = "Issue a bearer token for a staff member")]
    Issue {
        #[arg(help = "Staff id the token is issued for")]
        staff_id: Uuid,
    },

    #[command(about = "Check a bearer token and print the staff id it carries")]
    Verify {
        #[arg(help = "Bearer token")]
        token: String,
    },
}

pub async fn handle(cmd: TokenCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let auth = AuthService::from_config(&config().security);
    match cmd {
        TokenCommands::Issue { staff_id } => {
            let token = auth.issue_token(staff_id)?;
            output_success(&output_format, "Token issued", Some(json!({ "token": token })))
        }
        TokenCommands::Verify { token } => {
            let staff_id = auth.verify_token(&token)?;
            output_success(&output_format, "Token valid", Some(json!({ "staff_id": staff_id })))
        }
    }
}
