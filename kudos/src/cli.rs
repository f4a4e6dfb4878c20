//! CLI entry and dispatch.

use anyhow::Result;
use clap::Parser;
use kudos_api::ApiError;
use kudos_auth::AuthError;

use crate::commands::{self, Output};

#[derive(Parser)]
#[command(name = "kudos")]
#[command(version)]
#[command(about = "Student achievements portal from the terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Log in and save the session
    Login,

    /// End the session and forget it locally
    Logout,

    #[command(flatten)]
    Query(QueryCommand),
}

/// Commands that need a session; the user is asked to log in when there is none.
#[derive(clap::Subcommand)]
pub enum QueryCommand {
    /// Show your profile
    Profile,

    /// List events, earliest first
    Events,

    /// List students
    Students {
        /// Only students whose name contains this text
        #[arg(long)]
        search: Option<String>,
    },

    /// List teachers
    Teachers,

    /// List departments
    Departments,

    /// List the groups of a department
    Groups {
        /// Department id
        #[arg(value_name = "DEPARTMENT_ID")]
        department: Option<String>,
    },

    /// Students ranked by points
    Leaderboard {
        /// Only departments whose name contains this text
        #[arg(long)]
        department: Option<String>,

        /// Only groups whose name contains this text
        #[arg(long)]
        group: Option<String>,

        /// Lowest points first
        #[arg(long)]
        asc: bool,

        /// Page number (5 students per page)
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// List award types with the degrees each allows
    AwardTypes,

    /// List award degrees
    AwardDegrees {
        /// Only degrees allowed for this award type
        #[arg(long = "type", value_name = "AWARD_TYPE")]
        award_type: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let settings = kudos_auth::load_settings()?;
    let client = kudos_auth::restore_session(&settings)?;
    tracing::info!(base_url = %settings.base_url, "Session restored");

    let output = if cli.json { Output::Json } else { Output::Table };
    let outcome = commands::dispatch(&client, cli.command, output).await;

    // The backend may have rotated the refresh cookie during this run
    if let Err(e) = kudos_auth::persist_refresh_cookie(&client) {
        tracing::warn!(error = %e, "Failed to save refresh cookie");
    }

    outcome
}

/// True when the command failed because the session can no longer be refreshed.
pub fn session_expired(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::is_auth_expired)
        || err
            .downcast_ref::<AuthError>()
            .is_some_and(AuthError::is_auth_expired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kudos_api::ExpiryReason;

    #[test]
    fn test_parse_leaderboard_flags() {
        let cli = Cli::parse_from([
            "kudos",
            "leaderboard",
            "--department",
            "инф",
            "--asc",
            "--page",
            "3",
            "--json",
        ]);

        assert!(cli.json);
        match cli.command {
            Commands::Query(QueryCommand::Leaderboard {
                department,
                group,
                asc,
                page,
            }) => {
                assert_eq!(department.as_deref(), Some("инф"));
                assert_eq!(group, None);
                assert!(asc);
                assert_eq!(page, 3);
            }
            _ => panic!("expected leaderboard"),
        }
    }

    #[test]
    fn test_groups_department_is_optional() {
        let cli = Cli::parse_from(["kudos", "groups"]);
        match cli.command {
            Commands::Query(QueryCommand::Groups { department }) => assert_eq!(department, None),
            _ => panic!("expected groups"),
        }
    }

    #[test]
    fn test_award_degrees_type_flag() {
        let cli = Cli::parse_from(["kudos", "award-degrees", "--type", "Диплом"]);
        match cli.command {
            Commands::Query(QueryCommand::AwardDegrees { award_type }) => {
                assert_eq!(award_type.as_deref(), Some("Диплом"))
            }
            _ => panic!("expected award-degrees"),
        }
    }

    #[test]
    fn test_session_expired_detection() {
        let expired = anyhow::Error::new(ApiError::AuthExpired {
            reason: ExpiryReason::RetryExhausted,
        });
        assert!(session_expired(&expired));

        let wrapped = anyhow::Error::new(AuthError::Api(ApiError::AuthExpired {
            reason: ExpiryReason::MissingToken,
        }));
        assert!(session_expired(&wrapped));

        let other = anyhow::Error::new(ApiError::InvalidRequest("bad".to_string()));
        assert!(!session_expired(&other));
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
