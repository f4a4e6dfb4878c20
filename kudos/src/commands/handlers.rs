use anyhow::Result;
use comfy_table::Table;
use kudos_api::Request;
use kudos_auth::PortalClient;
use serde::Serialize;

use crate::cli::{Commands, QueryCommand};
use crate::leaderboard::LeaderboardQuery;
use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Output {
    #[default]
    Table,
    Json,
}

impl Output {
    fn emit<T: Serialize + ?Sized>(self, value: &T, table: impl FnOnce(&T) -> Table) -> Result<()> {
        match self {
            Output::Table => println!("{}", table(value)),
            Output::Json => println!("{}", serde_json::to_string_pretty(value)?),
        }
        Ok(())
    }
}

pub async fn dispatch(client: &PortalClient, command: Commands, output: Output) -> Result<()> {
    match command {
        Commands::Login => login(client).await,
        Commands::Logout => logout(client).await,
        Commands::Query(command) => {
            kudos_auth::ensure_session(client).await?;
            query(client, command, output).await
        }
    }
}

async fn login(client: &PortalClient) -> Result<()> {
    let response = kudos_auth::login_interactive(client).await?;
    if let Some(message) = response.message {
        println!("{}", message);
    }
    if let Some(role) = response.role {
        println!("Role: {:?}", role);
    }
    Ok(())
}

async fn logout(client: &PortalClient) -> Result<()> {
    if super::end_session(client).await? {
        println!("Logged out.");
    } else {
        println!("Not logged in.");
    }
    Ok(())
}

async fn query(client: &PortalClient, command: QueryCommand, output: Output) -> Result<()> {
    match command {
        QueryCommand::Profile => match client.send(Request::profile().get()).await? {
            Some(profile) => output.emit(&profile, |profile| {
                render::profile_table(profile, client.transport().base_url())
            }),
            None => {
                println!("No profile yet.");
                Ok(())
            }
        },
        QueryCommand::Events => {
            let mut events = client.send(Request::events().list()).await?;
            events.sort_by_key(|event| event.starts_at());
            output.emit(events.as_slice(), render::events_table)
        }
        QueryCommand::Students { search } => {
            let students = super::students(client, search.as_deref()).await?;
            let show_email = client
                .storage()
                .session()
                .and_then(|session| session.role)
                .is_some_and(|role| role.can_manage());
            output.emit(students.as_slice(), |students| {
                render::students_table(students, show_email)
            })
        }
        QueryCommand::Teachers => {
            let teachers = client.send(Request::teachers().list()).await?;
            output.emit(teachers.as_slice(), render::teachers_table)
        }
        QueryCommand::Departments => {
            let departments = client.send(Request::departments().list()).await?;
            output.emit(departments.as_slice(), render::named_table)
        }
        QueryCommand::Groups { department } => {
            let groups = super::groups(client, department.as_deref().unwrap_or_default()).await?;
            output.emit(groups.as_slice(), render::groups_table)
        }
        QueryCommand::Leaderboard {
            department,
            group,
            asc,
            page,
        } => {
            let query = LeaderboardQuery {
                department,
                group,
                ascending: asc,
                page,
            };
            let standings = super::standings(client, &query).await?;
            output.emit(&standings, render::leaderboard_table)?;
            if output == Output::Table {
                println!(
                    "Page {} of {} ({} students)",
                    standings.page, standings.total_pages, standings.total
                );
            }
            Ok(())
        }
        QueryCommand::AwardTypes => {
            let types = client.send(Request::awards().types()).await?;
            output.emit(types.as_slice(), render::award_types_table)
        }
        QueryCommand::AwardDegrees { award_type } => {
            let degrees = super::award_degrees(client, award_type.as_deref()).await?;
            output.emit(degrees.as_slice(), render::named_table)
        }
    }
}
