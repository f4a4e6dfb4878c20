//! Data lookups behind the CLI commands.
//!
//! These are generic over the client's transport and storage so they can be
//! driven against a mock backend.

mod handlers;

pub use handlers::{dispatch, Output};

use kudos_api::endpoints::awards::{filter_degrees, AwardDegree, AwardType};
use kudos_api::endpoints::departments::Group;
use kudos_api::endpoints::students::Student;
use kudos_api::{ApiError, Client, Request, TokenStorage, Transport};

use crate::leaderboard::{leaderboard, LeaderboardPage, LeaderboardQuery};

/// Groups of a department. An empty department id answers an empty list
/// without contacting the backend.
pub async fn groups<T, S>(client: &Client<T, S>, department_id: &str) -> Result<Vec<Group>, ApiError>
where
    T: Transport,
    S: TokenStorage,
{
    let department_id = department_id.trim();
    if department_id.is_empty() {
        tracing::debug!("No department selected, skipping group lookup");
        return Ok(Vec::new());
    }

    client
        .send(Request::departments().groups(department_id))
        .await
}

/// Students whose full name contains `search`, or all of them.
pub async fn students<T, S>(
    client: &Client<T, S>,
    search: Option<&str>,
) -> Result<Vec<Student>, ApiError>
where
    T: Transport,
    S: TokenStorage,
{
    let students = client.send(Request::students().list()).await?;
    Ok(match search {
        Some(needle) => students
            .into_iter()
            .filter(|student| student.matches_name(needle))
            .collect(),
        None => students,
    })
}

/// Ends the session. Answers `false` when there was none to end.
///
/// A backend that cannot be reached is not an error here since the local
/// token is gone regardless; a token that could not be cleared is.
pub async fn end_session<T, S>(client: &Client<T, S>) -> Result<bool, ApiError>
where
    T: Transport,
    S: TokenStorage,
{
    if !client.is_authenticated() {
        return Ok(false);
    }

    match client.logout().await {
        Ok(()) => Ok(true),
        Err(e @ ApiError::Storage(_)) => Err(e),
        Err(e) => {
            tracing::warn!(error = %e, "Backend logout failed");
            Ok(true)
        }
    }
}

pub async fn standings<T, S>(
    client: &Client<T, S>,
    query: &LeaderboardQuery,
) -> Result<LeaderboardPage, ApiError>
where
    T: Transport,
    S: TokenStorage,
{
    let students = client.send(Request::students().list()).await?;
    tracing::debug!(count = students.len(), "Ranking students");
    Ok(leaderboard(&students, query))
}

/// Degrees that can be awarded with the named type; every degree without one.
pub async fn award_degrees<T, S>(
    client: &Client<T, S>,
    type_name: Option<&str>,
) -> Result<Vec<AwardDegree>, ApiError>
where
    T: Transport,
    S: TokenStorage,
{
    let degrees = client.send(Request::awards().degrees()).await?;
    let Some(type_name) = type_name else {
        return Ok(degrees);
    };

    let types = client.send(Request::awards().types()).await?;
    let selected: Option<&AwardType> = types
        .iter()
        .find(|award_type| award_type.name.to_lowercase() == type_name.trim().to_lowercase());
    if selected.is_none() {
        tracing::warn!(type_name, "Unknown award type");
        return Ok(Vec::new());
    }

    Ok(filter_degrees(selected, &degrees)
        .into_iter()
        .cloned()
        .collect())
}
