pub mod auth;
pub mod awards;
pub mod departments;
pub mod events;
pub mod profile;
pub mod students;
pub mod teachers;

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::ApiError;

/// Backend document id (`_id`).
#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ObjectId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for ObjectId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ObjectId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A named lookup entry: department, group, award type or degree, event level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Named {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
}

/// A reference the backend sends either as a bare id or populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reference {
    Populated(Named),
    Id(ObjectId),
}

impl Reference {
    pub fn id(&self) -> &ObjectId {
        match self {
            Reference::Populated(named) => &named.id,
            Reference::Id(id) => id,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Reference::Populated(named) if !named.name.is_empty() => Some(&named.name),
            _ => None,
        }
    }
}

impl From<ObjectId> for Reference {
    fn from(id: ObjectId) -> Self {
        Reference::Id(id)
    }
}

/// A person as embedded in other documents: populated, or just a display label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonRef {
    Populated(PersonName),
    Label(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    #[serde(rename = "_id", default)]
    pub id: Option<ObjectId>,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
}

impl PersonName {
    pub fn full_name(&self) -> String {
        full_name(&self.last_name, &self.first_name, self.middle_name.as_deref())
    }
}

impl Display for PersonRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersonRef::Populated(person) => {
                write!(f, "{} {}", person.last_name, person.first_name)
            }
            PersonRef::Label(label) => f.write_str(label),
        }
    }
}

pub(crate) fn full_name(last_name: &str, first_name: &str, middle_name: Option<&str>) -> String {
    [Some(last_name), Some(first_name), middle_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn require_id(id: &ObjectId, what: &str) -> Result<(), ApiError> {
    if id.is_empty() {
        return Err(ApiError::InvalidRequest(format!("{what} id is not set")));
    }
    Ok(())
}
