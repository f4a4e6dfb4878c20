use super::{require_id, Named, ObjectId, PersonRef};
use crate::envelope::Empty;
use crate::macros::setters;
use crate::request::{Endpoint, Method, RequestData};
use crate::ApiError;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Required: a created event without an id is a malformed response.
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "dateTime", default)]
    pub date_time: String,
    #[serde(rename = "iconType", default)]
    pub icon_type: Option<EventKind>,
    #[serde(default)]
    pub teacher: Option<PersonRef>,
    #[serde(default)]
    pub students: Vec<PersonRef>,
    #[serde(default)]
    pub level: Option<String>,
}

impl Event {
    /// Start time as entered. Accepts RFC 3339 and the `datetime-local`
    /// forms the portal sends; the offset, if any, is dropped.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        let value = self.date_time.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.naive_local());
        }
        LOCAL_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Conference,
    Hackathon,
    Seminar,
    Tournament,
    #[serde(other)]
    Other,
}

/// A selectable option as returned by the lookup endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choice {
    Named(Named),
    Person(super::PersonName),
    Label(String),
}

impl Choice {
    pub fn label(&self) -> String {
        match self {
            Choice::Named(named) => named.name.clone(),
            Choice::Person(person) => person.full_name(),
            Choice::Label(label) => label.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventData {
    pub title: String,
    #[serde(rename = "dateTime")]
    pub date_time: String,
    #[serde(rename = "iconType")]
    pub icon_type: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    pub students: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
}

impl EventData {
    pub fn new(title: impl Into<String>, date_time: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date_time: date_time.into(),
            icon_type: EventKind::Conference,
            teacher: None,
            students: Vec::new(),
            level: None,
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.title.trim().is_empty() {
            return Err(ApiError::InvalidRequest("event title is required".to_string()));
        }
        if self.date_time.trim().is_empty() {
            return Err(ApiError::InvalidRequest("event date is required".to_string()));
        }
        Ok(())
    }
}

// Requests

#[derive(Debug, Clone, Default)]
pub struct ListEvents;

impl Endpoint for ListEvents {
    type Data = ();
    type Response = Vec<Event>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/events".into()
    }
}

#[derive(Debug, Clone)]
pub struct CreateEvent {
    event: EventData,
}

impl CreateEvent {
    pub fn new(title: impl Into<String>, date_time: impl Into<String>) -> Self {
        Self {
            event: EventData::new(title, date_time),
        }
    }

    setters!(event {
        icon_type: EventKind,
        students: Vec<String>,
    } optional {
        teacher: String,
        level: String,
    });
}

impl Endpoint for CreateEvent {
    type Data = EventData;
    type Response = Event;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/events".into()
    }

    fn data(&self) -> RequestData<&EventData> {
        RequestData::Json(&self.event)
    }

    fn validate(&self) -> Result<(), ApiError> {
        self.event.validate()
    }
}

#[derive(Debug, Clone)]
pub struct UpdateEvent {
    id: ObjectId,
    event: EventData,
}

impl UpdateEvent {
    pub fn new(id: impl Into<ObjectId>, event: EventData) -> Self {
        Self {
            id: id.into(),
            event,
        }
    }
}

impl Endpoint for UpdateEvent {
    type Data = EventData;
    type Response = Event;
    const METHOD: Method = Method::PUT;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/events/{}", self.id).into()
    }

    fn data(&self) -> RequestData<&EventData> {
        RequestData::Json(&self.event)
    }

    fn validate(&self) -> Result<(), ApiError> {
        require_id(&self.id, "event")?;
        self.event.validate()
    }
}

#[derive(Debug, Clone)]
pub struct DeleteEvent {
    id: ObjectId,
}

impl DeleteEvent {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self { id: id.into() }
    }
}

impl Endpoint for DeleteEvent {
    type Data = ();
    type Response = Empty;
    const METHOD: Method = Method::DELETE;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/events/{}", self.id).into()
    }

    fn validate(&self) -> Result<(), ApiError> {
        require_id(&self.id, "event")
    }
}

/// Lookup lists used when filling in an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventLookup {
    Students,
    Teachers,
    Levels,
}

#[derive(Debug, Clone)]
pub struct ListEventChoices {
    lookup: EventLookup,
}

impl ListEventChoices {
    pub fn new(lookup: EventLookup) -> Self {
        Self { lookup }
    }
}

impl Endpoint for ListEventChoices {
    type Data = ();
    type Response = Vec<Choice>;

    fn endpoint(&self) -> Cow<'_, str> {
        match self.lookup {
            EventLookup::Students => "/events/students",
            EventLookup::Teachers => "/events/teachers",
            EventLookup::Levels => "/events/levels",
        }
        .into()
    }
}
