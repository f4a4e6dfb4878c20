use super::{full_name, require_id, ObjectId, Reference};
use crate::envelope::Empty;
use crate::macros::setters;
use crate::request::{Endpoint, Method, RequestData};
use crate::ApiError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Display;

// Common

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub department_id: Option<Reference>,
    #[serde(default)]
    pub group_id: Option<Reference>,
    #[serde(default)]
    pub department_name: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub level: Option<Level>,
}

impl Student {
    pub fn full_name(&self) -> String {
        full_name(&self.last_name, &self.first_name, self.middle_name.as_deref())
    }

    pub fn points(&self) -> u32 {
        self.points.unwrap_or_default()
    }

    /// Department name, from the flat field or a populated reference.
    pub fn department(&self) -> Option<&str> {
        self.department_name
            .as_deref()
            .or_else(|| self.department_id.as_ref().and_then(Reference::name))
    }

    pub fn group(&self) -> Option<&str> {
        self.group_name
            .as_deref()
            .or_else(|| self.group_id.as_ref().and_then(Reference::name))
    }

    /// Case-insensitive match against the full name.
    pub fn matches_name(&self, needle: &str) -> bool {
        self.full_name()
            .to_lowercase()
            .contains(&needle.trim().to_lowercase())
    }
}

/// Achievement level; older records store a rank, newer ones a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Level {
    Rank(u32),
    Name(String),
}

impl Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::Rank(rank) => write!(f, "{rank}"),
            Level::Name(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StudentData {
    pub last_name: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub department_id: ObjectId,
    pub group_id: ObjectId,
    pub email: String,
}

impl StudentData {
    fn validate(&self) -> Result<(), ApiError> {
        if self.last_name.trim().is_empty() || self.first_name.trim().is_empty() {
            return Err(ApiError::InvalidRequest(
                "student first and last name are required".to_string(),
            ));
        }
        require_id(&self.department_id, "department")?;
        require_id(&self.group_id, "group")
    }
}

// Requests

#[derive(Debug, Clone, Default)]
pub struct ListStudents;

impl Endpoint for ListStudents {
    type Data = ();
    type Response = Vec<Student>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/students".into()
    }
}

#[derive(Debug, Clone)]
pub struct CreateStudent {
    student: StudentData,
}

impl CreateStudent {
    pub fn new(
        last_name: impl Into<String>,
        first_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            student: StudentData {
                last_name: last_name.into(),
                first_name: first_name.into(),
                email: email.into(),
                ..StudentData::default()
            },
        }
    }

    setters!(student {
        department_id: ObjectId,
        group_id: ObjectId,
    } optional {
        middle_name: String,
    });
}

impl Endpoint for CreateStudent {
    type Data = StudentData;
    type Response = Student;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/students".into()
    }

    fn data(&self) -> RequestData<&StudentData> {
        RequestData::Json(&self.student)
    }

    fn validate(&self) -> Result<(), ApiError> {
        self.student.validate()
    }
}

#[derive(Debug, Clone)]
pub struct UpdateStudent {
    id: ObjectId,
    student: StudentData,
}

impl UpdateStudent {
    pub fn new(id: impl Into<ObjectId>, student: StudentData) -> Self {
        Self {
            id: id.into(),
            student,
        }
    }
}

impl Endpoint for UpdateStudent {
    type Data = StudentData;
    type Response = Student;
    const METHOD: Method = Method::PUT;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/students/{}", self.id).into()
    }

    fn data(&self) -> RequestData<&StudentData> {
        RequestData::Json(&self.student)
    }

    fn validate(&self) -> Result<(), ApiError> {
        require_id(&self.id, "student")?;
        self.student.validate()
    }
}

#[derive(Debug, Clone)]
pub struct DeleteStudent {
    id: ObjectId,
}

impl DeleteStudent {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self { id: id.into() }
    }
}

impl Endpoint for DeleteStudent {
    type Data = ();
    type Response = Empty;
    const METHOD: Method = Method::DELETE;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/students/{}", self.id).into()
    }

    fn validate(&self) -> Result<(), ApiError> {
        require_id(&self.id, "student")
    }
}
