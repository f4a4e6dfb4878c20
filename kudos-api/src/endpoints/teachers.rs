use super::{full_name, require_id, ObjectId};
use crate::envelope::Empty;
use crate::macros::setters;
use crate::request::{Endpoint, Method, RequestData};
use crate::ApiError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// Common

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub email: String,
    #[serde(default = "default_is_teacher")]
    pub is_teacher: bool,
}

impl Teacher {
    pub fn full_name(&self) -> String {
        full_name(&self.last_name, &self.first_name, self.middle_name.as_deref())
    }
}

fn default_is_teacher() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeacherData {
    pub last_name: String,
    pub first_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub middle_name: Option<String>,
    pub position: String,
    pub email: String,
    pub is_teacher: bool,
}

impl TeacherData {
    pub fn new(
        last_name: impl Into<String>,
        first_name: impl Into<String>,
        position: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            last_name: last_name.into(),
            first_name: first_name.into(),
            middle_name: None,
            position: position.into(),
            email: email.into(),
            is_teacher: true,
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        let required = [&self.last_name, &self.first_name, &self.position, &self.email];
        if required.iter().any(|value| value.trim().is_empty()) {
            return Err(ApiError::InvalidRequest(
                "teacher last name, first name, position and email are required".to_string(),
            ));
        }
        Ok(())
    }
}

// Requests

#[derive(Debug, Clone, Default)]
pub struct ListTeachers;

impl Endpoint for ListTeachers {
    type Data = ();
    type Response = Vec<Teacher>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/teachers".into()
    }
}

#[derive(Debug, Clone)]
pub struct CreateTeacher {
    teacher: TeacherData,
}

impl CreateTeacher {
    pub fn new(teacher: TeacherData) -> Self {
        Self { teacher }
    }

    setters!(teacher { is_teacher: bool } optional { middle_name: String });
}

impl Endpoint for CreateTeacher {
    type Data = TeacherData;
    type Response = Teacher;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/teachers".into()
    }

    fn data(&self) -> RequestData<&TeacherData> {
        RequestData::Json(&self.teacher)
    }

    fn validate(&self) -> Result<(), ApiError> {
        self.teacher.validate()
    }
}

#[derive(Debug, Clone)]
pub struct UpdateTeacher {
    id: ObjectId,
    teacher: TeacherData,
}

impl UpdateTeacher {
    pub fn new(id: impl Into<ObjectId>, teacher: TeacherData) -> Self {
        Self {
            id: id.into(),
            teacher,
        }
    }
}

impl Endpoint for UpdateTeacher {
    type Data = TeacherData;
    type Response = Teacher;
    const METHOD: Method = Method::PUT;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/teachers/{}", self.id).into()
    }

    fn data(&self) -> RequestData<&TeacherData> {
        RequestData::Json(&self.teacher)
    }

    fn validate(&self) -> Result<(), ApiError> {
        require_id(&self.id, "teacher")?;
        self.teacher.validate()
    }
}

#[derive(Debug, Clone)]
pub struct DeleteTeacher {
    id: ObjectId,
}

impl DeleteTeacher {
    pub fn new(id: impl Into<ObjectId>) -> Self {
        Self { id: id.into() }
    }
}

impl Endpoint for DeleteTeacher {
    type Data = ();
    type Response = Empty;
    const METHOD: Method = Method::DELETE;

    fn endpoint(&self) -> Cow<'_, str> {
        format!("/teachers/{}", self.id).into()
    }

    fn validate(&self) -> Result<(), ApiError> {
        require_id(&self.id, "teacher")
    }
}
