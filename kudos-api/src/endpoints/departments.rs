use super::{Named, ObjectId, Reference};
use crate::request::{Endpoint, RequestData};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub type Department = Named;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    #[serde(default)]
    pub department_id: Option<Reference>,
}

// Requests

#[derive(Debug, Clone, Default)]
pub struct ListDepartments;

impl Endpoint for ListDepartments {
    type Data = ();
    type Response = Vec<Department>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/departments".into()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListGroups {
    department_id: ObjectId,
}

impl ListGroups {
    pub fn new(department_id: impl Into<ObjectId>) -> Self {
        Self {
            department_id: department_id.into(),
        }
    }

    pub fn department_id(&self) -> &ObjectId {
        &self.department_id
    }
}

impl Endpoint for ListGroups {
    type Data = Self;
    type Response = Vec<Group>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/groups".into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Query(self)
    }
}
