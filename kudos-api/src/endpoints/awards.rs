use super::{require_id, Named, ObjectId, Reference};
use crate::request::{Attachment, Endpoint, Method, MultipartForm, RequestData};
use crate::ApiError;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Upload types accepted for award scans.
pub const ALLOWED_FILE_TYPES: [&str; 3] = ["image/jpeg", "image/png", "application/pdf"];

/// Degrees that make sense for each award type, keyed by lowercase type name.
const DEGREES_BY_TYPE: [(&str, &[&str]); 4] = [
    ("грамота", &["1 место", "2 место", "3 место", "участник"]),
    ("сертификат", &["участник", "победитель"]),
    ("диплом", &["1 степень", "2 степень", "3 степень", "победитель"]),
    ("благодарственное письмо", &["участник"]),
];

// Common

pub type AwardType = Named;
pub type AwardDegree = Named;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Award {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    #[serde(rename = "studentId")]
    pub student_id: Option<Reference>,
    #[serde(rename = "eventName")]
    pub event_name: Option<String>,
    #[serde(rename = "awardType")]
    pub award_type: Option<Reference>,
    #[serde(rename = "awardDegree")]
    pub award_degree: Option<Reference>,
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
}

/// Degree names allowed for an award type, or `None` for an unknown type.
pub fn allowed_degrees(type_name: &str) -> Option<&'static [&'static str]> {
    let type_name = type_name.trim().to_lowercase();
    DEGREES_BY_TYPE
        .iter()
        .find(|(name, _)| *name == type_name)
        .map(|(_, degrees)| *degrees)
}

/// Narrow the degree list to the selected award type.
///
/// Without a selected type every degree is offered; an unknown type offers none.
pub fn filter_degrees<'a>(
    award_type: Option<&AwardType>,
    degrees: &'a [AwardDegree],
) -> Vec<&'a AwardDegree> {
    let Some(award_type) = award_type else {
        return degrees.iter().collect();
    };
    let allowed = allowed_degrees(&award_type.name).unwrap_or_default();
    degrees
        .iter()
        .filter(|degree| allowed.contains(&degree.name.as_str()))
        .collect()
}

#[derive(Debug, Clone)]
pub struct NewAward {
    pub student_id: ObjectId,
    pub department_id: ObjectId,
    pub group_id: ObjectId,
    pub event_name: String,
    pub award_type: ObjectId,
    pub award_degree: ObjectId,
    pub teacher_id: ObjectId,
    pub file: Attachment,
}

impl NewAward {
    fn validate(&self) -> Result<(), ApiError> {
        require_id(&self.student_id, "student")?;
        require_id(&self.department_id, "department")?;
        require_id(&self.group_id, "group")?;
        if self.event_name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("event name is required".to_string()));
        }
        require_id(&self.award_type, "award type")?;
        require_id(&self.award_degree, "award degree")?;
        require_id(&self.teacher_id, "teacher")?;
        if !ALLOWED_FILE_TYPES.contains(&self.file.content_type.as_str()) {
            return Err(ApiError::InvalidRequest(format!(
                "award file must be JPEG, PNG or PDF, got {}",
                self.file.content_type
            )));
        }
        Ok(())
    }

    fn to_multipart(&self) -> MultipartForm {
        MultipartForm::new()
            .text("studentId", self.student_id.as_str())
            .text("departmentId", self.department_id.as_str())
            .text("groupId", self.group_id.as_str())
            .text("eventName", self.event_name.trim())
            .text("awardType", self.award_type.as_str())
            .text("awardDegree", self.award_degree.as_str())
            .file("filePath", self.file.clone())
            .text("teacherId", self.teacher_id.as_str())
    }
}

// Requests

#[derive(Debug, Clone, Default)]
pub struct ListAwardTypes;

impl Endpoint for ListAwardTypes {
    type Data = ();
    type Response = Vec<AwardType>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/awards/types".into()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListAwardDegrees;

impl Endpoint for ListAwardDegrees {
    type Data = ();
    type Response = Vec<AwardDegree>;

    fn endpoint(&self) -> Cow<'_, str> {
        "/awards/degrees".into()
    }
}

#[derive(Debug, Clone)]
pub struct CreateAward {
    award: NewAward,
}

impl CreateAward {
    pub fn new(award: NewAward) -> Self {
        Self { award }
    }
}

impl Endpoint for CreateAward {
    type Data = ();
    type Response = Award;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        "/awards".into()
    }

    fn data(&self) -> RequestData<&()> {
        RequestData::Multipart(self.award.to_multipart())
    }

    fn validate(&self) -> Result<(), ApiError> {
        self.award.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::{ApiRequest, FieldValue, RequestBody};

    fn named(id: &str, name: &str) -> Named {
        Named {
            id: ObjectId::new(id),
            name: name.to_string(),
        }
    }

    fn award(file: Attachment) -> NewAward {
        NewAward {
            student_id: "s1".into(),
            department_id: "d1".into(),
            group_id: "g1".into(),
            event_name: " Хакатон ".to_string(),
            award_type: "at1".into(),
            award_degree: "ad1".into(),
            teacher_id: "t1".into(),
            file,
        }
    }

    #[test]
    fn test_allowed_degrees_is_case_insensitive() {
        assert_eq!(
            allowed_degrees("Сертификат"),
            Some(&["участник", "победитель"][..])
        );
        assert_eq!(allowed_degrees("медаль"), None);
    }

    #[test]
    fn test_filter_degrees() {
        let degrees = vec![
            named("1", "1 место"),
            named("2", "победитель"),
            named("3", "участник"),
            named("4", "1 степень"),
        ];

        let all = filter_degrees(None, &degrees);
        assert_eq!(all.len(), 4);

        let letter = named("t", "Благодарственное письмо");
        let names: Vec<_> = filter_degrees(Some(&letter), &degrees)
            .into_iter()
            .map(|degree| degree.name.as_str())
            .collect();
        assert_eq!(names, vec!["участник"]);

        let diploma = named("t", "диплом");
        let names: Vec<_> = filter_degrees(Some(&diploma), &degrees)
            .into_iter()
            .map(|degree| degree.name.as_str())
            .collect();
        assert_eq!(names, vec!["победитель", "1 степень"]);

        assert!(filter_degrees(Some(&named("t", "медаль")), &degrees).is_empty());
    }

    #[test]
    fn test_award_multipart_fields() {
        let request = ApiRequest::from_endpoint(&CreateAward::new(award(Attachment::new(
            "scan.pdf",
            "application/pdf",
            vec![0x25, 0x50, 0x44, 0x46],
        ))))
        .unwrap();

        let RequestBody::Multipart(form) = &request.body else {
            panic!("expected multipart body");
        };
        let names: Vec<_> = form.fields().iter().map(|field| field.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "studentId",
                "departmentId",
                "groupId",
                "eventName",
                "awardType",
                "awardDegree",
                "filePath",
                "teacherId"
            ]
        );
        assert_eq!(form.get_text("eventName"), Some("Хакатон"));
        assert!(matches!(
            form.fields()[6].value,
            FieldValue::File(ref file) if file.file_name == "scan.pdf"
        ));
    }

    #[test]
    fn test_award_rejects_other_file_types() {
        let err = ApiRequest::from_endpoint(&CreateAward::new(award(Attachment::new(
            "scan.docx",
            "application/octet-stream",
            vec![1],
        ))))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid request: award file must be JPEG, PNG or PDF, got application/octet-stream"
        );
    }

    #[test]
    fn test_award_requires_teacher() {
        let mut missing = award(Attachment::new("a.png", "image/png", vec![1]));
        missing.teacher_id = ObjectId::default();
        let err = ApiRequest::from_endpoint(&CreateAward::new(missing)).unwrap_err();
        assert_eq!(err.to_string(), "Invalid request: teacher id is not set");
    }
}
