use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::path::Path;

use crate::ApiError;

pub use reqwest::Method;

/// How a request reacts to a 401.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum AuthPolicy {
    /// Goes through the refresh protocol and is replayed once.
    #[default]
    Refresh,
    /// The session endpoints themselves. A 401 is final.
    Exempt,
}

pub enum RequestData<T> {
    Empty,
    Query(T),
    Json(T),
    Multipart(MultipartForm),
}

/// A typed backend endpoint.
pub trait Endpoint {
    type Data: Serialize;
    type Response: DeserializeOwned;

    const METHOD: Method = Method::GET;
    const AUTH: AuthPolicy = AuthPolicy::Refresh;

    fn endpoint(&self) -> Cow<'_, str>;

    fn data(&self) -> RequestData<&Self::Data> {
        RequestData::Empty
    }

    /// Local checks run before anything is sent.
    fn validate(&self) -> Result<(), ApiError> {
        Ok(())
    }
}

/// An outgoing request, owned so it can be replayed after a refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub auth: AuthPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(MultipartForm),
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            auth: AuthPolicy::default(),
        }
    }

    pub fn from_endpoint<E: Endpoint>(endpoint: &E) -> Result<Self, ApiError> {
        endpoint.validate()?;

        let mut request = Self::new(E::METHOD, endpoint.endpoint().into_owned());
        request.auth = E::AUTH;
        match endpoint.data() {
            RequestData::Empty => {}
            RequestData::Query(data) => request.query = query_pairs(serde_json::to_value(data)?)?,
            RequestData::Json(data) => request.body = RequestBody::Json(serde_json::to_value(data)?),
            RequestData::Multipart(form) => request.body = RequestBody::Multipart(form),
        }
        Ok(request)
    }

    pub fn is_refresh_exempt(&self) -> bool {
        self.auth == AuthPolicy::Exempt
    }
}

fn query_pairs(value: Value) -> Result<Vec<(String, String)>, ApiError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => Ok(map
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Null => None,
                Value::String(text) => Some((key, text)),
                other => Some((key, other.to_string())),
            })
            .collect()),
        other => Err(ApiError::InvalidRequest(format!(
            "query parameters must be an object, got {other}"
        ))),
    }
}

// Multipart

/// A multipart body kept as plain data; the transport builds the wire form on every send.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultipartForm {
    fields: Vec<FormField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    File(Attachment),
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FieldValue::Text(value.into()),
        });
        self
    }

    pub fn opt_text(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.text(name, value),
            None => self,
        }
    }

    pub fn file(mut self, name: impl Into<String>, attachment: Attachment) -> Self {
        self.fields.push(FormField {
            name: name.into(),
            value: FieldValue::File(attachment),
        });
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|field| match &field.value {
            FieldValue::Text(text) if field.name == name => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn get_file(&self, name: &str) -> Option<&Attachment> {
        self.fields.iter().find_map(|field| match &field.value {
            FieldValue::File(attachment) if field.name == name => Some(attachment),
            _ => None,
        })
    }
}

#[derive(Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = content_type_for(path);
        Ok(Self::new(file_name, content_type, bytes))
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("pdf") => "application/pdf",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Filter {
        department_id: Option<String>,
        page: u32,
        active: bool,
    }

    struct ListThings(Filter);

    impl Endpoint for ListThings {
        type Data = Filter;
        type Response = Vec<String>;

        fn endpoint(&self) -> Cow<'_, str> {
            "/things".into()
        }

        fn data(&self) -> RequestData<&Filter> {
            RequestData::Query(&self.0)
        }
    }

    #[test]
    fn test_query_pairs_skip_missing_values() {
        let request = ApiRequest::from_endpoint(&ListThings(Filter {
            department_id: None,
            page: 2,
            active: true,
        }))
        .unwrap();

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/things");
        assert_eq!(request.auth, AuthPolicy::Refresh);
        let mut query = request.query.clone();
        query.sort();
        assert_eq!(
            query,
            vec![
                ("active".to_string(), "true".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_non_object_query_is_rejected() {
        let err = query_pairs(Value::from(vec![1, 2])).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
    }

    #[test]
    fn test_multipart_lookup() {
        let form = MultipartForm::new()
            .text("eventName", "Хакатон")
            .opt_text("middle_name", None::<String>)
            .file("filePath", Attachment::new("a.pdf", "application/pdf", vec![1, 2]));

        assert_eq!(form.fields().len(), 2);
        assert_eq!(form.get_text("eventName"), Some("Хакатон"));
        assert_eq!(form.get_text("middle_name"), None);
        assert_eq!(form.get_file("filePath").map(|f| f.bytes.len()), Some(2));
    }

    #[test]
    fn test_content_type_guess() {
        assert_eq!(content_type_for(Path::new("diploma.PDF")), "application/pdf");
        assert_eq!(content_type_for(Path::new("me.jpeg")), "image/jpeg");
        assert_eq!(content_type_for(Path::new("notes")), "application/octet-stream");
    }
}
