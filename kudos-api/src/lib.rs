mod client;
pub mod endpoints;
mod envelope;
mod error;
mod macros;
mod refresh;
pub mod repositories;
mod request;
mod storage;
mod transport;

pub use crate::client::{Client, SessionEvent};
pub use crate::envelope::{Empty, Envelope};
pub use crate::error::{ApiError, ErrorBody, ExpiryReason, FieldError, StorageError, TransportError};
pub use crate::refresh::RefreshState;
pub use crate::request::{
    ApiRequest, Attachment, AuthPolicy, Endpoint, FieldValue, FormField, Method, MultipartForm,
    RequestBody, RequestData,
};
pub use crate::storage::{MemoryTokenStore, TokenStorage};
pub use crate::transport::{HttpTransport, RawResponse, Transport};
pub use reqwest::StatusCode;
use repositories::*;

pub const DEFAULT_BASE_URL: &str = "https://cyber-cats.ru/api";

pub struct Request;

impl Request {
    pub fn auth() -> AuthRepository {
        AuthRepository::new()
    }

    pub fn students() -> StudentRepository {
        StudentRepository::new()
    }

    pub fn teachers() -> TeacherRepository {
        TeacherRepository::new()
    }

    pub fn events() -> EventRepository {
        EventRepository::new()
    }

    pub fn departments() -> DepartmentRepository {
        DepartmentRepository::new()
    }

    pub fn profile() -> ProfileRepository {
        ProfileRepository::new()
    }

    pub fn awards() -> AwardRepository {
        AwardRepository::new()
    }
}
