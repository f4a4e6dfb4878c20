use crate::envelope::Empty;
use crate::request::{AuthPolicy, Endpoint, Method, RequestData};
use secrecy::{ExposeSecret, SecretString};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::borrow::Cow;

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const REFRESH_PATH: &str = "/auth/refresh-token";
pub const LOGOUT_PATH: &str = "/auth/logout";

// Common

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
    #[serde(other)]
    Unknown,
}

impl Role {
    pub fn can_manage(&self) -> bool {
        matches!(self, Role::Teacher | Role::Admin)
    }
}

/// `{}`; the refresh and logout calls carry no payload of their own.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct NoBody {}

// Requests

pub struct Login {
    login: String,
    password: SecretString,
}

impl Login {
    pub fn new(login: impl Into<String>, password: SecretString) -> Self {
        Self {
            login: login.into(),
            password,
        }
    }
}

impl Serialize for Login {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Login", 2)?;
        state.serialize_field("login", &self.login)?;
        state.serialize_field("password", self.password.expose_secret())?;
        state.end()
    }
}

impl Endpoint for Login {
    type Data = Self;
    type Response = LoginResponse;
    const METHOD: Method = Method::POST;
    const AUTH: AuthPolicy = AuthPolicy::Exempt;

    fn endpoint(&self) -> Cow<'_, str> {
        LOGIN_PATH.into()
    }

    fn data(&self) -> RequestData<&Self> {
        RequestData::Json(self)
    }
}

pub struct Register {
    account: NewAccount,
}

pub struct NewAccount {
    pub login: String,
    pub email: String,
    pub password: SecretString,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl NewAccount {
    pub fn new(login: impl Into<String>, email: impl Into<String>, password: SecretString) -> Self {
        Self {
            login: login.into(),
            email: email.into(),
            password,
            first_name: None,
            last_name: None,
        }
    }
}

impl Serialize for NewAccount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("NewAccount", 5)?;
        state.serialize_field("login", &self.login)?;
        state.serialize_field("email", &self.email)?;
        state.serialize_field("password", self.password.expose_secret())?;
        if let Some(first_name) = &self.first_name {
            state.serialize_field("first_name", first_name)?;
        } else {
            state.skip_field("first_name")?;
        }
        if let Some(last_name) = &self.last_name {
            state.serialize_field("last_name", last_name)?;
        } else {
            state.skip_field("last_name")?;
        }
        state.end()
    }
}

impl Register {
    pub fn new(account: NewAccount) -> Self {
        Self { account }
    }
}

impl Endpoint for Register {
    type Data = NewAccount;
    type Response = RegisterResponse;
    const METHOD: Method = Method::POST;
    const AUTH: AuthPolicy = AuthPolicy::Exempt;

    fn endpoint(&self) -> Cow<'_, str> {
        REGISTER_PATH.into()
    }

    fn data(&self) -> RequestData<&NewAccount> {
        RequestData::Json(&self.account)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RefreshToken {
    body: NoBody,
}

impl RefreshToken {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Endpoint for RefreshToken {
    type Data = NoBody;
    type Response = RefreshResponse;
    const METHOD: Method = Method::POST;
    const AUTH: AuthPolicy = AuthPolicy::Exempt;

    fn endpoint(&self) -> Cow<'_, str> {
        REFRESH_PATH.into()
    }

    fn data(&self) -> RequestData<&NoBody> {
        RequestData::Json(&self.body)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Logout {
    body: NoBody,
}

impl Logout {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Endpoint for Logout {
    type Data = NoBody;
    type Response = Empty;
    const METHOD: Method = Method::POST;
    const AUTH: AuthPolicy = AuthPolicy::Exempt;

    fn endpoint(&self) -> Cow<'_, str> {
        LOGOUT_PATH.into()
    }

    fn data(&self) -> RequestData<&NoBody> {
        RequestData::Json(&self.body)
    }
}

// Responses

#[derive(Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginResponse")
            .field("access_token", &"[REDACTED]")
            .field("role", &self.role)
            .field("message", &self.message)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub message: Option<String>,
}

impl std::fmt::Debug for RegisterResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterResponse")
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("role", &self.role)
            .field("message", &self.message)
            .finish()
    }
}

#[derive(Clone, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(rename = "accessToken", default)]
    pub access_token: Option<String>,
}
