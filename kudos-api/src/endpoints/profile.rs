use super::{full_name, ObjectId, Reference};
use crate::macros::setters;
use crate::request::{Attachment, Endpoint, Method, MultipartForm, RequestData};
use crate::ApiError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

const PROFILE_PATH: &str = "/students/profile";
const AVATAR_PATH: &str = "/students/profile/avatar";

// Common

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: Option<ObjectId>,
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub birth_date: Option<String>,
    pub department_id: Option<Reference>,
    pub group_id: Option<Reference>,
    pub login: Option<String>,
    pub email: Option<String>,
    pub admission_year: Option<u16>,
    #[serde(rename = "avatarUrl", alias = "avatar")]
    pub avatar_url: Option<String>,
    pub points: Option<u32>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        full_name(&self.last_name, &self.first_name, self.middle_name.as_deref())
    }

    /// Absolute avatar URL. Relative paths are served from the backend origin.
    pub fn avatar_url(&self, base_url: &str) -> Option<String> {
        let avatar = self.avatar_url.as_deref()?.trim();
        if avatar.is_empty() {
            return None;
        }
        if avatar.starts_with("http://") || avatar.starts_with("https://") {
            return Some(avatar.to_string());
        }

        let origin = base_url
            .trim_end_matches('/')
            .trim_end_matches("/api")
            .trim_end_matches('/');
        Some(format!("{}/{}", origin, avatar.trim_start_matches('/')))
    }
}

/// Profile fields as submitted by the settings form.
#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub birth_date: String,
    pub department_id: ObjectId,
    pub group_id: ObjectId,
    pub login: String,
    pub email: String,
    pub admission_year: u16,
    pub password: Option<PasswordChange>,
    pub avatar: Option<Attachment>,
}

#[derive(Debug, Clone)]
pub struct PasswordChange {
    pub old_password: SecretString,
    pub new_password: SecretString,
    pub confirm_password: SecretString,
}

impl PasswordChange {
    pub fn new(old: SecretString, new: SecretString, confirm: SecretString) -> Self {
        Self {
            old_password: old,
            new_password: new,
            confirm_password: confirm,
        }
    }

    fn validate(&self) -> Result<(), ApiError> {
        if self.new_password.expose_secret().is_empty() {
            return Err(ApiError::InvalidRequest("new password is empty".to_string()));
        }
        if self.new_password.expose_secret() != self.confirm_password.expose_secret() {
            return Err(ApiError::InvalidRequest(
                "new password and confirmation do not match".to_string(),
            ));
        }
        Ok(())
    }
}

impl ProfileForm {
    fn validate(&self) -> Result<(), ApiError> {
        let required = [
            ("last name", self.last_name.as_str()),
            ("first name", self.first_name.as_str()),
            ("birth date", self.birth_date.as_str()),
            ("department", self.department_id.as_str()),
            ("group", self.group_id.as_str()),
            ("login", self.login.as_str()),
            ("email", self.email.as_str()),
        ];
        if let Some((label, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ApiError::InvalidRequest(format!("{label} is required")));
        }
        if let Some(password) = &self.password {
            password.validate()?;
        }
        if let Some(avatar) = &self.avatar {
            validate_avatar(avatar)?;
        }
        Ok(())
    }

    fn to_multipart(&self) -> MultipartForm {
        let mut form = MultipartForm::new()
            .text("last_name", self.last_name.as_str())
            .text("first_name", self.first_name.as_str())
            .text("middle_name", self.middle_name.as_deref().unwrap_or_default())
            .text("birth_date", self.birth_date.as_str())
            .text("department_id", self.department_id.as_str())
            .text("group_id", self.group_id.as_str())
            .text("login", self.login.as_str())
            .text("email", self.email.as_str())
            .text("admission_year", self.admission_year.to_string());

        if let Some(password) = &self.password {
            form = form
                .text("oldPassword", password.old_password.expose_secret())
                .text("newPassword", password.new_password.expose_secret());
        }
        if let Some(avatar) = &self.avatar {
            form = form.file("avatar", avatar.clone());
        }
        form
    }
}

impl From<&Profile> for ProfileForm {
    fn from(profile: &Profile) -> Self {
        Self {
            last_name: profile.last_name.clone(),
            first_name: profile.first_name.clone(),
            middle_name: profile.middle_name.clone(),
            birth_date: profile.birth_date.clone().unwrap_or_default(),
            department_id: profile
                .department_id
                .as_ref()
                .map(|reference| reference.id().clone())
                .unwrap_or_default(),
            group_id: profile
                .group_id
                .as_ref()
                .map(|reference| reference.id().clone())
                .unwrap_or_default(),
            login: profile.login.clone().unwrap_or_default(),
            email: profile.email.clone().unwrap_or_default(),
            admission_year: profile.admission_year.unwrap_or_default(),
            password: None,
            avatar: None,
        }
    }
}

fn validate_avatar(avatar: &Attachment) -> Result<(), ApiError> {
    if !avatar.content_type.starts_with("image/") {
        return Err(ApiError::InvalidRequest(format!(
            "avatar must be an image, got {}",
            avatar.content_type
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AvatarUpdate {
    #[serde(rename = "avatarUrl", alias = "avatar", default)]
    pub avatar_url: Option<String>,
}

// Requests

#[derive(Debug, Clone, Default)]
pub struct GetProfile;

impl Endpoint for GetProfile {
    type Data = ();
    /// `None` with `is_new_user` set on the envelope for first-time students.
    type Response = Option<Profile>;

    fn endpoint(&self) -> Cow<'_, str> {
        PROFILE_PATH.into()
    }
}

/// First-time profile submission.
#[derive(Debug, Clone)]
pub struct CreateProfile {
    form: ProfileForm,
    multipart: MultipartForm,
}

impl CreateProfile {
    pub fn new(form: ProfileForm) -> Self {
        let multipart = form.to_multipart();
        Self { form, multipart }
    }
}

impl Endpoint for CreateProfile {
    type Data = ();
    type Response = Option<Profile>;
    const METHOD: Method = Method::POST;

    fn endpoint(&self) -> Cow<'_, str> {
        PROFILE_PATH.into()
    }

    fn data(&self) -> RequestData<&()> {
        RequestData::Multipart(self.multipart.clone())
    }

    fn validate(&self) -> Result<(), ApiError> {
        self.form.validate()
    }
}

#[derive(Debug, Clone)]
pub struct UpdateProfile {
    form: ProfileForm,
    multipart: MultipartForm,
}

impl UpdateProfile {
    pub fn new(form: ProfileForm) -> Self {
        let multipart = form.to_multipart();
        Self { form, multipart }
    }
}

impl Endpoint for UpdateProfile {
    type Data = ();
    type Response = Option<Profile>;
    const METHOD: Method = Method::PUT;

    fn endpoint(&self) -> Cow<'_, str> {
        PROFILE_PATH.into()
    }

    fn data(&self) -> RequestData<&()> {
        RequestData::Multipart(self.multipart.clone())
    }

    fn validate(&self) -> Result<(), ApiError> {
        self.form.validate()
    }
}

#[derive(Debug, Clone)]
pub enum AvatarChange {
    Upload(Attachment),
    Remove,
}

#[derive(Debug, Clone)]
pub struct UpdateAvatar {
    change: AvatarChange,
}

impl UpdateAvatar {
    pub fn upload(avatar: Attachment) -> Self {
        Self {
            change: AvatarChange::Upload(avatar),
        }
    }

    pub fn remove() -> Self {
        Self {
            change: AvatarChange::Remove,
        }
    }
}

impl Endpoint for UpdateAvatar {
    type Data = ();
    type Response = AvatarUpdate;
    const METHOD: Method = Method::PATCH;

    fn endpoint(&self) -> Cow<'_, str> {
        AVATAR_PATH.into()
    }

    fn data(&self) -> RequestData<&()> {
        let form = match &self.change {
            AvatarChange::Upload(avatar) => MultipartForm::new().file("avatar", avatar.clone()),
            AvatarChange::Remove => MultipartForm::new().text("removeAvatar", "true"),
        };
        RequestData::Multipart(form)
    }

    fn validate(&self) -> Result<(), ApiError> {
        match &self.change {
            AvatarChange::Upload(avatar) => validate_avatar(avatar),
            AvatarChange::Remove => Ok(()),
        }
    }
}

/// Builder over [`ProfileForm`] for callers that edit a few fields.
#[derive(Debug, Clone, Default)]
pub struct ProfileFormBuilder {
    form: ProfileForm,
}

impl ProfileFormBuilder {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            form: ProfileForm::from(profile),
        }
    }

    setters!(form {
        last_name: String,
        first_name: String,
        birth_date: String,
        department_id: ObjectId,
        group_id: ObjectId,
        login: String,
        email: String,
        admission_year: u16,
    } optional {
        middle_name: String,
        password: PasswordChange,
        avatar: Attachment,
    });

    pub fn build(self) -> ProfileForm {
        self.form
    }
}
