use crate::endpoints::{
    ObjectId,
    auth::{Login, Logout, NewAccount, RefreshToken, Register},
    awards::{CreateAward, ListAwardDegrees, ListAwardTypes, NewAward},
    departments::{ListDepartments, ListGroups},
    events::{
        CreateEvent, DeleteEvent, EventData, EventLookup, ListEventChoices, ListEvents,
        UpdateEvent,
    },
    profile::{CreateProfile, GetProfile, ProfileForm, UpdateAvatar, UpdateProfile},
    students::{CreateStudent, DeleteStudent, ListStudents, StudentData, UpdateStudent},
    teachers::{CreateTeacher, DeleteTeacher, ListTeachers, TeacherData, UpdateTeacher},
};
use crate::request::Attachment;
use secrecy::SecretString;

pub struct AuthRepository;

impl AuthRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn login(&self, login: impl Into<String>, password: SecretString) -> Login {
        Login::new(login, password)
    }

    pub fn register(&self, account: NewAccount) -> Register {
        Register::new(account)
    }

    pub fn refresh(&self) -> RefreshToken {
        RefreshToken::new()
    }

    pub fn logout(&self) -> Logout {
        Logout::new()
    }
}

pub struct StudentRepository;

impl StudentRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn list(&self) -> ListStudents {
        ListStudents
    }

    pub fn create(
        &self,
        last_name: impl Into<String>,
        first_name: impl Into<String>,
        email: impl Into<String>,
    ) -> CreateStudent {
        CreateStudent::new(last_name, first_name, email)
    }

    pub fn update(&self, id: impl Into<ObjectId>, student: StudentData) -> UpdateStudent {
        UpdateStudent::new(id, student)
    }

    pub fn delete(&self, id: impl Into<ObjectId>) -> DeleteStudent {
        DeleteStudent::new(id)
    }
}

pub struct TeacherRepository;

impl TeacherRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn list(&self) -> ListTeachers {
        ListTeachers
    }

    pub fn create(&self, teacher: TeacherData) -> CreateTeacher {
        CreateTeacher::new(teacher)
    }

    pub fn update(&self, id: impl Into<ObjectId>, teacher: TeacherData) -> UpdateTeacher {
        UpdateTeacher::new(id, teacher)
    }

    pub fn delete(&self, id: impl Into<ObjectId>) -> DeleteTeacher {
        DeleteTeacher::new(id)
    }
}

pub struct EventRepository;

impl EventRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn list(&self) -> ListEvents {
        ListEvents
    }

    pub fn create(&self, title: impl Into<String>, date_time: impl Into<String>) -> CreateEvent {
        CreateEvent::new(title, date_time)
    }

    pub fn update(&self, id: impl Into<ObjectId>, event: EventData) -> UpdateEvent {
        UpdateEvent::new(id, event)
    }

    pub fn delete(&self, id: impl Into<ObjectId>) -> DeleteEvent {
        DeleteEvent::new(id)
    }

    pub fn students(&self) -> ListEventChoices {
        ListEventChoices::new(EventLookup::Students)
    }

    pub fn teachers(&self) -> ListEventChoices {
        ListEventChoices::new(EventLookup::Teachers)
    }

    pub fn levels(&self) -> ListEventChoices {
        ListEventChoices::new(EventLookup::Levels)
    }
}

pub struct DepartmentRepository;

impl DepartmentRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn list(&self) -> ListDepartments {
        ListDepartments
    }

    pub fn groups(&self, department_id: impl Into<ObjectId>) -> ListGroups {
        ListGroups::new(department_id)
    }
}

pub struct ProfileRepository;

impl ProfileRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn get(&self) -> GetProfile {
        GetProfile
    }

    pub fn create(&self, form: ProfileForm) -> CreateProfile {
        CreateProfile::new(form)
    }

    pub fn update(&self, form: ProfileForm) -> UpdateProfile {
        UpdateProfile::new(form)
    }

    pub fn upload_avatar(&self, avatar: Attachment) -> UpdateAvatar {
        UpdateAvatar::upload(avatar)
    }

    pub fn remove_avatar(&self) -> UpdateAvatar {
        UpdateAvatar::remove()
    }
}

pub struct AwardRepository;

impl AwardRepository {
    pub fn new() -> Self {
        Self {}
    }

    pub fn types(&self) -> ListAwardTypes {
        ListAwardTypes
    }

    pub fn degrees(&self) -> ListAwardDegrees {
        ListAwardDegrees
    }

    pub fn create(&self, award: NewAward) -> CreateAward {
        CreateAward::new(award)
    }
}
