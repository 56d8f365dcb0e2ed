use bytes::Bytes;
use serde::Serialize;
use time::Date;
use validator::Validate;

use crate::flash::FlashEntry;
use crate::users::repo::{Role, User};

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Bound fields of the create form. Roles are already restricted to the
/// fixed enumeration by the binder.
#[derive(Debug, Validate)]
pub struct CreateUserForm {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub last_name: String,
    pub dob: Date,
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 60, message = "must be 3-60 characters"))]
    pub username: String,
    #[validate(length(min = 8, max = 128, message = "must be 8-128 characters"))]
    pub plain_password: String,
    pub roles: Vec<Role>,
}

/// Bound fields of the edit (profile) form. Distinct from the create form:
/// there is no password field.
#[derive(Debug, Validate)]
pub struct EditUserForm {
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "must be 1-100 characters"))]
    pub last_name: String,
    pub dob: Date,
    #[validate(email(message = "is not a valid email address"))]
    pub email: String,
    #[validate(length(min = 3, max = 60, message = "must be 3-60 characters"))]
    pub username: String,
    pub roles: Vec<Role>,
}

/// An uploaded file part, held in memory while it awaits validation. Never
/// persisted as-is; the store only ever receives it under a generated name.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub original_filename: String,
    pub content_type: String,
    pub body: Bytes,
}

#[derive(Debug, Serialize)]
pub struct UserView {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    #[serde(with = "iso_date")]
    pub dob: Date,
    pub email: String,
    pub username: String,
    pub image: Option<String>,
    pub roles: Vec<String>,
    pub enabled: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_login: Option<time::OffsetDateTime>,
}

impl From<User> for UserView {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            first_name: u.first_name,
            last_name: u.last_name,
            dob: u.dob,
            email: u.email,
            username: u.username,
            image: u.image,
            roles: u.roles,
            enabled: u.enabled,
            last_login: u.last_login,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub users: Vec<UserView>,
    pub flashes: Vec<FlashEntry>,
}

/// Confirm control for the delete route, rendered on show/edit responses.
#[derive(Debug, Serialize)]
pub struct DeleteForm {
    pub action: String,
    pub method: &'static str,
}

impl DeleteForm {
    pub fn for_user(id: i64) -> Self {
        Self {
            action: format!("/admin/user/delete/{id}"),
            method: "DELETE",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ShowResponse {
    pub user: UserView,
    pub delete_form: DeleteForm,
    pub flashes: Vec<FlashEntry>,
}

/// Scaffold for the empty create form.
#[derive(Debug, Serialize)]
pub struct NewFormResponse {
    pub role_choices: Vec<&'static str>,
    pub flashes: Vec<FlashEntry>,
}

/// Scaffold for the edit form, pre-filled with the current entity.
#[derive(Debug, Serialize)]
pub struct EditFormResponse {
    pub user: UserView,
    pub current_image: Option<String>,
    pub role_choices: Vec<&'static str>,
    pub delete_form: DeleteForm,
    pub flashes: Vec<FlashEntry>,
}
