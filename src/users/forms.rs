use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use time::{macros::format_description, Date};
use validator::Validate;

use crate::error::{AppError, FieldError};
use crate::users::dto::{CreateUserForm, EditUserForm, UploadedImage};
use crate::users::repo::Role;

pub const IMAGE_FIELD: &str = "image";

/// Raw multipart submission: repeated text fields plus an optional image part.
#[derive(Debug, Default)]
pub struct ParsedForm {
    fields: HashMap<String, Vec<String>>,
    pub image: Option<UploadedImage>,
}

impl ParsedForm {
    pub fn push_field(&mut self, name: &str, value: String) {
        self.fields.entry(name.to_string()).or_default().push(value);
    }

    fn first(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    fn all(&self, name: &str) -> &[String] {
        self.fields.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// A body the client got wrong (truncated stream, missing boundary, a part
/// over the size limit) is their validation problem, not an infrastructure
/// failure.
fn invalid_multipart(field: &str, e: MultipartError) -> AppError {
    AppError::Validation(vec![FieldError::new(
        field,
        format!("invalid multipart payload: {e}"),
    )])
}

/// Drains the whole multipart body. A file part without a filename or with an
/// empty body counts as "no image uploaded".
pub async fn read_multipart(mut mp: Multipart) -> Result<ParsedForm, AppError> {
    let mut parsed = ParsedForm::default();
    while let Some(field) = mp
        .next_field()
        .await
        .map_err(|e| invalid_multipart("body", e))?
    {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        if name == IMAGE_FIELD || name == "image[]" {
            let original_filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .map(|s| s.to_string())
                .unwrap_or_else(|| "application/octet-stream".into());
            let body = field
                .bytes()
                .await
                .map_err(|e| invalid_multipart(IMAGE_FIELD, e))?;
            if original_filename.is_empty() && body.is_empty() {
                continue;
            }
            parsed.image = Some(UploadedImage {
                original_filename,
                content_type,
                body,
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| invalid_multipart(&name, e))?;
            parsed.push_field(&name, value);
        }
    }
    Ok(parsed)
}

fn required<'a>(
    form: &'a ParsedForm,
    name: &str,
    errors: &mut Vec<FieldError>,
) -> Option<&'a str> {
    match form.first(name) {
        Some(v) if !v.trim().is_empty() => Some(v),
        _ => {
            errors.push(FieldError::new(name, "is required"));
            None
        }
    }
}

fn parse_dob(form: &ParsedForm, errors: &mut Vec<FieldError>) -> Option<Date> {
    let raw = required(form, "dob", errors)?;
    let fmt = format_description!("[year]-[month]-[day]");
    match Date::parse(raw, &fmt) {
        Ok(d) => Some(d),
        Err(_) => {
            errors.push(FieldError::new("dob", "must be a date in YYYY-MM-DD form"));
            None
        }
    }
}

/// Roles are restricted to the fixed enumeration; anything else is a
/// violation, reported per offending token.
fn parse_roles(form: &ParsedForm, errors: &mut Vec<FieldError>) -> Vec<Role> {
    let mut roles = Vec::new();
    for token in form.all("roles") {
        match Role::parse(token) {
            Some(role) => {
                if !roles.contains(&role) {
                    roles.push(role);
                }
            }
            None => errors.push(FieldError::new("roles", format!("unknown role {token:?}"))),
        }
    }
    roles
}

fn constraint_errors<T: Validate>(dto: &T) -> Vec<FieldError> {
    let Err(violations) = dto.validate() else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut fields: Vec<_> = violations.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, errs) in fields {
        for e in errs {
            let message = e
                .message
                .as_deref()
                .unwrap_or(e.code.as_ref())
                .to_string();
            out.push(FieldError::new(name.to_string(), message));
        }
    }
    out
}

/// Binds the create submission, aggregating every violation instead of
/// stopping at the first.
pub fn bind_create(form: &ParsedForm) -> Result<CreateUserForm, Vec<FieldError>> {
    let mut errors = Vec::new();

    let first_name = required(form, "first_name", &mut errors);
    let last_name = required(form, "last_name", &mut errors);
    let dob = parse_dob(form, &mut errors);
    let email = required(form, "email", &mut errors);
    let username = required(form, "username", &mut errors);
    let plain_password = required(form, "plain_password", &mut errors);
    let roles = parse_roles(form, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    let dto = CreateUserForm {
        first_name: first_name.unwrap_or_default().to_string(),
        last_name: last_name.unwrap_or_default().to_string(),
        dob: dob.unwrap_or(Date::MIN),
        email: email.unwrap_or_default().to_string(),
        username: username.unwrap_or_default().to_string(),
        plain_password: plain_password.unwrap_or_default().to_string(),
        roles,
    };

    let violations = constraint_errors(&dto);
    if violations.is_empty() {
        Ok(dto)
    } else {
        Err(violations)
    }
}

/// Binds the edit submission. Same shape as create minus the password field.
pub fn bind_edit(form: &ParsedForm) -> Result<EditUserForm, Vec<FieldError>> {
    let mut errors = Vec::new();

    let first_name = required(form, "first_name", &mut errors);
    let last_name = required(form, "last_name", &mut errors);
    let dob = parse_dob(form, &mut errors);
    let email = required(form, "email", &mut errors);
    let username = required(form, "username", &mut errors);
    let roles = parse_roles(form, &mut errors);

    if !errors.is_empty() {
        return Err(errors);
    }

    let dto = EditUserForm {
        first_name: first_name.unwrap_or_default().to_string(),
        last_name: last_name.unwrap_or_default().to_string(),
        dob: dob.unwrap_or(Date::MIN),
        email: email.unwrap_or_default().to_string(),
        username: username.unwrap_or_default().to_string(),
        roles,
    };

    let violations = constraint_errors(&dto);
    if violations.is_empty() {
        Ok(dto)
    } else {
        Err(violations)
    }
}
