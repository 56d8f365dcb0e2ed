use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use time::OffsetDateTime;
use tracing::error;

use crate::state::AppState;
use crate::users::dto::{CreateUserForm, EditUserForm, UploadedImage};
use crate::users::images;
use crate::users::repo::{self, NewUser, ProfileUpdate, Role, User};

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

fn role_tokens(roles: &[Role]) -> Vec<String> {
    roles.iter().map(|r| r.as_str().to_string()).collect()
}

/// Stores a validated upload under a fresh generated name and returns that
/// name. Callers must have run the image through `validate_image` first.
pub async fn store_image(state: &AppState, upload: UploadedImage) -> anyhow::Result<String> {
    let filename = images::generate_filename(&upload.content_type);
    state.images.save(&filename, upload.body).await?;
    Ok(filename)
}

/// The rules an admin-created account always gets, whatever was submitted:
/// enabled, confirmation token nulled (no email round-trip), and `last_login`
/// stamped at creation time.
fn new_account(
    form: CreateUserForm,
    password_hash: String,
    image: Option<String>,
    now: OffsetDateTime,
) -> NewUser {
    NewUser {
        first_name: form.first_name,
        last_name: form.last_name,
        dob: form.dob,
        email: form.email,
        username: form.username,
        password_hash,
        image,
        roles: role_tokens(&form.roles),
        enabled: true,
        confirmation_token: None,
        last_login: Some(now),
    }
}

/// Create flow, past validation: hash the password, store the image if one
/// was uploaded, then insert the account with the `new_account` rules.
pub async fn create_user(
    state: &AppState,
    form: CreateUserForm,
    image: Option<UploadedImage>,
) -> anyhow::Result<User> {
    let stored_image = match image {
        Some(upload) => Some(store_image(state, upload).await?),
        None => None,
    };

    let password_hash = hash_password(&form.plain_password)?;
    let new = new_account(form, password_hash, stored_image, OffsetDateTime::now_utc());

    repo::insert(&state.db, &new).await
}

/// Edit flow, past validation. A new upload replaces the stored filename (the
/// previous file stays on disk; see DESIGN.md); without one, the previous
/// filename is explicitly retained so the update never nulls the field.
/// Password, enabled flag and confirmation token are untouched.
pub async fn update_user_profile(
    state: &AppState,
    user: &User,
    form: EditUserForm,
    new_image: Option<UploadedImage>,
) -> anyhow::Result<()> {
    let image = match new_image {
        Some(upload) => Some(store_image(state, upload).await?),
        None => user.image.clone(),
    };

    let update = ProfileUpdate {
        first_name: form.first_name,
        last_name: form.last_name,
        dob: form.dob,
        email: form.email,
        username: form.username,
        image,
        roles: role_tokens(&form.roles),
    };

    repo::update_profile(&state.db, user.id, &update).await
}

/// Self-delete guard: an administrator can never soft-delete their own
/// account.
pub fn may_delete(acting_admin_id: i64, target_id: i64) -> bool {
    acting_admin_id != target_id
}
