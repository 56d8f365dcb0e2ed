use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::auth::AdminUser;
use crate::error::{AppError, FieldError};
use crate::flash::{self, Flash, FlashLevel, IncomingFlashes};
use crate::i18n::locale_from_headers;
use crate::state::AppState;
use crate::users::dto::{
    DeleteForm, EditFormResponse, ListResponse, NewFormResponse, ShowResponse, UserView,
};
use crate::users::repo::{self, Role};
use crate::users::{forms, images, service};

pub const LIST_ROUTE: &str = "/admin/user/";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/new", get(new_user_form).post(create_user))
        .route("/:id", get(show_user))
        .route("/edit/:id", get(edit_user_form).post(update_user))
        .route("/delete/:id", post(delete_user).delete(delete_user))
        .layer(DefaultBodyLimit::max(4 * 1024 * 1024))
}

/// One audit-log line plus one flash entry of the same severity. The numeric
/// code only prefixes the log message; the original service passed 200 even
/// on the danger path and that is kept as-is.
fn log_and_flash(
    flash: &mut Flash,
    code: u16,
    level: FlashLevel,
    log_msg: &str,
    flash_msg: String,
    locale: &str,
) {
    match level {
        FlashLevel::Success => info!(%locale, "{code} {log_msg}"),
        FlashLevel::Warning => warn!(%locale, "{code} {log_msg}"),
        FlashLevel::Danger => error!(%locale, "{code} {log_msg}"),
    }
    flash.push(level, flash_msg);
}

#[instrument(skip(state, flashes))]
async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    IncomingFlashes(flashes): IncomingFlashes,
) -> Result<impl IntoResponse, AppError> {
    let users = repo::list_enabled(&state.db).await?;
    Ok((
        flash::clear_headers(),
        Json(ListResponse {
            users: users.into_iter().map(UserView::from).collect(),
            flashes,
        }),
    ))
}

#[instrument(skip(flashes))]
async fn new_user_form(
    _admin: AdminUser,
    IncomingFlashes(flashes): IncomingFlashes,
) -> impl IntoResponse {
    (
        flash::clear_headers(),
        Json(NewFormResponse {
            role_choices: Role::choices(),
            flashes,
        }),
    )
}

#[instrument(skip(state, headers, mp))]
async fn create_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    headers: HeaderMap,
    mp: Multipart,
) -> Result<Response, AppError> {
    let locale = locale_from_headers(&headers);
    let submission = forms::read_multipart(mp).await?;
    let image = submission.image.clone();

    // Field violations re-render the form with inline errors; submitted data
    // is not echoed back (kept from the original, see DESIGN.md).
    let form = match forms::bind_create(&submission) {
        Ok(f) => f,
        Err(errors) => return Ok(AppError::Validation(errors).into_response()),
    };

    let mut flash = Flash::default();
    if let Some(upload) = &image {
        let violations = images::validate_image(upload, &locale, &state.translator, &mut flash);
        if !violations.is_empty() {
            let errors = violations
                .into_iter()
                .map(|v| FieldError::new(forms::IMAGE_FIELD, v.show_message))
                .collect();
            return Ok((
                flash.into_headers(),
                AppError::Validation(errors).into_response(),
            )
                .into_response());
        }
    }

    let user = service::create_user(&state, form, image).await?;

    log_and_flash(
        &mut flash,
        200,
        FlashLevel::Success,
        &format!("User successfully created: {}", user.username),
        state
            .translator
            .translate("flash.user_created_successfully", &locale),
        &locale,
    );
    Ok((flash.into_headers(), Redirect::to(LIST_ROUTE)).into_response())
}

#[instrument(skip(state, flashes))]
async fn show_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    IncomingFlashes(flashes): IncomingFlashes,
) -> Result<impl IntoResponse, AppError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((
        flash::clear_headers(),
        Json(ShowResponse {
            delete_form: DeleteForm::for_user(user.id),
            user: user.into(),
            flashes,
        }),
    ))
}

#[instrument(skip(state, flashes))]
async fn edit_user_form(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    IncomingFlashes(flashes): IncomingFlashes,
) -> Result<impl IntoResponse, AppError> {
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok((
        flash::clear_headers(),
        Json(EditFormResponse {
            current_image: user.image.clone(),
            role_choices: Role::choices(),
            delete_form: DeleteForm::for_user(user.id),
            user: user.into(),
            flashes,
        }),
    ))
}

#[instrument(skip(state, headers, mp))]
async fn update_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    headers: HeaderMap,
    mp: Multipart,
) -> Result<Response, AppError> {
    let locale = locale_from_headers(&headers);
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let submission = forms::read_multipart(mp).await?;
    let new_image = submission.image.clone();

    let form = match forms::bind_edit(&submission) {
        Ok(f) => f,
        Err(errors) => {
            return Ok(with_status_422(
                Json(edit_validation_body(user.id, &errors, user.image.as_deref()))
                    .into_response(),
            ));
        }
    };

    let mut flash = Flash::default();
    if let Some(upload) = &new_image {
        let violations = images::validate_image(upload, &locale, &state.translator, &mut flash);
        if !violations.is_empty() {
            // Unlike create, the previously stored filename is kept in the
            // response context so the form can still display it.
            let errors: Vec<FieldError> = violations
                .into_iter()
                .map(|v| FieldError::new(forms::IMAGE_FIELD, v.show_message))
                .collect();
            let body = Json(edit_validation_body(user.id, &errors, user.image.as_deref()));
            return Ok(with_status_422(
                (flash.into_headers(), body).into_response(),
            ));
        }
    }

    service::update_user_profile(&state, &user, form, new_image).await?;

    log_and_flash(
        &mut flash,
        200,
        FlashLevel::Success,
        &format!("User successfully updated: {}", user.username),
        state
            .translator
            .translate("flash.user_updated_successfully", &locale),
        &locale,
    );
    Ok((flash.into_headers(), Redirect::to(LIST_ROUTE)).into_response())
}

#[instrument(skip(state, headers))]
async fn delete_user(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let locale = locale_from_headers(&headers);
    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut flash = Flash::default();
    if !service::may_delete(admin.id, user.id) {
        log_and_flash(
            &mut flash,
            200,
            FlashLevel::Danger,
            "Admin is not allowed to delete his own account",
            state
                .translator
                .translate("flash.admin_delete_denied", &locale),
            &locale,
        );
    } else {
        repo::set_enabled(&state.db, user.id, false).await?;
        log_and_flash(
            &mut flash,
            200,
            FlashLevel::Success,
            &format!("User successfully deleted: {}", user.username),
            state
                .translator
                .translate("flash.user_deleted_successfully", &locale),
            &locale,
        );
    }

    Ok((flash.into_headers(), Redirect::to(LIST_ROUTE)).into_response())
}

fn edit_validation_body(
    user_id: i64,
    errors: &[FieldError],
    current_image: Option<&str>,
) -> serde_json::Value {
    serde_json::json!({
        "errors": errors,
        "current_image": current_image,
        "delete_form": DeleteForm::for_user(user_id),
    })
}

fn with_status_422(mut response: Response) -> Response {
    *response.status_mut() = axum::http::StatusCode::UNPROCESSABLE_ENTITY;
    response
}
