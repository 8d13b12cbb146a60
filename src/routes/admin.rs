use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{
    auth::{self, CurrentUser, Registration},
    error::AppError,
    models::user::{normalize_email, Right, Rights},
    state::AppState,
};

use super::normalize_optional;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users", get(users_list).post(add_user))
        .route("/users/rights", post(update_rights))
}

#[derive(Clone)]
struct UserRow {
    name: String,
    email: String,
    role: String,
    rights: Rights,
}

#[derive(Template)]
#[template(path = "admin/users.html")]
struct UsersTemplate {
    users: Vec<UserRow>,
}

async fn users_list(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    current.require_right(Right::Edit)?;
    let users = state
        .users
        .list()
        .await?
        .into_iter()
        .map(|user| UserRow {
            name: user.name,
            email: user.email,
            role: user.role,
            rights: user.rights,
        })
        .collect();
    Ok(AskamaTemplateResponse::into_response(UsersTemplate {
        users,
    }))
}

/// Unchecked boxes are absent from the form body.
#[derive(Deserialize)]
struct RightsForm {
    view: Option<String>,
    edit: Option<String>,
    delete: Option<String>,
    add_fields: Option<String>,
}

impl RightsForm {
    fn rights(&self) -> Rights {
        Rights {
            view: self.view.is_some(),
            edit: self.edit.is_some(),
            delete: self.delete.is_some(),
            add_fields: self.add_fields.is_some(),
        }
    }
}

#[derive(Deserialize)]
struct AddUserForm {
    name: String,
    email: String,
    password: String,
    role: Option<String>,
    #[serde(flatten)]
    rights: RightsForm,
}

async fn add_user(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<AddUserForm>,
) -> Result<Redirect, AppError> {
    let admin = current.require_right(Right::Edit)?;
    let created = auth::register_user(
        state.users.as_ref(),
        Registration {
            name: form.name,
            email: form.email,
            phone: None,
            role: normalize_optional(form.role),
            password: form.password,
            rights: Some(form.rights.rights()),
        },
    )
    .await?;
    info!("{} added user {}", admin.email, created.email);
    Ok(Redirect::to("/admin/users"))
}

#[derive(Deserialize)]
struct UpdateRightsForm {
    email: String,
    #[serde(flatten)]
    rights: RightsForm,
}

async fn update_rights(
    State(state): State<AppState>,
    current: CurrentUser,
    Form(form): Form<UpdateRightsForm>,
) -> Result<Redirect, AppError> {
    let admin = current.require_right(Right::Edit)?;
    let rights = form.rights.rights();
    // Dropping your own Edit right could leave nobody able to manage users.
    if normalize_email(&form.email) == admin.email && !rights.edit {
        warn!("{} tried to remove their own Edit right", admin.email);
        return Err(AppError::BadRequest(
            "You cannot remove your own Edit right.".into(),
        ));
    }
    if !state.users.update_rights(&form.email, rights).await? {
        return Err(AppError::NotFound);
    }
    info!("{} updated rights of {}", admin.email, form.email);
    Ok(Redirect::to("/admin/users"))
}
