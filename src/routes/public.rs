use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use axum_extra::extract::PrivateCookieJar;
use serde::Deserialize;

use crate::{
    auth::{self, CurrentUser, Registration},
    error::AppError,
    state::AppState,
};

use super::normalize_optional;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/login", get(login_form).post(login_submit))
        .route("/signup", get(signup_form).post(signup_submit))
        .route("/logout", post(logout))
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    logged_in: bool,
}

async fn landing(current: CurrentUser) -> impl IntoResponse {
    AskamaTemplateResponse::into_response(LandingTemplate {
        logged_in: current.0.is_some(),
    })
}

#[derive(Template)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    show_error: bool,
    error_message: String,
    email: String,
}

async fn login_form() -> impl IntoResponse {
    AskamaTemplateResponse::into_response(LoginTemplate {
        show_error: false,
        error_message: String::new(),
        email: String::new(),
    })
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match auth::authenticate_user(&state, &form.email, &form.password).await {
        Ok(user) => Ok((
            auth::apply_session_cookie(jar, &user.email),
            Redirect::to("/dashboard"),
        )
            .into_response()),
        Err(AppError::Unauthorized) => Ok(render_login_error(
            form.email,
            "Invalid credentials. Please try again.".into(),
        )),
        Err(AppError::BadRequest(msg)) => Ok(render_login_error(form.email, msg)),
        Err(err) => Err(err),
    }
}

fn render_login_error(email: String, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(LoginTemplate {
            show_error: true,
            error_message: message,
            email,
        }),
    )
        .into_response()
}

#[derive(Template)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    show_error: bool,
    error_message: String,
    name: String,
    email: String,
    phone: String,
    role: String,
}

async fn signup_form() -> impl IntoResponse {
    AskamaTemplateResponse::into_response(SignupTemplate {
        show_error: false,
        error_message: String::new(),
        name: String::new(),
        email: String::new(),
        phone: String::new(),
        role: String::new(),
    })
}

#[derive(Deserialize)]
struct SignupForm {
    name: String,
    email: String,
    phone: Option<String>,
    role: Option<String>,
    password: String,
    password_confirm: String,
}

async fn signup_submit(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    if form.password != form.password_confirm {
        return Ok(render_signup_error(form, "Passwords do not match!".into()));
    }

    let registration = Registration {
        name: form.name.clone(),
        email: form.email.clone(),
        phone: normalize_optional(form.phone.clone()),
        role: normalize_optional(form.role.clone()),
        password: form.password.clone(),
        rights: None,
    };
    match auth::register_user(state.users.as_ref(), registration).await {
        Ok(user) => Ok((
            auth::apply_session_cookie(jar, &user.email),
            Redirect::to("/dashboard"),
        )
            .into_response()),
        Err(AppError::BadRequest(msg)) => Ok(render_signup_error(form, msg)),
        Err(err) => Err(err),
    }
}

fn render_signup_error(form: SignupForm, message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        AskamaTemplateResponse::into_response(SignupTemplate {
            show_error: true,
            error_message: message,
            name: form.name,
            email: form.email,
            phone: form.phone.unwrap_or_default(),
            role: form.role.unwrap_or_default(),
        }),
    )
        .into_response()
}

async fn logout(jar: PrivateCookieJar) -> (PrivateCookieJar, Redirect) {
    (auth::clear_session_cookie(jar), Redirect::to("/login"))
}
