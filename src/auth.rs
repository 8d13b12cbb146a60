use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::{
    cookie::{Cookie, Key, SameSite},
    PrivateCookieJar,
};
use tracing::{info, warn};

use crate::{
    config::SeedAdmin,
    error::AppError,
    models::user::{NewUser, Right, Rights, User, DEFAULT_ROLE},
    services::users::UserStore,
    state::AppState,
};

pub const SESSION_COOKIE: &str = "fleet_session";

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub name: String,
    pub email: String,
    pub role: String,
    pub rights: Rights,
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            name: user.name,
            email: user.email,
            role: user.role,
            rights: user.rights,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::<Key>::from_request_parts(parts, state)
            .await
            .unwrap_or_else(|never| match never {});
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };

        // A session for a deleted account is treated as logged out.
        let user = state.users.find_by_email(cookie.value()).await?;
        Ok(Self(user.map(AuthenticatedUser::from)))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }

    pub fn require_right(&self, right: Right) -> Result<&AuthenticatedUser, AppError> {
        let user = self.require_user()?;
        if user.rights.allows(right) {
            Ok(user)
        } else {
            warn!("{} lacks the {right} right", user.email);
            Err(AppError::Forbidden)
        }
    }
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::Other(anyhow::anyhow!("hash password: {err}")))
}

/// `false` for a wrong password and for an unreadable stored hash.
pub fn verify_password(hash: &str, password: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

pub async fn authenticate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Please enter your email and password.".into(),
        ));
    }
    match state.users.verify(email, password).await? {
        Some(user) => {
            info!("{} logged in", user.email);
            Ok(user.into())
        }
        None => Err(AppError::Unauthorized),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Option<String>,
    pub password: String,
    pub rights: Option<Rights>,
}

/// Creates an account. Self-service signups get view-only rights.
pub async fn register_user(
    users: &dyn UserStore,
    registration: Registration,
) -> Result<AuthenticatedUser, AppError> {
    let name = registration.name.trim();
    let email = registration.email.trim();
    if name.is_empty() || email.is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest(
            "Please provide a name and a valid email.".into(),
        ));
    }
    if registration.password.is_empty() {
        return Err(AppError::BadRequest("Password must not be empty.".into()));
    }

    let role = registration
        .role
        .map(|role| role.trim().to_string())
        .filter(|role| !role.is_empty())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());

    let user = users
        .insert(NewUser {
            name: name.to_string(),
            email: email.to_string(),
            phone: registration.phone,
            role,
            password_hash: hash_password(&registration.password)?,
            rights: registration.rights.unwrap_or_else(Rights::viewer),
        })
        .await?;
    info!("registered {} as {}", user.email, user.role);
    Ok(user.into())
}

/// Makes sure the configured owner account exists with full rights.
pub async fn ensure_seed_admin(
    users: &dyn UserStore,
    seed: Option<&SeedAdmin>,
) -> Result<(), AppError> {
    let Some(seed) = seed else {
        if users.count().await? == 0 {
            warn!("no users yet and ADMIN_EMAIL/ADMIN_PASSWORD unset; sign up and grant rights manually");
        }
        return Ok(());
    };

    if users.find_by_email(&seed.email).await?.is_some() {
        return Ok(());
    }
    register_user(
        users,
        Registration {
            name: seed.name.clone(),
            email: seed.email.clone(),
            role: Some("Owner".into()),
            password: seed.password.clone(),
            rights: Some(Rights::full()),
            ..Registration::default()
        },
    )
    .await?;
    Ok(())
}

pub fn apply_session_cookie(jar: PrivateCookieJar, email: &str) -> PrivateCookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, email.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::users::MemoryUserStore;

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("closer123").unwrap();
        assert!(verify_password(&hash, "closer123"));
        assert!(!verify_password(&hash, "closer124"));
        assert!(!verify_password("not-a-hash", "closer123"));
    }

    #[tokio::test]
    async fn signup_defaults_to_viewer() {
        let store = MemoryUserStore::new();
        let user = register_user(
            &store,
            Registration {
                name: "Trip Closer".into(),
                email: "closer@example.com".into(),
                password: "closer123".into(),
                ..Registration::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(user.role, DEFAULT_ROLE);
        assert_eq!(user.rights, Rights::viewer());
    }

    #[tokio::test]
    async fn signup_rejects_blank_fields() {
        let store = MemoryUserStore::new();
        let result = register_user(
            &store,
            Registration {
                name: " ".into(),
                email: "x@example.com".into(),
                password: "pw".into(),
                ..Registration::default()
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn seed_admin_is_created_once() {
        let store = MemoryUserStore::new();
        let seed = SeedAdmin {
            name: "Fleet Owner".into(),
            email: "owner@example.com".into(),
            password: "admin123".into(),
        };
        ensure_seed_admin(&store, Some(&seed)).await.unwrap();
        ensure_seed_admin(&store, Some(&seed)).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 1);
        let owner = store.find_by_email("owner@example.com").await.unwrap().unwrap();
        assert_eq!(owner.rights, Rights::full());
        assert_eq!(owner.role, "Owner");
    }
}
