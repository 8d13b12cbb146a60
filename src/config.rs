use std::{env, net::SocketAddr, path::PathBuf};

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub listen_addr: SocketAddr,
    pub trips_file: PathBuf,
    pub cookie_secret: String,
    pub seed_admin: Option<SeedAdmin>,
}

/// Owner account created at startup when it does not exist yet.
#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://fleet.db?mode=rwc".to_string());
        let listen_addr: SocketAddr = env::var("APP_LISTEN_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse()
            .map_err(|err| AppError::Config(format!("invalid APP_LISTEN_ADDR: {err}")))?;

        let trips_file = env::var("TRIPS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("fleet_trip_data.csv"));

        let cookie_secret = env::var("COOKIE_SECRET")
            .unwrap_or_else(|_| "change-me-fleet-dashboard-cookie-secret".to_string());

        let seed_admin = match (env::var("ADMIN_EMAIL"), env::var("ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) if !email.trim().is_empty() => {
                if password.is_empty() {
                    return Err(AppError::Config("ADMIN_PASSWORD must not be empty".into()));
                }
                Some(SeedAdmin {
                    name: env::var("ADMIN_NAME").unwrap_or_else(|_| "Fleet Owner".to_string()),
                    email,
                    password,
                })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            listen_addr,
            trips_file,
            cookie_secret,
            seed_admin,
        })
    }
}
