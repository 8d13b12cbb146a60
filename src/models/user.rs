use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

pub const DEFAULT_ROLE: &str = "Viewer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Right {
    View,
    Edit,
    Delete,
    AddFields,
}

impl Right {
    pub fn as_str(&self) -> &'static str {
        match self {
            Right::View => "view",
            Right::Edit => "edit",
            Right::Delete => "delete",
            Right::AddFields => "add_fields",
        }
    }
}

impl fmt::Display for Right {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, FromRow)]
pub struct Rights {
    #[sqlx(rename = "can_view")]
    pub view: bool,
    #[sqlx(rename = "can_edit")]
    pub edit: bool,
    #[sqlx(rename = "can_delete")]
    pub delete: bool,
    #[sqlx(rename = "can_add_fields")]
    pub add_fields: bool,
}

impl Rights {
    pub fn viewer() -> Self {
        Self {
            view: true,
            ..Self::default()
        }
    }

    pub fn full() -> Self {
        Self {
            view: true,
            edit: true,
            delete: true,
            add_fields: true,
        }
    }

    pub fn allows(&self, right: Right) -> bool {
        match right {
            Right::View => self.view,
            Right::Edit => self.edit,
            Right::Delete => self.delete,
            Right::AddFields => self.add_fields,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(flatten)]
    pub rights: Rights,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: String,
    pub password_hash: String,
    pub rights: Rights,
}

/// Emails are compared case-insensitively and stored trimmed.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
