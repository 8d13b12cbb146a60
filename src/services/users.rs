use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    auth::verify_password,
    db::DbPool,
    error::AppError,
    models::user::{normalize_email, NewUser, Rights, User},
};

/// Account storage behind login, signup and the user settings page.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Fails with `BadRequest` when the email is already taken.
    async fn insert(&self, user: NewUser) -> Result<User, AppError>;

    async fn list(&self) -> Result<Vec<User>, AppError>;

    /// Returns `false` when no user has that email.
    async fn update_rights(&self, email: &str, rights: Rights) -> Result<bool, AppError>;

    async fn count(&self) -> Result<i64, AppError>;

    async fn verify(&self, email: &str, password: &str) -> Result<Option<User>, AppError> {
        let user = self.find_by_email(email).await?;
        Ok(user.filter(|user| verify_password(&user.password_hash, password)))
    }
}

fn duplicate_email() -> AppError {
    AppError::BadRequest("An account with this email already exists.".into())
}

#[derive(Clone)]
pub struct SqliteUserStore {
    db: DbPool,
}

impl SqliteUserStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, phone, role, password_hash, can_view, can_edit, can_delete, can_add_fields, created_at FROM users WHERE email = ?1"#,
        )
        .bind(normalize_email(email))
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let email = normalize_email(&user.email);
        let created_at = Utc::now();
        let result = sqlx::query(
            r#"INSERT INTO users (name, email, phone, role, password_hash, can_view, can_edit, can_delete, can_add_fields, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"#,
        )
        .bind(&user.name)
        .bind(&email)
        .bind(&user.phone)
        .bind(&user.role)
        .bind(&user.password_hash)
        .bind(user.rights.view)
        .bind(user.rights.edit)
        .bind(user.rights.delete)
        .bind(user.rights.add_fields)
        .bind(created_at)
        .execute(&self.db)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Err(duplicate_email())
            }
            Err(err) => return Err(err.into()),
        };

        Ok(User {
            id: result.last_insert_rowid(),
            name: user.name,
            email,
            phone: user.phone,
            role: user.role,
            password_hash: user.password_hash,
            rights: user.rights,
            created_at,
        })
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        let users = sqlx::query_as::<_, User>(
            r#"SELECT id, name, email, phone, role, password_hash, can_view, can_edit, can_delete, can_add_fields, created_at FROM users ORDER BY id"#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(users)
    }

    async fn update_rights(&self, email: &str, rights: Rights) -> Result<bool, AppError> {
        let result = sqlx::query(
            "UPDATE users SET can_view = ?1, can_edit = ?2, can_delete = ?3, can_add_fields = ?4 WHERE email = ?5",
        )
        .bind(rights.view)
        .bind(rights.edit)
        .bind(rights.delete)
        .bind(rights.add_fields)
        .bind(normalize_email(email))
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

/// Process-local store, lost on restart.
#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = normalize_email(email);
        let users = self.users.read().await;
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    async fn insert(&self, user: NewUser) -> Result<User, AppError> {
        let email = normalize_email(&user.email);
        let mut users = self.users.write().await;
        if users.iter().any(|existing| existing.email == email) {
            return Err(duplicate_email());
        }
        let created = User {
            id: users.len() as i64 + 1,
            name: user.name,
            email,
            phone: user.phone,
            role: user.role,
            password_hash: user.password_hash,
            rights: user.rights,
            created_at: Utc::now(),
        };
        users.push(created.clone());
        Ok(created)
    }

    async fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.users.read().await.clone())
    }

    async fn update_rights(&self, email: &str, rights: Rights) -> Result<bool, AppError> {
        let email = normalize_email(email);
        let mut users = self.users.write().await;
        match users.iter_mut().find(|user| user.email == email) {
            Some(user) => {
                user.rights = rights;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count(&self) -> Result<i64, AppError> {
        Ok(self.users.read().await.len() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::hash_password,
        db::{init_pool, run_migrations},
    };

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Anna Smith".into(),
            email: email.into(),
            phone: None,
            role: "Manager".into(),
            password_hash: hash_password("password1").unwrap(),
            rights: Rights::viewer(),
        }
    }

    async fn exercise(store: &dyn UserStore) {
        let created = store.insert(new_user(" Anna.Smith@Example.com ")).await.unwrap();
        assert_eq!(created.email, "anna.smith@example.com");
        assert_eq!(store.count().await.unwrap(), 1);

        let duplicate = store.insert(new_user("anna.smith@example.com")).await;
        assert!(matches!(duplicate, Err(AppError::BadRequest(_))));

        let found = store.find_by_email("ANNA.SMITH@example.com").await.unwrap();
        assert_eq!(found.map(|user| user.id), Some(created.id));

        assert!(store
            .verify("anna.smith@example.com", "password1")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .verify("anna.smith@example.com", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(store.verify("nobody@example.com", "password1").await.unwrap().is_none());

        assert!(store
            .update_rights("anna.smith@example.com", Rights::full())
            .await
            .unwrap());
        assert!(!store
            .update_rights("nobody@example.com", Rights::full())
            .await
            .unwrap());
        let listed = store.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].rights, Rights::full());
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        exercise(&MemoryUserStore::new()).await;
    }

    #[tokio::test]
    async fn sqlite_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("users.db").display());
        let db = init_pool(&url).await.unwrap();
        run_migrations(&db).await.unwrap();
        exercise(&SqliteUserStore::new(db)).await;
    }
}
