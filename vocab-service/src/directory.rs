use std::str::FromStr;

use async_trait::async_trait;
use common_auth::{DirectoryError, NewAccount, Role, StoredCredentials, UserDirectory};
use common_crypto::{PasswordHash, Salt};
use sqlx::{FromRow, PgPool};
use tracing::error;

const UNIQUE_VIOLATION: &str = "23505";

/// Postgres-backed user directory over the `users` table.
#[derive(Clone)]
pub struct PgUserDirectory {
    db: PgPool,
}

#[derive(FromRow)]
struct CredentialRow {
    password_hash: String,
    salt: String,
    role: String,
}

impl PgUserDirectory {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn unavailable(err: sqlx::Error) -> DirectoryError {
    error!(error = %err, "user directory query failed");
    DirectoryError::Unavailable(err.to_string())
}

impl CredentialRow {
    fn into_credentials(self, nickname: &str) -> Result<StoredCredentials, DirectoryError> {
        let salt = Salt::parse(self.salt).map_err(|err| {
            error!(nickname, error = %err, "stored salt is invalid");
            DirectoryError::Unavailable(format!("corrupt credentials for '{nickname}'"))
        })?;
        let role = Role::from_str(&self.role).map_err(|_| {
            error!(nickname, role = %self.role, "stored role is invalid");
            DirectoryError::Unavailable(format!("corrupt role for '{nickname}'"))
        })?;
        Ok(StoredCredentials {
            hash: PasswordHash::from_stored(self.password_hash),
            salt,
            role,
        })
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn exists(&self, name: &str) -> Result<bool, DirectoryError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE nickname = $1)")
            .bind(name)
            .fetch_one(&self.db)
            .await
            .map_err(unavailable)
    }

    async fn is_active_manager(&self, name: &str) -> Result<bool, DirectoryError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                SELECT 1 FROM users
                WHERE nickname = $1 AND role = 'manager' AND is_active
             )",
        )
        .bind(name)
        .fetch_one(&self.db)
        .await
        .map_err(unavailable)
    }

    async fn credentials_for(
        &self,
        name: &str,
    ) -> Result<Option<StoredCredentials>, DirectoryError> {
        let row = sqlx::query_as::<_, CredentialRow>(
            "SELECT password_hash, salt, role FROM users WHERE nickname = $1",
        )
        .bind(name)
        .fetch_optional(&self.db)
        .await
        .map_err(unavailable)?;

        row.map(|row| row.into_credentials(name)).transpose()
    }

    async fn create_user(&self, account: NewAccount) -> Result<(), DirectoryError> {
        let NewAccount {
            nickname,
            credentials,
        } = account;

        let result = sqlx::query(
            "INSERT INTO users (nickname, password_hash, salt, role, is_active)
             VALUES ($1, $2, $3, $4, TRUE)",
        )
        .bind(&nickname)
        .bind(credentials.hash.as_str())
        .bind(credentials.salt.as_str())
        .bind(credentials.role.as_str())
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) =>
            {
                Err(DirectoryError::Conflict(nickname))
            }
            Err(err) => Err(unavailable(err)),
        }
    }
}
