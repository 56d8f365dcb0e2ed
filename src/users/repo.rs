use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};

/// The fixed role enumeration offered in the admin area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
    Api,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Admin, Role::User, Role::Api];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::User => "ROLE_USER",
            Role::Api => "ROLE_API",
        }
    }

    pub fn parse(token: &str) -> Option<Role> {
        match token {
            "ROLE_ADMIN" => Some(Role::Admin),
            "ROLE_USER" => Some(Role::User),
            "ROLE_API" => Some(Role::Api),
            _ => None,
        }
    }

    pub fn choices() -> Vec<&'static str> {
        Self::ALL.iter().map(|r| r.as_str()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub dob: Date,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub image: Option<String>,
    pub roles: Vec<String>,
    pub enabled: bool,
    pub confirmation_token: Option<String>,
    pub last_login: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Fields of a freshly created account. `enabled`, the confirmation token and
/// `last_login` are decided by the create flow, not by the caller's input.
#[derive(Debug)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub dob: Date,
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub image: Option<String>,
    pub roles: Vec<String>,
    pub enabled: bool,
    pub confirmation_token: Option<String>,
    pub last_login: Option<OffsetDateTime>,
}

/// Fields the edit flow is allowed to touch. No password, no enabled flag,
/// no token.
#[derive(Debug)]
pub struct ProfileUpdate {
    pub first_name: String,
    pub last_name: String,
    pub dob: Date,
    pub email: String,
    pub username: String,
    pub image: Option<String>,
    pub roles: Vec<String>,
}

const USER_COLUMNS: &str = "id, first_name, last_name, dob, email, username, password_hash, \
     image, roles, enabled, confirmation_token, last_login, created_at";

pub async fn list_enabled(db: &PgPool) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE enabled = TRUE
        ORDER BY id
        "#
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: i64) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE id = $1
        "#
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn insert(db: &PgPool, new: &NewUser) -> anyhow::Result<User> {
    let user = sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (first_name, last_name, dob, email, username, password_hash,
                           image, roles, enabled, confirmation_token, last_login)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(&new.first_name)
    .bind(&new.last_name)
    .bind(new.dob)
    .bind(&new.email)
    .bind(&new.username)
    .bind(&new.password_hash)
    .bind(&new.image)
    .bind(&new.roles)
    .bind(new.enabled)
    .bind(&new.confirmation_token)
    .bind(new.last_login)
    .fetch_one(db)
    .await?;
    Ok(user)
}

const UPDATE_PROFILE_SQL: &str = r#"
        UPDATE users
        SET first_name = $2, last_name = $3, dob = $4, email = $5, username = $6,
            image = $7, roles = $8
        WHERE id = $1
        "#;

const SET_ENABLED_SQL: &str = "UPDATE users SET enabled = $2 WHERE id = $1";

pub async fn update_profile(db: &PgPool, id: i64, update: &ProfileUpdate) -> anyhow::Result<()> {
    sqlx::query(UPDATE_PROFILE_SQL)
    .bind(id)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(update.dob)
    .bind(&update.email)
    .bind(&update.username)
    .bind(&update.image)
    .bind(&update.roles)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn set_enabled(db: &PgPool, id: i64, enabled: bool) -> anyhow::Result<()> {
    sqlx::query(SET_ENABLED_SQL)
        .bind(id)
        .bind(enabled)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_tokens_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
        assert_eq!(Role::parse("ROLE_SUPERADMIN"), None);
        assert_eq!(Role::parse("role_admin"), None);
    }

    #[test]
    fn role_choices_match_the_admin_form() {
        assert_eq!(Role::choices(), vec!["ROLE_ADMIN", "ROLE_USER", "ROLE_API"]);
    }

    #[test]
    fn soft_delete_touches_only_the_enabled_flag() {
        let set_clause = SET_ENABLED_SQL
            .split_once("SET")
            .and_then(|(_, rest)| rest.split_once("WHERE"))
            .map(|(clause, _)| clause.trim())
            .unwrap();
        assert_eq!(set_clause, "enabled = $2");
    }

    #[test]
    fn profile_update_never_touches_credentials_or_lifecycle_columns() {
        for column in ["password_hash", "enabled", "confirmation_token", "last_login"] {
            assert!(
                !UPDATE_PROFILE_SQL.contains(column),
                "profile update must not set {column}"
            );
        }
        for column in ["first_name", "last_name", "dob", "email", "username", "image", "roles"] {
            assert!(
                UPDATE_PROFILE_SQL.contains(column),
                "profile update should set {column}"
            );
        }
    }
}
