use crate::database::{self, SharedConnection};
use crate::error::AppError;
use crate::models::User;
use crate::services::session_store::SessionStore;
use rusqlite::{Connection, OptionalExtension};
use uuid::Uuid;

/// Stores a new account; a taken login is a validation error
pub fn register_user(conn: &Connection, login: &str, password: &str) -> Result<User, AppError> {
    let user = User::new(login, password)?;

    if find_user(conn, &user.login)?.is_some() {
        return Err(AppError::Validation(format!(
            "Login '{}' is already taken",
            user.login
        )));
    }

    conn.execute(
        "INSERT INTO users (login, password_hash) VALUES (?1, ?2)",
        (&user.login, &user.password_hash),
    )?;

    log::info!("Registered user {}", user.login);
    Ok(user)
}

pub fn find_user(conn: &Connection, login: &str) -> Result<Option<User>, AppError> {
    let mut stmt = conn.prepare("SELECT login, password_hash FROM users WHERE login = ?1")?;
    let user = stmt
        .query_row([login.trim()], |row| User::try_from(row))
        .optional()?;
    Ok(user)
}

/// Checks credentials without touching any session
pub fn verify_credentials(
    conn: &Connection,
    login: &str,
    password: &str,
) -> Result<User, AppError> {
    if login.trim().is_empty() || password.is_empty() {
        return Err(AppError::Validation(
            "Login and password must be present".to_string(),
        ));
    }

    match find_user(conn, login)? {
        Some(user) if user.verify(password) => Ok(user),
        _ => Err(AppError::Unauthorized(
            "Wrong login or password".to_string(),
        )),
    }
}

/// Verifies credentials and opens an authenticated session
///
/// Returns the new session token.
pub async fn login(
    conn: &SharedConnection,
    sessions: &dyn SessionStore,
    login: &str,
    password: &str,
) -> Result<String, AppError> {
    let user = {
        let conn = database::lock(conn);
        verify_credentials(&conn, login, password)?
    };

    let token = Uuid::new_v4().to_string();
    sessions.put(&token, true).await?;
    log::info!("User {} logged in", user.login);
    Ok(token)
}
