//! Session lookup.
//!
//! ARCHITECTURE
//! ============
//! Sessions and users are issued by the external auth service. This module
//! only resolves a token to the `Principal` it belongs to, including the
//! subscription plan the access gate checks.

use sqlx::{PgPool, Row};

use crate::access::{Plan, Principal};

/// Validate a session token and return the associated principal.
///
/// # Errors
///
/// Returns the underlying database error; an unknown or expired token is
/// `Ok(None)`.
pub async fn validate_session(pool: &PgPool, token: &str) -> Result<Option<Principal>, sqlx::Error> {
    let row = sqlx::query(
        r"SELECT u.id, u.name, u.subscription_plan
          FROM sessions s
          JOIN users u ON u.id = s.user_id
          WHERE s.token = $1 AND s.expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| {
        let plan: Option<String> = r.get("subscription_plan");
        Principal { id: r.get("id"), name: r.get("name"), subscription_plan: plan.as_deref().and_then(Plan::from_str) }
    }))
}

/// Pull a session token from a `Bearer` authorization header value.
#[must_use]
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
