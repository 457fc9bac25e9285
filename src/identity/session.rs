use chrono::{DateTime, Duration, Utc};

use crate::error::{DirectoryError, DirectoryResult};
use crate::model::UserSession;
use crate::secrets::{constant_time_eq, random_session_id};

/// Dashboard sessions last 15 minutes unless configured otherwise.
pub const DEFAULT_SESSION_TTL_SECS: i64 = 15 * 60;

pub fn default_ttl() -> Duration { Duration::seconds(DEFAULT_SESSION_TTL_SECS) }

/// Fresh session: random positive 63-bit id, expiring `ttl` after `now`. A non-positive
/// `ttl`, or one that runs past the representable date range, is rejected.
pub fn issue(now: DateTime<Utc>, ttl: Duration) -> DirectoryResult<UserSession> {
    if ttl <= Duration::zero() {
        return Err(DirectoryError::SessionLifetime);
    }
    let expiration = now.checked_add_signed(ttl).ok_or(DirectoryError::SessionLifetime)?;
    Ok(UserSession { id: random_session_id()?, expiration: Some(expiration) })
}

/// The cookie value presented by the dashboard is the decimal form of the id.
pub fn cookie_value(session: &UserSession) -> String { session.id.to_string() }

/// Constant-time check of a presented cookie value against a live session.
pub fn matches(session: &UserSession, presented: &str, now: DateTime<Utc>) -> bool {
    if !session.is_live_at(now) { return false; }
    constant_time_eq(cookie_value(session).as_bytes(), presented.as_bytes())
}
