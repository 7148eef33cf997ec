use chrono::{DateTime, Utc};
use diesel::{pg::Pg, prelude::*};

use crate::db::schema;

/// Server-side session record. Only the SHA-256 digest of the client token is kept.
#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Insertable)]
#[diesel(table_name = schema::session)]
#[diesel(check_for_backend(Pg))]
#[diesel(primary_key(token_digest))]
pub struct Session {
    pub token_digest: String,
    pub user_id: i64,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
