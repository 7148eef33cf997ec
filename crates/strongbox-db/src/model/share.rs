use diesel::{pg::Pg, prelude::*};
use serde::Serialize;

use crate::db::schema;

#[derive(Debug, Clone, PartialEq, Eq, Identifiable, Queryable, Selectable, Serialize)]
#[diesel(table_name = schema::share_link)]
#[diesel(check_for_backend(Pg))]
#[diesel(primary_key(token))]
pub struct ShareLink {
    pub token: String,
    /// Normalized vault-relative path, `""` for the vault root.
    pub path: String,
    pub owner_user_id: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Copy, Insertable)]
#[diesel(table_name = schema::share_link)]
pub struct NewShareLink<'a> {
    pub token: &'a str,
    pub path: &'a str,
    pub owner_user_id: i64,
}
