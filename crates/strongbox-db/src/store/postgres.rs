use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl, scoped_futures::ScopedFutureExt};

use super::{CredentialStore, ShareStore};
use crate::db::{
    connection::{DbConnection, DbPool},
    schema,
};
use crate::error::{DbError, DbResult};
use crate::model::{
    session::Session,
    share::{NewShareLink, ShareLink},
    user::{NewUser, Role, User},
};

/// ## Summary
/// PostgreSQL-backed credential and share store.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> DbResult<DbConnection<'_>> {
        Ok(self.pool.get().await?)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    #[tracing::instrument(skip(self))]
    async fn user_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let mut conn = self.conn().await?;
        Ok(schema::app_user::table
            .filter(schema::app_user::username.eq(username))
            .select(User::as_select())
            .first::<User>(&mut conn)
            .await
            .optional()?)
    }

    #[tracing::instrument(skip(self))]
    async fn user_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let mut conn = self.conn().await?;
        Ok(schema::app_user::table
            .find(id)
            .select(User::as_select())
            .first::<User>(&mut conn)
            .await
            .optional()?)
    }

    #[tracing::instrument(skip(self, new_user), fields(username = new_user.username))]
    async fn insert_user(&self, new_user: NewUser<'_>) -> DbResult<User> {
        let mut conn = self.conn().await?;
        diesel::insert_into(schema::app_user::table)
            .values(&new_user)
            .returning(User::as_select())
            .get_result::<User>(&mut conn)
            .await
            .map_err(DbError::from_diesel)
    }

    #[tracing::instrument(skip(self, new_user), fields(username = new_user.username))]
    async fn insert_first_user(&self, new_user: NewUser<'_>) -> DbResult<Option<User>> {
        let mut conn = self.conn().await?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            async move {
                // Blocks concurrent inserts until commit so two first-run setups
                // cannot both observe an empty table.
                diesel::sql_query("LOCK TABLE app_user IN SHARE ROW EXCLUSIVE MODE")
                    .execute(conn)
                    .await?;

                let existing = schema::app_user::table
                    .count()
                    .get_result::<i64>(conn)
                    .await?;
                if existing > 0 {
                    return Ok(None);
                }

                diesel::insert_into(schema::app_user::table)
                    .values(&new_user)
                    .returning(User::as_select())
                    .get_result::<User>(conn)
                    .await
                    .map(Some)
            }
            .scope_boxed()
        })
        .await
        .map_err(DbError::from_diesel)
    }

    async fn count_users(&self) -> DbResult<u64> {
        let mut conn = self.conn().await?;
        let count = schema::app_user::table
            .count()
            .get_result::<i64>(&mut conn)
            .await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn list_users(&self) -> DbResult<Vec<User>> {
        let mut conn = self.conn().await?;
        Ok(schema::app_user::table
            .order(schema::app_user::id.asc())
            .select(User::as_select())
            .load::<User>(&mut conn)
            .await?)
    }

    #[tracing::instrument(skip(self))]
    async fn update_role(&self, id: i64, role: Role) -> DbResult<Option<User>> {
        let mut conn = self.conn().await?;
        Ok(diesel::update(schema::app_user::table.find(id))
            .set((
                schema::app_user::role.eq(role),
                schema::app_user::updated_at.eq(Utc::now()),
            ))
            .returning(User::as_select())
            .get_result::<User>(&mut conn)
            .await
            .optional()?)
    }

    #[tracing::instrument(skip(self, password_hash))]
    async fn update_password_hash(
        &self,
        id: i64,
        password_hash: &str,
    ) -> DbResult<Option<User>> {
        let mut conn = self.conn().await?;
        Ok(diesel::update(schema::app_user::table.find(id))
            .set((
                schema::app_user::password_hash.eq(password_hash),
                schema::app_user::updated_at.eq(Utc::now()),
            ))
            .returning(User::as_select())
            .get_result::<User>(&mut conn)
            .await
            .optional()?)
    }

    #[tracing::instrument(skip(self, session), fields(user_id = session.user_id))]
    async fn insert_session(&self, session: Session) -> DbResult<Session> {
        let mut conn = self.conn().await?;
        diesel::insert_into(schema::session::table)
            .values(&session)
            .returning(Session::as_select())
            .get_result::<Session>(&mut conn)
            .await
            .map_err(DbError::from_diesel)
    }

    #[tracing::instrument(skip_all)]
    async fn session_by_digest(&self, token_digest: &str) -> DbResult<Option<Session>> {
        let mut conn = self.conn().await?;
        Ok(schema::session::table
            .find(token_digest)
            .select(Session::as_select())
            .first::<Session>(&mut conn)
            .await
            .optional()?)
    }

    #[tracing::instrument(skip_all)]
    async fn delete_session(&self, token_digest: &str) -> DbResult<bool> {
        let mut conn = self.conn().await?;
        let removed = diesel::delete(schema::session::table.find(token_digest))
            .execute(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_sessions_for_user(&self, user_id: i64) -> DbResult<usize> {
        let mut conn = self.conn().await?;
        Ok(
            diesel::delete(schema::session::table.filter(schema::session::user_id.eq(user_id)))
                .execute(&mut conn)
                .await?,
        )
    }

    #[tracing::instrument(skip(self))]
    async fn purge_expired_sessions(&self, now: DateTime<Utc>) -> DbResult<usize> {
        let mut conn = self.conn().await?;
        Ok(
            diesel::delete(schema::session::table.filter(schema::session::expires_at.le(now)))
                .execute(&mut conn)
                .await?,
        )
    }
}

#[async_trait]
impl ShareStore for PgStore {
    #[tracing::instrument(skip(self, new_share), fields(path = new_share.path, owner = new_share.owner_user_id))]
    async fn insert_share(&self, new_share: NewShareLink<'_>) -> DbResult<ShareLink> {
        let mut conn = self.conn().await?;
        diesel::insert_into(schema::share_link::table)
            .values(&new_share)
            .returning(ShareLink::as_select())
            .get_result::<ShareLink>(&mut conn)
            .await
            .map_err(DbError::from_diesel)
    }

    #[tracing::instrument(skip_all)]
    async fn share_by_token(&self, token: &str) -> DbResult<Option<ShareLink>> {
        let mut conn = self.conn().await?;
        Ok(schema::share_link::table
            .find(token)
            .select(ShareLink::as_select())
            .first::<ShareLink>(&mut conn)
            .await
            .optional()?)
    }

    #[tracing::instrument(skip(self))]
    async fn shares_for_owner(&self, owner_user_id: i64) -> DbResult<Vec<ShareLink>> {
        let mut conn = self.conn().await?;
        Ok(schema::share_link::table
            .filter(schema::share_link::owner_user_id.eq(owner_user_id))
            .order(schema::share_link::created_at.desc())
            .select(ShareLink::as_select())
            .load::<ShareLink>(&mut conn)
            .await?)
    }

    #[tracing::instrument(skip_all)]
    async fn delete_share(&self, token: &str) -> DbResult<bool> {
        let mut conn = self.conn().await?;
        let removed = diesel::delete(schema::share_link::table.find(token))
            .execute(&mut conn)
            .await?;
        Ok(removed > 0)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_shares_for_owner(&self, owner_user_id: i64) -> DbResult<usize> {
        let mut conn = self.conn().await?;
        Ok(diesel::delete(
            schema::share_link::table.filter(schema::share_link::owner_user_id.eq(owner_user_id)),
        )
        .execute(&mut conn)
        .await?)
    }
}
