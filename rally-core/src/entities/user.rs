use crate::entities::USER_COLUMNS;
use crate::framework::DatabaseProcessor;
use kanau::processor::Processor;
use rally_sdk::objects::UserSummary;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    /// Always stored lowercase.
    pub email: String,
    /// Argon2 PHC string. `None` for guests, who cannot log in with a password.
    pub password_hash: Option<String>,
    pub is_guest: bool,
    pub created_at: time::OffsetDateTime,
}

impl UserRecord {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            is_guest: self.is_guest,
        }
    }
}

/// Data for inserting a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub is_guest: bool,
}

#[derive(Debug, Clone)]
/// Insert a user. Fails with a unique violation if the email is taken.
pub struct InsertUser {
    pub user: NewUser,
}

impl Processor<InsertUser> for DatabaseProcessor {
    type Output = UserRecord;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:InsertUser")]
    async fn process(&self, insert: InsertUser) -> Result<UserRecord, sqlx::Error> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash, is_guest) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(Uuid::now_v7())
            .bind(insert.user.name)
            .bind(insert.user.email)
            .bind(insert.user.password_hash)
            .bind(insert.user.is_guest)
            .fetch_one(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
pub struct GetUserById {
    pub id: Uuid,
}

impl Processor<GetUserById> for DatabaseProcessor {
    type Output = Option<UserRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserById")]
    async fn process(&self, query: GetUserById) -> Result<Option<UserRecord>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(query.id)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Look a user up by (already lowercased) email.
pub struct GetUserByEmail {
    pub email: String,
}

impl Processor<GetUserByEmail> for DatabaseProcessor {
    type Output = Option<UserRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUserByEmail")]
    async fn process(&self, query: GetUserByEmail) -> Result<Option<UserRecord>, sqlx::Error> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(query.email)
            .fetch_optional(&self.pool)
            .await
    }
}

#[derive(Debug, Clone)]
/// Fetch every user whose id is in `ids`. Unknown ids are skipped.
pub struct GetUsersByIds {
    pub ids: Vec<Uuid>,
}

impl Processor<GetUsersByIds> for DatabaseProcessor {
    type Output = Vec<UserRecord>;
    type Error = sqlx::Error;
    #[tracing::instrument(skip_all, err, name = "SQL:GetUsersByIds")]
    async fn process(&self, query: GetUsersByIds) -> Result<Vec<UserRecord>, sqlx::Error> {
        if query.ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(query.ids)
            .fetch_all(&self.pool)
            .await
    }
}
