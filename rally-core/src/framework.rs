use sqlx::PgPool;

/// Executes the SQL processors in [`crate::entities`] against a pool.
///
/// Each query is a plain struct with a
/// `kanau::processor::Processor<Query> for DatabaseProcessor` impl.
#[derive(Clone)]
pub struct DatabaseProcessor {
    pub pool: PgPool,
}
