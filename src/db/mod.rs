pub mod memory;
pub mod queries;
pub mod seed;

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use memory::MemoryStore;
pub use queries::categories::Category;
pub use queries::questions::{NewQuestion, Question};

use sqlx::Error;

/// Which questions to load. Every variant yields questions ordered by id.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionFilter {
    All,
    Category(i64),
    /// Case-insensitive substring of the question text.
    Search(String),
}

/// Data access used by the HTTP handlers.
#[async_trait]
pub trait TriviaStore: Send + Sync {
    async fn categories(&self) -> anyhow::Result<Vec<Category>>;

    async fn category(&self, id: i64) -> anyhow::Result<Option<Category>>;

    async fn questions(&self, filter: QuestionFilter) -> anyhow::Result<Vec<Question>>;

    async fn insert_question(&self, question: NewQuestion) -> anyhow::Result<i64>;

    /// Returns `false` when there was nothing to delete.
    async fn delete_question(&self, id: i64) -> anyhow::Result<bool>;
}

pub type Store = Arc<dyn TriviaStore>;

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TriviaStore for SqliteStore {
    async fn categories(&self) -> anyhow::Result<Vec<Category>> {
        Ok(queries::categories::get_all_categories(&self.pool).await?)
    }

    async fn category(&self, id: i64) -> anyhow::Result<Option<Category>> {
        Ok(queries::categories::get_category(&self.pool, id).await?)
    }

    async fn questions(&self, filter: QuestionFilter) -> anyhow::Result<Vec<Question>> {
        let questions = match filter {
            QuestionFilter::All => queries::questions::get_all_questions(&self.pool).await?,
            QuestionFilter::Category(id) => {
                queries::questions::get_questions_for_category(&self.pool, id).await?
            }
            QuestionFilter::Search(term) => {
                let questions = queries::questions::get_all_questions(&self.pool).await?;
                queries::questions::matching_text(&questions, &term)
            }
        };
        Ok(questions)
    }

    async fn insert_question(&self, question: NewQuestion) -> anyhow::Result<i64> {
        Ok(queries::questions::create_question(&self.pool, &question).await?)
    }

    async fn delete_question(&self, id: i64) -> anyhow::Result<bool> {
        Ok(queries::questions::delete_question(&self.pool, id).await?)
    }
}

pub async fn establish_connection(url: &str, max_connections: u32) -> Result<SqlitePool, Error> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    // every connection to sqlite::memory: opens a separate database
    let max_connections = if url.contains(":memory:") {
        1
    } else {
        max_connections
    };
    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = establish_connection("sqlite::memory:", 1).await.unwrap();
    run_migrations(&pool).await.unwrap();
    pool
}
