use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub category: i64,
    pub difficulty: i64,
}

/// A question as submitted by a client, before the store assigns an id.
///
/// `category` and `difficulty` come from `<select>` elements on the front-end,
/// so numeric strings are accepted alongside numbers.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewQuestion {
    pub question: String,
    pub answer: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub category: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub difficulty: i64,
}

pub async fn get_all_questions(pool: &SqlitePool) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn get_questions_for_category(
    pool: &SqlitePool,
    category: i64,
) -> sqlx::Result<Vec<Question>> {
    sqlx::query_as::<_, Question>(
        r#"
        SELECT id, question, answer, category, difficulty FROM questions
        WHERE questions.category = ?1
        ORDER BY id
        "#,
    )
    .bind(category)
    .fetch_all(pool)
    .await
}

pub async fn create_question(pool: &SqlitePool, question: &NewQuestion) -> sqlx::Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO questions (question, answer, category, difficulty) VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(&question.question)
    .bind(&question.answer)
    .bind(question.category)
    .bind(question.difficulty)
    .execute(pool)
    .await?
    .last_insert_rowid();

    Ok(id)
}

/// Returns `false` when no question had this id.
pub async fn delete_question(pool: &SqlitePool, id: i64) -> sqlx::Result<bool> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM questions WHERE questions.id = ?1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(deleted > 0)
}

pub async fn import_questions(pool: &SqlitePool, questions: Vec<Question>) -> sqlx::Result<()> {
    for question in questions {
        sqlx::query(
            r#"
            INSERT INTO questions (id, question, answer, category, difficulty)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                question = excluded.question,
                answer = excluded.answer,
                category = excluded.category,
                difficulty = excluded.difficulty
            "#,
        )
        .bind(question.id)
        .bind(&question.question)
        .bind(&question.answer)
        .bind(question.category)
        .bind(question.difficulty)
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Questions whose text contains `term`, ignoring case, in iteration order.
///
/// Matching happens here rather than in SQL: SQLite's `LIKE` folds ASCII only
/// and treats `%` and `_` as wildcards.
pub fn matching_text<'a>(
    questions: impl IntoIterator<Item = &'a Question>,
    term: &str,
) -> Vec<Question> {
    let term = term.to_lowercase();
    questions
        .into_iter()
        .filter(|q| q.question.to_lowercase().contains(&term))
        .cloned()
        .collect()
}
