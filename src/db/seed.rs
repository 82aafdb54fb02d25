use std::path::Path;

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::SqlitePool;

use super::queries::categories::{get_all_categories, import_categories};
use super::queries::questions::{get_all_questions, import_questions};
use super::{Category, Question};

pub const CATEGORIES_FILE: &str = "categories.csv";
pub const QUESTIONS_FILE: &str = "questions.csv";

/// Writes every category and question as CSV files into `dir`, creating it if needed.
pub async fn export_data(pool: &SqlitePool, dir: &Path) -> anyhow::Result<()> {
    let categories = get_all_categories(pool).await?;
    let questions = get_all_questions(pool).await?;
    if !dir.exists() {
        std::fs::create_dir_all(dir)?
    }
    tracing::info!(
        "Exporting {} categories and {} questions to {}",
        categories.len(),
        questions.len(),
        dir.display()
    );
    write_to(&dir.join(CATEGORIES_FILE), categories)?;
    write_to(&dir.join(QUESTIONS_FILE), questions)?;
    Ok(())
}

/// Upserts the categories and questions found in `dir` by id.
pub async fn import_data(pool: &SqlitePool, dir: &Path) -> anyhow::Result<()> {
    let categories: Vec<Category> = read_from(&dir.join(CATEGORIES_FILE))?;
    let questions: Vec<Question> = read_from(&dir.join(QUESTIONS_FILE))?;
    tracing::info!(
        "Importing {} categories and {} questions from {}",
        categories.len(),
        questions.len(),
        dir.display()
    );
    import_categories(pool, categories).await?;
    import_questions(pool, questions).await?;
    Ok(())
}

fn write_to(path: &Path, data: Vec<impl Serialize>) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Cannot create {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    for line in data {
        wtr.serialize(line)?;
    }
    wtr.flush()?;
    Ok(())
}

fn read_from<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let file =
        std::fs::File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut rdr = csv::Reader::from_reader(file);
    let mut out = Vec::new();
    for record in rdr.deserialize() {
        let record: T = record.with_context(|| format!("Bad record in {}", path.display()))?;
        out.push(record);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn import_upserts_by_id() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CATEGORIES_FILE),
            "id,type\n1,Science\n4,History\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join(QUESTIONS_FILE),
            "id,question,answer,category,difficulty\n\
             10,What is H2O?,Water,1,1\n\
             12,\"Who built Rome, in a day?\",Nobody,4,3\n",
        )
        .unwrap();
        let pool = test_pool().await;

        import_data(&pool, dir.path()).await.unwrap();
        import_data(&pool, dir.path()).await.unwrap();

        let categories = get_all_categories(&pool).await.unwrap();
        assert_eq!(categories.len(), 2);
        assert_eq!(categories[1].id, 4);
        assert_eq!(categories[1].kind, "History");

        let questions = get_all_questions(&pool).await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].id, 12);
        assert_eq!(questions[1].question, "Who built Rome, in a day?");
        assert_eq!(questions[1].category, 4);
    }

    #[tokio::test]
    async fn export_writes_both_files() {
        let pool = test_pool().await;
        import_categories(
            &pool,
            vec![Category {
                id: 1,
                kind: "Science".to_owned(),
            }],
        )
        .await
        .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");

        export_data(&pool, &target).await.unwrap();

        let categories = std::fs::read_to_string(target.join(CATEGORIES_FILE)).unwrap();
        assert_eq!(categories, "id,type\n1,Science\n");
        let questions: Vec<Question> = read_from(&target.join(QUESTIONS_FILE)).unwrap();
        assert!(questions.is_empty());
    }

    #[tokio::test]
    async fn missing_files_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let pool = test_pool().await;

        let error = import_data(&pool, dir.path()).await.unwrap_err();

        assert!(error.to_string().contains(CATEGORIES_FILE));
    }
}
