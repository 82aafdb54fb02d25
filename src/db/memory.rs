use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;

use super::queries::questions::matching_text;
use super::{Category, NewQuestion, Question, QuestionFilter, TriviaStore};

/// A `TriviaStore` kept entirely in process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    categories: BTreeMap<i64, Category>,
    questions: BTreeMap<i64, Question>,
    last_question_id: i64,
}

impl MemoryStore {
    pub fn new(categories: Vec<Category>, questions: Vec<Question>) -> Self {
        let last_question_id = questions.iter().map(|q| q.id).max().unwrap_or(0);
        Self {
            tables: Mutex::new(Tables {
                categories: categories.into_iter().map(|c| (c.id, c)).collect(),
                questions: questions.into_iter().map(|q| (q.id, q)).collect(),
                last_question_id,
            }),
        }
    }

    fn tables(&self) -> anyhow::Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl TriviaStore for MemoryStore {
    async fn categories(&self) -> anyhow::Result<Vec<Category>> {
        Ok(self.tables()?.categories.values().cloned().collect())
    }

    async fn category(&self, id: i64) -> anyhow::Result<Option<Category>> {
        Ok(self.tables()?.categories.get(&id).cloned())
    }

    async fn questions(&self, filter: QuestionFilter) -> anyhow::Result<Vec<Question>> {
        let tables = self.tables()?;
        let questions = tables.questions.values();
        let selected = match filter {
            QuestionFilter::All => questions.cloned().collect(),
            QuestionFilter::Category(id) => {
                questions.filter(|q| q.category == id).cloned().collect()
            }
            QuestionFilter::Search(term) => matching_text(questions, &term),
        };
        Ok(selected)
    }

    async fn insert_question(&self, question: NewQuestion) -> anyhow::Result<i64> {
        let mut tables = self.tables()?;
        tables.last_question_id += 1;
        let id = tables.last_question_id;
        tables.questions.insert(
            id,
            Question {
                id,
                question: question.question,
                answer: question.answer,
                category: question.category,
                difficulty: question.difficulty,
            },
        );
        Ok(id)
    }

    async fn delete_question(&self, id: i64) -> anyhow::Result<bool> {
        Ok(self.tables()?.questions.remove(&id).is_some())
    }
}
