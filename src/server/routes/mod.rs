mod categories;
mod questions;
mod quizzes;

use std::collections::BTreeMap;

pub use categories::categories_router;
pub use questions::questions_router;
pub use quizzes::quizzes_router;

use super::errors::ApiError;
use crate::db::Category;

pub type ApiResponse<T> = Result<T, ApiError>;

/// Category id to label, the shape the front-end uses for its dropdowns.
fn category_map(categories: Vec<Category>) -> BTreeMap<i64, String> {
    categories.into_iter().map(|c| (c.id, c.kind)).collect()
}
