use std::collections::BTreeMap;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::{Question, QuestionFilter, Store},
    server::{app::AppState, errors::ApiError},
};

use super::{category_map, ApiResponse};

#[derive(Serialize)]
struct CategoriesBody {
    categories: BTreeMap<i64, String>,
    total_categories: usize,
}

#[derive(Serialize)]
struct CategoryQuestionsBody {
    questions: Vec<Question>,
    total_questions: usize,
    current_category: String,
}

async fn get_categories(State(store): State<Store>) -> ApiResponse<Json<CategoriesBody>> {
    let categories = category_map(store.categories().await?);
    Ok(Json(CategoriesBody {
        total_categories: categories.len(),
        categories,
    }))
}

async fn get_category_questions(
    State(store): State<Store>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResponse<Json<CategoryQuestionsBody>> {
    let Path(id) = id.map_err(|_| ApiError::NotFound)?;
    let category = store.category(id).await?.ok_or(ApiError::NotFound)?;

    let questions = store.questions(QuestionFilter::Category(id)).await?;
    if questions.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(CategoryQuestionsBody {
        total_questions: questions.len(),
        questions,
        current_category: category.kind,
    }))
}

pub fn categories_router() -> Router<AppState> {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/categories/{id}/questions", get(get_category_questions))
}
