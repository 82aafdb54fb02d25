use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use itertools::Itertools;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_number_from_string;

use crate::{
    db::{Question, QuestionFilter, Store},
    server::{app::AppState, deserializers::deserialize_ids, errors::ApiError},
    telemetry::{QUIZ_COMPLETED, QUIZ_QUESTIONS_SERVED},
};

use super::ApiResponse;

/// `quiz_category` value meaning "any category".
const ANY_CATEGORY: i64 = 0;
const CATEGORY_DRAWS: usize = 3;
const MAX_MIXED_CANDIDATES: usize = 5;

#[derive(Deserialize)]
struct QuizRequest {
    #[serde(deserialize_with = "deserialize_ids")]
    previous_questions: Vec<i64>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    quiz_category: i64,
}

#[derive(Serialize)]
#[serde(untagged)]
enum QuizResponse {
    Next { question: Question },
    End { end: bool },
}

/// Draws category ids with replacement and keeps the first occurrence of each.
fn sample_categories<R: Rng + ?Sized>(category_ids: &[i64], rng: &mut R) -> Vec<i64> {
    (0..CATEGORY_DRAWS)
        .filter_map(|_| category_ids.choose(rng).copied())
        .unique()
        .collect()
}

async fn mixed_candidates(store: &Store) -> ApiResponse<Vec<Question>> {
    let category_ids: Vec<i64> = store.categories().await?.iter().map(|c| c.id).collect();
    let sampled = sample_categories(&category_ids, &mut rand::thread_rng());

    let mut candidates = Vec::new();
    for id in sampled {
        candidates.extend(store.questions(QuestionFilter::Category(id)).await?);
    }
    candidates.truncate(MAX_MIXED_CANDIDATES);
    Ok(candidates)
}

async fn next_question(
    State(store): State<Store>,
    request: Result<Json<QuizRequest>, JsonRejection>,
) -> ApiResponse<Json<QuizResponse>> {
    let Json(request) = request.map_err(|_| ApiError::BadRequest)?;

    let candidates = if request.quiz_category == ANY_CATEGORY {
        mixed_candidates(&store).await?
    } else {
        store
            .questions(QuestionFilter::Category(request.quiz_category))
            .await?
    };
    if candidates.is_empty() {
        return Err(ApiError::NotFound);
    }

    let next = candidates
        .into_iter()
        .find(|q| !request.previous_questions.contains(&q.id));
    let response = match next {
        Some(question) => {
            let category = question.category.to_string();
            QUIZ_QUESTIONS_SERVED
                .with_label_values(&[category.as_str()])
                .inc();
            QuizResponse::Next { question }
        }
        None => {
            QUIZ_COMPLETED.inc();
            QuizResponse::End { end: true }
        }
    };
    Ok(Json(response))
}

pub fn quizzes_router() -> Router<AppState> {
    Router::new().route("/quizzes", post(next_question))
}
