use std::collections::BTreeMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_aux::field_attributes::deserialize_string_from_number;
use serde_json::Value;

use crate::{
    db::{NewQuestion, Question, QuestionFilter, Store},
    server::{app::AppState, errors::ApiError},
    telemetry::QUESTION_CHANGES,
};

use super::{category_map, ApiResponse};

const QUESTIONS_PER_PAGE: usize = 10;

#[derive(Deserialize)]
struct Pagination {
    page: Option<i64>,
}

#[derive(Deserialize)]
struct SearchRequest {
    #[serde(rename = "searchTerm")]
    #[serde(deserialize_with = "deserialize_string_from_number")]
    search_term: String,
}

/// The two operations sharing `POST /questions`.
enum QuestionsPayload {
    Search(SearchRequest),
    Create(NewQuestion),
}

impl TryFrom<Value> for QuestionsPayload {
    type Error = ApiError;

    // a body carrying `searchTerm` is always a search, whatever else it holds
    fn try_from(body: Value) -> Result<Self, Self::Error> {
        let is_search = body
            .as_object()
            .ok_or(ApiError::BadRequest)?
            .contains_key("searchTerm");
        let payload = if is_search {
            serde_json::from_value(body).map(QuestionsPayload::Search)
        } else {
            serde_json::from_value(body).map(QuestionsPayload::Create)
        };
        payload.map_err(|_| ApiError::BadRequest)
    }
}

#[derive(Serialize)]
struct QuestionsPage {
    questions: Vec<Question>,
    total_questions: usize,
    categories: BTreeMap<i64, String>,
}

#[derive(Serialize)]
struct SearchResults {
    questions: Vec<Question>,
    total_questions: usize,
}

#[derive(Serialize)]
struct Created {
    created: bool,
}

#[derive(Serialize)]
struct Deleted {
    deleted: bool,
    id: i64,
}

async fn get_questions(
    State(store): State<Store>,
    pagination: Result<Query<Pagination>, QueryRejection>,
) -> ApiResponse<Json<QuestionsPage>> {
    let Query(Pagination { page }) = pagination.map_err(|_| ApiError::BadRequest)?;
    let page = usize::try_from(page.unwrap_or(1))
        .ok()
        .filter(|page| *page > 0)
        .ok_or(ApiError::BadRequest)?;

    let all_questions = store.questions(QuestionFilter::All).await?;
    let total_questions = all_questions.len();
    let questions: Vec<Question> = all_questions
        .into_iter()
        .skip(QUESTIONS_PER_PAGE.saturating_mul(page - 1))
        .take(QUESTIONS_PER_PAGE)
        .collect();
    if questions.is_empty() {
        return Err(ApiError::NotFound);
    }

    Ok(Json(QuestionsPage {
        questions,
        total_questions,
        categories: category_map(store.categories().await?),
    }))
}

async fn delete_question(
    State(store): State<Store>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResponse<Json<Deleted>> {
    let Path(id) = id.map_err(|_| ApiError::NotFound)?;
    if !store.delete_question(id).await? {
        return Err(ApiError::Unprocessable);
    }

    tracing::info!("Deleted question {id}");
    QUESTION_CHANGES.with_label_values(&["deleted"]).inc();
    Ok(Json(Deleted { deleted: true, id }))
}

async fn post_questions(
    State(store): State<Store>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResponse<Response> {
    let Json(body) = body.map_err(|_| ApiError::BadRequest)?;
    match QuestionsPayload::try_from(body)? {
        QuestionsPayload::Search(request) => search_questions(&store, request).await,
        QuestionsPayload::Create(question) => create_question(&store, question).await,
    }
}

async fn search_questions(store: &Store, request: SearchRequest) -> ApiResponse<Response> {
    let questions = store
        .questions(QuestionFilter::Search(request.search_term))
        .await?;
    if questions.is_empty() {
        return Err(ApiError::NotFound);
    }

    let results = SearchResults {
        total_questions: questions.len(),
        questions,
    };
    Ok(Json(results).into_response())
}

async fn create_question(store: &Store, question: NewQuestion) -> ApiResponse<Response> {
    let id = store.insert_question(question).await?;

    tracing::info!("Created question {id}");
    QUESTION_CHANGES.with_label_values(&["created"]).inc();
    Ok(Json(Created { created: true }).into_response())
}

pub fn questions_router() -> Router<AppState> {
    Router::new()
        .route("/questions", get(get_questions).post(post_questions))
        .route("/questions/{id}", delete(delete_question))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use crate::server::routes::test_helpers::{app, category, delete, get, post, question, send};

    fn numbered_questions(count: i64) -> Vec<crate::db::Question> {
        (1..=count)
            .map(|id| question(id, &format!("Question number {id}?"), 1 + id % 2))
            .collect()
    }

    fn ids(body: &serde_json::Value) -> Vec<i64> {
        body["questions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|q| q["id"].as_i64().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn pages_are_ten_questions_ordered_by_id() {
        let app = app(
            vec![category(1, "Science"), category(2, "Art")],
            numbered_questions(25),
        );

        let (status, body) = get(&app, "/questions").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), (1..=10).collect::<Vec<_>>());
        assert_eq!(body["total_questions"], 25);
        assert_eq!(body["categories"], json!({"1": "Science", "2": "Art"}));

        let (status, body) = get(&app, "/questions?page=2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), (11..=20).collect::<Vec<_>>());
        assert_eq!(body["total_questions"], 25);

        let (status, body) = get(&app, "/questions?page=3").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), (21..=25).collect::<Vec<_>>());
        assert_eq!(body["total_questions"], 25);
    }

    #[tokio::test]
    async fn page_past_the_end_is_not_found() {
        let app = app(vec![category(1, "Science")], numbered_questions(10));

        let (status, body) = get(&app, "/questions?page=2").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "resource not found");
    }

    #[tokio::test]
    async fn empty_store_has_no_first_page() {
        let app = app(vec![], vec![]);

        let (status, _) = get(&app, "/questions").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_positive_or_garbage_page_is_bad_request() {
        let app = app(vec![category(1, "Science")], numbered_questions(3));

        for uri in ["/questions?page=0", "/questions?page=-1", "/questions?page=abc"] {
            let (status, body) = get(&app, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(
                body,
                json!({"success": false, "status_code": 400, "message": "bad request"})
            );
        }
    }

    #[tokio::test]
    async fn delete_removes_the_question() {
        let app = app(vec![category(1, "Science")], numbered_questions(3));

        let (status, body) = delete(&app, "/questions/2").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"deleted": true, "id": 2}));

        let (_, body) = get(&app, "/questions").await;
        assert_eq!(ids(&body), vec![1, 3]);
        assert_eq!(body["total_questions"], 2);
    }

    #[tokio::test]
    async fn deleting_a_missing_question_is_unprocessable() {
        let app = app(vec![category(1, "Science")], numbered_questions(3));

        let (status, body) = delete(&app, "/questions/1000").await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            body,
            json!({"success": false, "status_code": 422, "message": "unprocessable"})
        );
    }

    #[tokio::test]
    async fn search_matches_substrings_ignoring_case() {
        let app = app(
            vec![category(1, "Science")],
            vec![
                question(1, "What is H2O?", 1),
                question(2, "Which planet is red?", 1),
                question(3, "What is the boiling point of water?", 1),
            ],
        );

        let (status, body) = post(&app, "/questions", json!({"searchTerm": "what IS"})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body), vec![1, 3]);
        assert_eq!(body["total_questions"], 2);
    }

    #[tokio::test]
    async fn search_without_matches_is_not_found() {
        let app = app(vec![], vec![question(1, "What is H2O?", 1)]);

        let (status, body) = post(&app, "/questions", json!({"searchTerm": "weirdword"})).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "resource not found");
    }

    #[tokio::test]
    async fn search_term_takes_precedence_over_create_fields() {
        let app = app(vec![], vec![question(1, "What is H2O?", 1)]);
        let body = json!({
            "searchTerm": "h2o",
            "question": "New?",
            "answer": "Yes",
            "category": 1,
            "difficulty": 2
        });

        let (status, body) = post(&app, "/questions", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_questions"], 1);
        let (_, listing) = get(&app, "/questions").await;
        assert_eq!(listing["total_questions"], 1);
    }

    #[tokio::test]
    async fn create_adds_one_retrievable_question() {
        let app = app(vec![category(1, "Science")], vec![question(1, "What is H2O?", 1)]);
        let new_question = json!({
            "question": "test question",
            "answer": "test answer",
            "category": "1",
            "difficulty": 2
        });

        let (status, body) = post(&app, "/questions", new_question).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"created": true}));

        let (_, listing) = get(&app, "/questions").await;
        assert_eq!(listing["total_questions"], 2);

        let (status, found) = post(&app, "/questions", json!({"searchTerm": "test question"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            found["questions"][0],
            json!({
                "id": 2,
                "question": "test question",
                "answer": "test answer",
                "category": 1,
                "difficulty": 2
            })
        );
    }

    #[tokio::test]
    async fn incomplete_or_malformed_bodies_are_bad_requests() {
        let app = app(vec![category(1, "Science")], vec![]);
        let bodies = [
            json!({"question": "q", "answer": "a", "category": 1}),
            json!({"question": "q", "answer": "a", "difficulty": 1}),
            json!({"answer": "a", "category": 1, "difficulty": 1}),
            json!({"question": "q", "answer": "a", "category": "science", "difficulty": 1}),
            json!({"searchTerm": null}),
            json!(["searchTerm"]),
            json!({}),
        ];

        for body in bodies {
            let (status, response) = post(&app, "/questions", body.clone()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
            assert_eq!(response["message"], "bad request");
        }

        let (status, _) = send(&app, Method::POST, "/questions", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
