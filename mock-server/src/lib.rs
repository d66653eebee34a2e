use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// One stored answer for a question inside a course unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerSet {
    pub course: String,
    pub unit: u32,
    pub answers: Vec<Answer>,
}

#[derive(Deserialize)]
pub struct AnswerQuery {
    pub course: String,
    pub unit: u32,
}

/// What `/echo` saw of the incoming request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: HashMap<String, String>,
    pub content_type: Option<String>,
    pub body: String,
}

pub type Db = Arc<RwLock<HashMap<(String, u32), Vec<Answer>>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/{platform}/answers", get(get_answers).post(submit_answers))
        .route("/{platform}/echo", any(echo))
        .route("/{platform}/status/{code}", any(status))
        .route("/{platform}/delay/{ms}", get(delay))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn get_answers(
    State(db): State<Db>,
    Path(platform): Path<String>,
    Query(query): Query<AnswerQuery>,
) -> Result<Json<AnswerSet>, StatusCode> {
    tracing::info!(%platform, course = %query.course, unit = query.unit, "answers requested");
    let answers = db.read().await;
    answers
        .get(&(query.course.clone(), query.unit))
        .cloned()
        .map(|answers| {
            Json(AnswerSet {
                course: query.course,
                unit: query.unit,
                answers,
            })
        })
        .ok_or(StatusCode::NOT_FOUND)
}

async fn submit_answers(
    State(db): State<Db>,
    Json(input): Json<AnswerSet>,
) -> (StatusCode, Json<AnswerSet>) {
    db.write()
        .await
        .insert((input.course.clone(), input.unit), input.answers.clone());
    (StatusCode::CREATED, Json(input))
}

async fn echo(
    method: Method,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Json<Echo> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Json(Echo {
        method: method.to_string(),
        query,
        content_type,
        body,
    })
}

async fn status(Path((_platform, code)): Path<(String, u16)>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn delay(Path((_platform, ms)): Path<(String, u64)>) -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    Json(serde_json::json!({ "delayed_ms": ms }))
}
