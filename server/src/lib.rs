//! HTTP boundary for the Courier messaging backend.
//!
//! Thin plumbing over `courier-messaging`: request-shape validation,
//! bearer-token authentication against the actor directory, and the
//! response envelope. The caller's identity is resolved here and threaded
//! explicitly into every core operation.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
};
use tracing::error;

use courier_config::AppConfig;
use courier_database::{
    CreateTopicRequest, CreateUserRequest, MessageView, MessagingError, Topic, TopicRepository,
    User, UserLookup, UserRepository,
};
use courier_messaging::{DeliveryService, Destination, HistoryService, SendRequest, UploadedFile};

#[derive(Clone)]
pub struct AppState {
    pool: SqlitePool,
    delivery: Arc<DeliveryService>,
    history: Arc<HistoryService>,
    max_attachments: usize,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: &AppConfig) -> Self {
        Self {
            delivery: Arc::new(DeliveryService::new(pool.clone(), &config.storage)),
            history: Arc::new(HistoryService::new(
                pool.clone(),
                config.history.default_limit,
            )),
            max_attachments: config.storage.max_attachments,
            pool,
        }
    }

    async fn authenticate(&self, headers: &HeaderMap) -> Result<User, ApiError> {
        let token = require_bearer(headers)?;
        UserRepository::new(self.pool.clone())
            .find_by_token(&token)
            .await?
            .ok_or(MessagingError::Unauthorized)
            .map_err(ApiError::from)
    }
}

/// Build the application router over the given state.
pub fn build_router(state: AppState, attachments_dir: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/api/users", post(create_user).get(list_users))
        .route("/api/topics", post(create_topic).get(list_topics))
        .route("/api/topics/:id", get(get_topic).delete(delete_topic))
        .route("/api/messages", post(send_message))
        .route("/api/messages/topic/:name", get(topic_history))
        .route("/api/messages/user/:name", get(direct_history))
        .nest_service(
            "/static/attachments",
            ServeDir::new(attachments_dir.to_string()),
        )
        .with_state(state)
        .layer(cors)
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<MessagingError> for ApiError {
    fn from(value: MessagingError) -> Self {
        let status = match &value {
            MessagingError::Validation(_)
            | MessagingError::AmbiguousDestination
            | MessagingError::MissingDestination
            | MessagingError::TooManyAttachments { .. } => StatusCode::BAD_REQUEST,
            MessagingError::DestinationNotFound(_)
            | MessagingError::TopicNotFound
            | MessagingError::UserNotFound => StatusCode::NOT_FOUND,
            MessagingError::TopicExists(_)
            | MessagingError::TopicNotEmpty
            | MessagingError::UserExists
            | MessagingError::ConversationExists => StatusCode::CONFLICT,
            MessagingError::Unauthorized => StatusCode::UNAUTHORIZED,
            MessagingError::ConflictRetryExhausted
            | MessagingError::StorageError(_)
            | MessagingError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %value, "internal error");
        }

        Self::new(status, value.to_string())
    }
}

fn require_bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("missing authorization header"))?;

    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or("");
    if !scheme.eq_ignore_ascii_case("Bearer") {
        return Err(ApiError::unauthorized("invalid authorization scheme"));
    }

    let token = parts.next().unwrap_or("");
    if token.is_empty() {
        return Err(ApiError::unauthorized("missing bearer token"));
    }

    Ok(token.to_string())
}

#[derive(Debug, Deserialize)]
struct SendQuery {
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    count: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SendResponse {
    msg: String,
    message_id: String,
    destination_id: String,
    attachments: Vec<String>,
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SendQuery>,
    mut multipart: Multipart,
) -> Result<Json<SendResponse>, ApiError> {
    let caller = state.authenticate(&headers).await?;

    let destination = Destination::from_selectors(query.topic.as_deref(), query.user.as_deref())?;

    let mut text = String::new();
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("text") => {
                text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid text field: {e}")))?;
            }
            Some("attachments") => {
                let filename = field.file_name().unwrap_or("attachment").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("invalid attachment: {e}")))?;
                files.push(UploadedFile { filename, data });
            }
            _ => {}
        }
    }

    if text.trim().is_empty() {
        return Err(ApiError::bad_request("text is required"));
    }
    if files.len() > state.max_attachments {
        return Err(MessagingError::TooManyAttachments {
            given: files.len(),
            limit: state.max_attachments,
        }
        .into());
    }

    let receipt = state
        .delivery
        .send(&SendRequest { text, files }, &destination, caller.id)
        .await?;

    Ok(Json(SendResponse {
        msg: "Message created".to_string(),
        message_id: receipt.message_id,
        destination_id: receipt.destination_id,
        attachments: receipt.attachment_urls,
    }))
}

async fn topic_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    state.authenticate(&headers).await?;
    let messages = state.history.topic_history(&name, query.count).await?;
    Ok(Json(messages))
}

async fn direct_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let caller = state.authenticate(&headers).await?;
    let messages = state
        .history
        .direct_history(caller.id, &name, query.count)
        .await?;
    Ok(Json(messages))
}

#[derive(Debug, Deserialize)]
struct CreateTopicBody {
    name: String,
    description: String,
    users: Vec<String>,
}

#[derive(Debug, Serialize)]
struct TopicResponse {
    id: String,
    name: String,
    description: String,
    member_count: i64,
    message_count: i64,
}

impl From<Topic> for TopicResponse {
    fn from(topic: Topic) -> Self {
        Self {
            id: topic.public_id,
            name: topic.name,
            description: topic.description,
            member_count: topic.member_count,
            message_count: topic.message_count,
        }
    }
}

async fn create_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateTopicBody>,
) -> Result<Json<TopicResponse>, ApiError> {
    state.authenticate(&headers).await?;

    if body.name.trim().is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if body.description.trim().is_empty() {
        return Err(ApiError::bad_request("description is required"));
    }

    let mut members = body.users.clone();
    members.sort();
    members.dedup();
    if members.len() < 2 {
        return Err(ApiError::bad_request("at least 2 distinct users are required"));
    }

    let users = UserRepository::new(state.pool.clone());
    let mut member_ids = Vec::with_capacity(members.len());
    for public_id in &members {
        let user = users
            .find(&UserLookup::PublicId(public_id.clone()))
            .await?
            .ok_or(MessagingError::UserNotFound)?;
        member_ids.push(user.id);
    }

    let topic = TopicRepository::new(state.pool.clone())
        .create(
            &CreateTopicRequest {
                name: body.name.trim().to_string(),
                description: body.description.trim().to_string(),
                members,
            },
            &member_ids,
        )
        .await?;

    Ok(Json(topic.into()))
}

async fn list_topics(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<TopicResponse>>, ApiError> {
    state.authenticate(&headers).await?;
    let topics = TopicRepository::new(state.pool.clone()).list().await?;
    Ok(Json(topics.into_iter().map(TopicResponse::from).collect()))
}

async fn get_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<TopicResponse>, ApiError> {
    state.authenticate(&headers).await?;
    let topic = TopicRepository::new(state.pool.clone())
        .find_by_public_id(&id)
        .await?
        .ok_or(MessagingError::TopicNotFound)?;
    Ok(Json(topic.into()))
}

#[derive(Debug, Serialize)]
struct DeletedResponse {
    msg: String,
}

async fn delete_topic(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeletedResponse>, ApiError> {
    state.authenticate(&headers).await?;
    TopicRepository::new(state.pool.clone()).delete(&id).await?;
    Ok(Json(DeletedResponse {
        msg: "Topic deleted".to_string(),
    }))
}

#[derive(Debug, Deserialize)]
struct CreateUserBody {
    name: String,
    username: String,
    email: String,
}

#[derive(Debug, Serialize)]
struct CreatedUserResponse {
    id: String,
    name: String,
    username: String,
    email: String,
    api_token: String,
}

#[derive(Debug, Serialize)]
struct UserResponse {
    id: String,
    name: String,
    username: String,
    email: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.public_id,
            name: user.name,
            username: user.username,
            email: user.email,
        }
    }
}

async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<Json<CreatedUserResponse>, ApiError> {
    if body.name.trim().is_empty() || body.username.trim().is_empty() {
        return Err(ApiError::bad_request("name and username are required"));
    }
    if !body.email.contains('@') {
        return Err(ApiError::bad_request("email must be valid"));
    }

    let (user, api_token) = UserRepository::new(state.pool.clone())
        .create(&CreateUserRequest {
            name: body.name.trim().to_string(),
            username: body.username.trim().to_string(),
            email: body.email.trim().to_string(),
        })
        .await?;

    Ok(Json(CreatedUserResponse {
        id: user.public_id,
        name: user.name,
        username: user.username,
        email: user.email,
        api_token,
    }))
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    state.authenticate(&headers).await?;
    let users = UserRepository::new(state.pool.clone()).list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}
