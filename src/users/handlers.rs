use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::state::AppState;
use crate::users::{
    dto::{CreateUserRequest, UpdateUserRequest, UserResponse},
    error::UserError,
    repo::{User, UserPatch},
    services::is_valid_email,
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), (StatusCode, String)> {
    let username = payload.username.trim();
    if username.is_empty() {
        warn!("empty username");
        return Err((StatusCode::BAD_REQUEST, "Username must not be empty".into()));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    match User::create(&state.db, username, &payload.email).await {
        Ok(user) => {
            info!(user_id = user.id, username = %user.username, "user created");
            Ok((StatusCode::CREATED, Json(user.into())))
        }
        Err(UserError::Conflict(msg)) => {
            warn!(username = %username, "create conflict: {msg}");
            Err((StatusCode::BAD_REQUEST, msg))
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            Err(internal())
        }
    }
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, (StatusCode, String)> {
    match User::list_all(&state.db).await {
        Ok(users) => Ok(Json(users.into_iter().map(Into::into).collect())),
        Err(e) => {
            error!(error = %e, "list users failed");
            Err(internal())
        }
    }
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    match User::find_by_id(&state.db, id).await {
        Ok(Some(user)) => Ok(Json(user.into())),
        Ok(None) => Err(not_found(id)),
        Err(e) => {
            error!(error = %e, id, "get user failed");
            Err(internal())
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, (StatusCode, String)> {
    if let Some(email) = payload.email.as_deref() {
        if !is_valid_email(email) {
            warn!(%email, "invalid email");
            return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
        }
    }

    let patch = UserPatch {
        username: payload.username,
        email: payload.email,
    };

    match User::update(&state.db, id, patch).await {
        Ok(Some(user)) => {
            info!(user_id = user.id, "user updated");
            Ok(Json(user.into()))
        }
        Ok(None) => Err(not_found(id)),
        Err(UserError::Conflict(msg)) => {
            warn!(id, "update conflict: {msg}");
            Err((StatusCode::BAD_REQUEST, msg))
        }
        Err(e) => {
            error!(error = %e, id, "update user failed");
            Err(internal())
        }
    }
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, (StatusCode, String)> {
    match User::delete(&state.db, id).await {
        Ok(true) => {
            info!(id, "user deleted");
            Ok(StatusCode::NO_CONTENT)
        }
        Ok(false) => Err(not_found(id)),
        Err(e) => {
            error!(error = %e, id, "delete user failed");
            Err(internal())
        }
    }
}

fn not_found(id: i64) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("User with id {id} not found"))
}

// Fatal store errors stay opaque to the client.
fn internal() -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::state::AppState;

    async fn app() -> axum::Router {
        super::user_routes().with_state(AppState::in_memory().await)
    }

    fn post_user(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_returns_201_with_user() {
        let app = app().await;

        let response = app
            .oneshot(post_user(r#"{"username": "alice", "email": "alice@example.com"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["username"], "alice");
        assert_eq!(body["email"], "alice@example.com");
        assert!(body["created_at"].is_string());
    }

    #[tokio::test]
    async fn create_rejects_invalid_input() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(post_user(r#"{"username": "", "email": "alice@example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(post_user(r#"{"username": "alice", "email": "not-an-email"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_conflict_returns_400_with_detail() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(post_user(r#"{"username": "alice", "email": "alice@example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(post_user(r#"{"username": "bob", "email": "alice@example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("email"), "got: {text}");
    }

    #[tokio::test]
    async fn list_returns_users_newest_first() {
        let app = app().await;

        for (u, e) in [("alice", "alice@example.com"), ("bob", "bob@example.com")] {
            let response = app
                .clone()
                .oneshot(post_user(&format!(
                    r#"{{"username": "{u}", "email": "{e}"}}"#
                )))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(Request::builder().uri("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body[0]["username"], "bob");
        assert_eq!(body[1]["username"], "alice");
    }

    #[tokio::test]
    async fn get_missing_user_is_404() {
        let app = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/users/999")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_merges_only_supplied_fields() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(post_user(r#"{"username": "alice", "email": "alice@example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/users/1")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username": "alice2"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["username"], "alice2");
        assert_eq!(body["email"], "alice@example.com");
    }

    #[tokio::test]
    async fn update_missing_user_is_404() {
        let app = app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("PUT")
                    .uri("/users/999")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"username": "ghost"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_then_delete_again() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(post_user(r#"{"username": "alice", "email": "alice@example.com"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let delete = || {
            Request::builder()
                .method("DELETE")
                .uri("/users/1")
                .body(Body::empty())
                .unwrap()
        };

        let response = app.clone().oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(delete()).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
