use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use microcrm::api::AppState;
use microcrm::config::Config;
use std::sync::Arc;
use tower::ServiceExt;

async fn spawn_app_with_state() -> (Router, Arc<AppState>) {
    let mut config = Config::default();
    config.general.database_path = "sqlite::memory:".to_string();
    config.security.jwt_secret = "integration-test-secret".to_string();

    let state = microcrm::api::create_app_state_from_config(config)
        .await
        .expect("Failed to create app state");
    (microcrm::api::router(state.clone()), state)
}

async fn spawn_app() -> Router {
    spawn_app_with_state().await.0
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("Content-Type", "application/json")
        .body(Body::from(serde_json::to_string(body).unwrap()))
        .unwrap()
}

/// Register a user and log in, returning the session token.
async fn register_and_login(app: &Router, username: &str, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(post_json(
            "/register",
            &serde_json::json!({
                "username": username,
                "email": email,
                "password": "correct horse battery",
                "first_name": "Test",
                "last_name": "User"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Registration doubles as login: the response already carries a
    // usable session token alongside the user.
    let body = json_body(response).await;
    assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    assert_eq!(body["data"]["user"]["username"], username);

    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({
                "username": username,
                "password": "correct horse battery"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_and_login() {
    let app = spawn_app().await;

    let token = register_and_login(&app, "ada", "ada@example.com").await;
    assert!(!token.is_empty());

    // Wrong password
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({"username": "ada", "password": "nope nope nope"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Unknown user
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({"username": "ghost", "password": "whatever whatever"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_token_grants_access() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(post_json(
            "/register",
            &serde_json::json!({
                "username": "grace",
                "email": "grace@example.com",
                "password": "correct horse battery",
                "first_name": "Grace",
                "last_name": "Hopper"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let token = body["data"]["token"].as_str().unwrap().to_string();

    // The token from registration works without a separate login
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["username"], "grace");
}

#[tokio::test]
async fn test_inactive_user_cannot_login() {
    use microcrm::entities::users;
    use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter};

    let (app, state) = spawn_app_with_state().await;
    register_and_login(&app, "ada", "ada@example.com").await;

    // Deactivate the account behind the API's back
    let user = users::Entity::find()
        .filter(users::Column::Username.eq("ada"))
        .one(&state.store().conn)
        .await
        .unwrap()
        .unwrap();
    let mut active = user.into_active_model();
    active.status = Set("disabled".to_string());
    active.update(&state.store().conn).await.unwrap();

    // Correct credentials, but the account is no longer active
    let response = app
        .clone()
        .oneshot(post_json(
            "/login",
            &serde_json::json!({"username": "ada", "password": "correct horse battery"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let app = spawn_app().await;

    let payload = serde_json::json!({
        "username": "ada",
        "email": "ada@example.com",
        "password": "correct horse battery",
        "first_name": "Ada",
        "last_name": "Lovelace"
    });

    let response = app
        .clone()
        .oneshot(post_json("/register", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json("/register", &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_middleware_rejections() {
    let app = spawn_app().await;

    // No Authorization header
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Authorization header required");

    // Wrong scheme
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("Authorization", "Basic abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Bearer token required");

    // Garbage token
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("Authorization", "Bearer not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = json_body(response).await;
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_me_returns_current_user() {
    let app = spawn_app().await;
    let token = register_and_login(&app, "ada", "ada@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/me")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["data"]["username"], "ada");
    assert_eq!(body["data"]["email"], "ada@example.com");
    assert!(body["data"]["password_hash"].is_null());
}

#[tokio::test]
async fn test_contacts_crud_and_ownership() {
    let app = spawn_app().await;
    let token_a = register_and_login(&app, "ada", "ada@example.com").await;
    let token_b = register_and_login(&app, "bob", "bob@example.com").await;

    // Ada creates a contact
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/contacts")
                .header("Authorization", format!("Bearer {token_a}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"first_name": "Grace", "last_name": "Hopper"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let contact_id = body["data"]["id"].as_i64().unwrap();

    // Ada can fetch it
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/contacts/{contact_id}"))
                .header("Authorization", format!("Bearer {token_a}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Bob cannot see Ada's contact; 404 rather than 403
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/contacts/{contact_id}"))
                .header("Authorization", format!("Bearer {token_b}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Bob cannot delete it either
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/contacts/{contact_id}"))
                .header("Authorization", format!("Bearer {token_b}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Bob's list stays empty
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/contacts")
                .header("Authorization", format!("Bearer {token_b}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    // Ada deletes her contact
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/contacts/{contact_id}"))
                .header("Authorization", format!("Bearer {token_a}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/contacts/{contact_id}"))
                .header("Authorization", format!("Bearer {token_a}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_companies_ownership() {
    let app = spawn_app().await;
    let token_a = register_and_login(&app, "ada", "ada@example.com").await;
    let token_b = register_and_login(&app, "bob", "bob@example.com").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/companies")
                .header("Authorization", format!("Bearer {token_a}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"name": "Acme"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let company_id = body["data"]["id"].as_i64().unwrap();

    // Bob cannot update Ada's company
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/api/companies/{company_id}"))
                .header("Authorization", format!("Bearer {token_b}"))
                .header("Content-Type", "application/json")
                .body(Body::from(
                    serde_json::json!({"name": "Hijacked"}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Ada still sees the original name
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/companies/{company_id}"))
                .header("Authorization", format!("Bearer {token_a}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["data"]["name"], "Acme");
}

#[tokio::test]
async fn test_oidc_endpoints_unavailable_without_config() {
    let app = spawn_app().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/login/oidc")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/login/oidc/callback?code=abc&state=xyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_oidc_logout_unavailable_without_config() {
    let app = spawn_app().await;
    let token = register_and_login(&app, "ada", "ada@example.com").await;

    // Authenticated, but no provider is configured to log out of
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/logout/oidc")
                .header("Authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
