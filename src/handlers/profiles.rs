//! Profile HTTP handlers.
//!
//! - PUT /api/v1/users/{user_id}/profile - Create or replace the profile
//! - GET /api/v1/users/{user_id}/profile - Read the profile back

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    routing::get,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::user::{ProfileResponse, UpdateProfileRequest},
    services::profile_service::ProfileService,
};

pub fn routes(service: ProfileService) -> Router {
    Router::new()
        .route(
            "/api/v1/users/{user_id}/profile",
            get(get_profile).put(update_profile),
        )
        .with_state(service)
}

/// Create or replace the user's profile.
///
/// # Request Body
///
/// ```json
/// {
///   "display_name": "Nguyen Van A",
///   "avatar_url": null,
///   "phone_number": "+84901234567",
///   "national_id": "079090001234",
///   "birth_year": 1990,
///   "gender": "MALE",
///   "team": "BACK_END"
/// }
/// ```
///
/// # Response
///
/// - **200 OK**: the stored profile
/// - **400**: missing or malformed field, unknown gender or team
/// - **404**: user not found
/// - **409**: national ID registered to another user
pub async fn update_profile(
    State(service): State<ProfileService>,
    Path(user_id): Path<Uuid>,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<Json<ProfileResponse>, AppError> {
    let Json(request) =
        payload.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;
    let profile = service.update_profile(user_id, request).await?;
    Ok(Json(profile.into()))
}

pub async fn get_profile(
    State(service): State<ProfileService>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ProfileResponse>, AppError> {
    Ok(Json(service.get_profile(user_id).await?.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::Team, repository::memory::MemoryStore,
        services::account_service::tests::seed_user,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use tower::ServiceExt;

    const BODY: &str = r#"{
        "display_name": "Vo Thi F",
        "phone_number": "0987654321",
        "national_id": "079096000001",
        "birth_year": 1996,
        "gender": "FEMALE",
        "team": "BRSE"
    }"#;

    async fn send(app: Router, method: &str, uri: &str, body: Option<&str>) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        app.oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn put_then_get_returns_profile() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, false).await;
        let app = routes(ProfileService::from_store(store));
        let uri = format!("/api/v1/users/{user_id}/profile");

        let response = send(app.clone(), "PUT", &uri, Some(BODY)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(app, "GET", &uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: ProfileResponse = serde_json::from_value(json_body(response).await).unwrap();
        assert_eq!(body.user_id, user_id);
        assert_eq!(body.team, Team::Brse);
        assert_eq!(body.avatar_url, None);
    }

    #[tokio::test]
    async fn unknown_team_is_bad_request() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, false).await;
        let app = routes(ProfileService::from_store(store));

        let response = send(
            app,
            "PUT",
            &format!("/api/v1/users/{user_id}/profile"),
            Some(BODY.replace("BRSE", "DEVOPS").as_str()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"]["code"], "invalid_request");
    }

    #[tokio::test]
    async fn taken_national_id_is_conflict() {
        let store = MemoryStore::new();
        let owner = seed_user(&store, false).await;
        let other = seed_user(&store, false).await;
        let app = routes(ProfileService::from_store(store));

        let first = send(
            app.clone(),
            "PUT",
            &format!("/api/v1/users/{owner}/profile"),
            Some(BODY),
        )
        .await;
        assert_eq!(first.status(), StatusCode::OK);

        let second = send(
            app,
            "PUT",
            &format!("/api/v1/users/{other}/profile"),
            Some(BODY),
        )
        .await;
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(json_body(second).await["error"]["code"], "national_id_taken");
    }

    #[tokio::test]
    async fn missing_profile_is_unprocessable() {
        let store = MemoryStore::new();
        let user_id = seed_user(&store, false).await;
        let app = routes(ProfileService::from_store(store));

        let response = send(app, "GET", &format!("/api/v1/users/{user_id}/profile"), None).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(json_body(response).await["error"]["code"], "profile_incomplete");
    }
}
