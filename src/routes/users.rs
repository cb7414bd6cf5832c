use actix_web::{http::header, web, HttpRequest, HttpResponse};
use validator::Validate;

use crate::error::MatchError;
use crate::models::{
    HealthResponse, LoginRequest, MatchesResponse, NewUser, NextCandidateResponse,
    ProfileEditRequest, ProfileUpdate, PublicUser, RateResponse, RegisterRequest, UserId,
};
use crate::routes::AppState;
use crate::services::credentials::{hash_password, verify_password};

type HandlerResult = Result<HttpResponse, MatchError>;

/// Configure user, rating and match routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/auth/register", web::post().to(register))
        .route("/auth/login", web::post().to(login))
        .route("/users", web::get().to(list_users))
        .route("/users/{id}", web::get().to(get_profile))
        .route("/users/{id}", web::put().to(edit_profile))
        .route("/users/{id}", web::delete().to(delete_profile))
        .route("/users/{id}/image", web::put().to(upload_image))
        .route("/users/{id}/next", web::get().to(next_candidate))
        .route("/users/{id}/like/{target}", web::post().to(like))
        .route("/users/{id}/dislike/{target}", web::post().to(dislike))
        .route("/users/{id}/matches", web::get().to(get_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let store_healthy = state.engine.store().health_check().await.unwrap_or(false);

    let status = if store_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        connections: state.registry.len().await,
        timestamp: chrono::Utc::now(),
    })
}

/// Register a new user
///
/// POST /api/v1/auth/register
///
/// ```json
/// { "name": "string", "password": "string", "age": 25, "bio": "string" }
/// ```
///
/// New users start without an image; it is set through `PUT /users/{id}/image`.
async fn register(state: web::Data<AppState>, req: web::Json<RegisterRequest>) -> HandlerResult {
    req.validate()?;
    let req = req.into_inner();

    if state.engine.find_user_by_name(&req.name).await?.is_some() {
        return Err(MatchError::Conflict(format!("name '{}' is taken", req.name)));
    }

    let user = state
        .engine
        .create_user(NewUser {
            name: req.name,
            age: req.age,
            bio: req.bio,
            image_url: String::new(),
            password_hash: hash_password(&req.password),
        })
        .await?;

    Ok(HttpResponse::Created().json(user.public()))
}

/// Log in by name and password
///
/// POST /api/v1/auth/login
///
/// The returned `id` is the identity passed on every later call.
async fn login(state: web::Data<AppState>, req: web::Json<LoginRequest>) -> HandlerResult {
    req.validate()?;

    let user = state
        .engine
        .find_user_by_name(&req.name)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("user '{}'", req.name)))?;

    if !verify_password(&req.password, &user.password_hash) {
        tracing::info!("Rejected login for user {}", user.id);
        return Err(MatchError::Unauthorized("invalid password".into()));
    }

    Ok(HttpResponse::Ok().json(user.public()))
}

/// GET /api/v1/users
async fn list_users(state: web::Data<AppState>) -> HandlerResult {
    let users: Vec<PublicUser> = state
        .engine
        .list_users()
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();
    Ok(HttpResponse::Ok().json(users))
}

/// GET /api/v1/users/{id}
async fn get_profile(state: web::Data<AppState>, path: web::Path<UserId>) -> HandlerResult {
    let id = path.into_inner();
    let user = state
        .engine
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("user {}", id)))?;
    Ok(HttpResponse::Ok().json(user.public()))
}

/// Edit a profile and push the new version to every live client
///
/// PUT /api/v1/users/{id}
async fn edit_profile(
    state: web::Data<AppState>,
    path: web::Path<UserId>,
    req: web::Json<ProfileEditRequest>,
) -> HandlerResult {
    req.validate()?;
    let id = path.into_inner();
    let req = req.into_inner();

    let user = state
        .engine
        .update_user(
            id,
            ProfileUpdate {
                name: req.name,
                age: req.age,
                bio: req.bio,
                image_url: None,
            },
        )
        .await?;

    state.notifier.profile_changed(id).await;
    Ok(HttpResponse::Ok().json(user.public()))
}

/// Replace the profile image with the raw request body
///
/// PUT /api/v1/users/{id}/image
///
/// The body is forwarded to the upload service first; if that fails the
/// profile is left untouched.
async fn upload_image(
    state: web::Data<AppState>,
    path: web::Path<UserId>,
    http_req: HttpRequest,
    body: web::Bytes,
) -> HandlerResult {
    let id = path.into_inner();
    let user = state
        .engine
        .get_user_by_id(id)
        .await?
        .ok_or_else(|| MatchError::NotFound(format!("user {}", id)))?;

    if body.is_empty() {
        return Err(MatchError::Validation("image body is empty".into()));
    }

    let content_type = http_req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let image_url = state
        .uploads
        .upload_image(id, &content_type, body.to_vec())
        .await?;

    let updated = state
        .engine
        .update_user(
            id,
            ProfileUpdate {
                name: user.name,
                age: user.age,
                bio: user.bio,
                image_url: Some(image_url),
            },
        )
        .await?;

    state.notifier.profile_changed(id).await;
    Ok(HttpResponse::Ok().json(updated.public()))
}

/// Delete a profile with all its ratings and push the new roster
///
/// DELETE /api/v1/users/{id}
async fn delete_profile(state: web::Data<AppState>, path: web::Path<UserId>) -> HandlerResult {
    let id = path.into_inner();
    state.engine.delete_user(id).await?;

    state.notifier.roster_changed().await;
    Ok(HttpResponse::NoContent().finish())
}

/// Next profile to show
///
/// GET /api/v1/users/{id}/next
///
/// `candidate` is `null` once the viewer has rated everyone.
async fn next_candidate(state: web::Data<AppState>, path: web::Path<UserId>) -> HandlerResult {
    let viewer_id = path.into_inner();
    let candidate = state.engine.select_candidate(viewer_id).await?;

    Ok(HttpResponse::Ok().json(NextCandidateResponse {
        candidate: candidate.map(PublicUser::from),
    }))
}

/// POST /api/v1/users/{id}/like/{target}
async fn like(state: web::Data<AppState>, path: web::Path<(UserId, UserId)>) -> HandlerResult {
    let (from, to) = path.into_inner();
    rate(&state, from, to, true).await
}

/// POST /api/v1/users/{id}/dislike/{target}
async fn dislike(state: web::Data<AppState>, path: web::Path<(UserId, UserId)>) -> HandlerResult {
    let (from, to) = path.into_inner();
    rate(&state, from, to, false).await
}

async fn rate(state: &AppState, from: UserId, to: UserId, liked: bool) -> HandlerResult {
    let outcome = state.engine.record_rating(from, to, liked).await?;

    // A repeated rating changes nothing, so there is nothing to announce.
    if outcome.is_recorded() {
        state.notifier.roster_changed().await;
    }

    Ok(HttpResponse::Ok().json(RateResponse::from(outcome)))
}

/// GET /api/v1/users/{id}/matches
async fn get_matches(state: web::Data<AppState>, path: web::Path<UserId>) -> HandlerResult {
    let user_id = path.into_inner();
    let matches: Vec<PublicUser> = state
        .engine
        .get_matches(user_id)
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();

    Ok(HttpResponse::Ok().json(MatchesResponse {
        user_id,
        count: matches.len(),
        matches,
    }))
}
