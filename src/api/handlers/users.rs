use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::application::user_service;
use crate::domain::{UserId, commands::*};

use super::super::{
    auth::Caller,
    error::ApiError,
    types::{
        DashboardResponse, Page, PageWindow, UserCreatedResponse, UserRequest, UserResponse,
        UserSearchQuery,
    },
};
use super::AppState;

/// POST /users - 利用者を登録（役割は常にCITIZEN）
pub async fn add_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UserRequest>,
) -> Result<(StatusCode, Json<UserCreatedResponse>), ApiError> {
    req.validate()?;

    let user_id = user_service::add_user(
        &state.service_deps,
        AddUser {
            profile: req.into(),
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserCreatedResponse {
            user_id: user_id.value(),
        }),
    ))
}

/// GET /users - 利用者の検索（管理者）
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Query(query): Query<UserSearchQuery>,
) -> Result<Json<Page<UserResponse>>, ApiError> {
    caller.require_admin()?;
    query.validate()?;

    let criteria = query.criteria();
    let total = user_service::count_users(&state.service_deps, &criteria).await?;
    let window = PageWindow::resolve(query.page_number, query.results_per_page, total);

    let users = user_service::search_users(
        &state.service_deps,
        &criteria,
        window.offset(),
        window.limit(),
    )
    .await?;

    Ok(Json(
        window.into_page(users.into_iter().map(UserResponse::from).collect()),
    ))
}

/// GET /users/:id
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id = UserId::from_uuid(user_id);
    caller.require_self_or_admin(user_id)?;

    let user = user_service::get_user(&state.service_deps, user_id).await?;
    Ok(Json(user.into()))
}

/// PUT /users/:id - プロフィールを更新
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    req.validate()?;
    let user_id = UserId::from_uuid(user_id);
    caller.require_self_or_admin(user_id)?;

    let cmd = UpdateUser {
        user_id,
        profile: req.into(),
    };
    user_service::update_user(&state.service_deps, cmd).await?;

    let user = user_service::get_user(&state.service_deps, user_id).await?;
    Ok(Json(user.into()))
}

/// GET /users/:id/dashboard - プロフィールと直近の予約・貸出
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DashboardResponse>, ApiError> {
    let user_id = UserId::from_uuid(user_id);
    caller.require_self_or_admin(user_id)?;

    let dashboard =
        user_service::get_user_dashboard(&state.service_deps, user_id, Utc::now()).await?;
    Ok(Json(dashboard.into()))
}
