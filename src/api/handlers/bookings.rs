use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::application::booking_service;
use crate::domain::{ArticleId, BookingId, UserId, commands::*};

use super::super::{
    auth::Caller,
    error::ApiError,
    types::{
        ArticleForUserRequest, BookingCreatedResponse, BookingResponse, Page, PageQuery,
        PageWindow,
    },
};
use super::AppState;

/// POST /bookings - 資料を予約
///
/// 市民は自分自身の予約のみ登録できる。
pub async fn register_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<ArticleForUserRequest>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), ApiError> {
    let user_id = UserId::from_uuid(req.user_id);
    caller.require_self_or_admin(user_id)?;

    let cmd = RegisterBooking {
        user_id,
        article_id: ArticleId::from_uuid(req.article_id),
        booked_at: Utc::now(),
    };
    let booking_id = booking_service::register_booking(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            booking_id: booking_id.value(),
        }),
    ))
}

/// GET /bookings/:id - 予約を取得
///
/// 期限の検証は保存を伴うため、所有者の確認を先に行う。
pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = BookingId::from_uuid(booking_id);

    let owner = booking_service::get_booking_owner(&state.service_deps, booking_id).await?;
    caller.require_self_or_admin(owner)?;

    let booking =
        booking_service::get_booking_info(&state.service_deps, booking_id, Utc::now()).await?;
    Ok(Json(booking.into()))
}

/// POST /bookings/:id/cancel - 予約を取り消す
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<BookingResponse>, ApiError> {
    let booking_id = BookingId::from_uuid(booking_id);

    // 1. 所有者の確認
    let owner = booking_service::get_booking_owner(&state.service_deps, booking_id).await?;
    caller.require_self_or_admin(owner)?;

    // 2. 取り消し
    booking_service::cancel_booking(&state.service_deps, CancelBooking { booking_id }).await?;

    let booking =
        booking_service::get_booking_info(&state.service_deps, booking_id, Utc::now()).await?;
    Ok(Json(booking.into()))
}

/// GET /users/:id/bookings - 利用者の予約一覧
pub async fn list_user_bookings(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<BookingResponse>>, ApiError> {
    query.validate()?;
    let user_id = UserId::from_uuid(user_id);
    caller.require_self_or_admin(user_id)?;

    let total = booking_service::count_bookings_by_user(&state.service_deps, user_id).await?;
    let window = PageWindow::resolve(query.page_number, query.results_per_page, total);

    let bookings = booking_service::get_bookings_by_user(
        &state.service_deps,
        user_id,
        window.offset(),
        window.limit(),
        Utc::now(),
    )
    .await?;

    Ok(Json(
        window.into_page(bookings.into_iter().map(BookingResponse::from).collect()),
    ))
}
