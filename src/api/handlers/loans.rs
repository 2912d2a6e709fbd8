use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::application::loan_service;
use crate::domain::{ArticleId, LoanId, UserId, commands::*};

use super::super::{
    auth::Caller,
    error::ApiError,
    types::{
        ArticleForUserRequest, LoanCreatedResponse, LoanResponse, Page, PageQuery, PageWindow,
    },
};
use super::AppState;

/// POST /loans - 資料を貸し出す（管理者）
///
/// 強制されるビジネスルール:
/// - 利用者・資料が存在すること
/// - 予約済みの資料は予約者本人にのみ貸し出せる
/// - 貸出中・利用不可の資料は貸し出せない
pub async fn register_loan(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<ArticleForUserRequest>,
) -> Result<(StatusCode, Json<LoanCreatedResponse>), ApiError> {
    caller.require_admin()?;

    let cmd = RegisterLoan {
        user_id: UserId::from_uuid(req.user_id),
        article_id: ArticleId::from_uuid(req.article_id),
        loaned_at: Utc::now(),
    };
    let loan_id = loan_service::register_loan(&state.service_deps, cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(LoanCreatedResponse {
            loan_id: loan_id.value(),
        }),
    ))
}

/// GET /loans/:id - 貸出を取得
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan_id = LoanId::from_uuid(loan_id);

    // 延滞判定は保存を伴うため、所有者の確認を先に行う
    let owner = loan_service::get_loan_owner(&state.service_deps, loan_id).await?;
    caller.require_self_or_admin(owner)?;

    let loan = loan_service::get_loan_info(&state.service_deps, loan_id, Utc::now()).await?;
    Ok(Json(loan.into()))
}

/// POST /loans/:id/return - 返却を登録（管理者）
///
/// 延滞中の貸出も返却できる。
pub async fn register_return(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    caller.require_admin()?;

    let loan_id = LoanId::from_uuid(loan_id);
    let cmd = RegisterReturn {
        loan_id,
        returned_at: Utc::now(),
    };
    loan_service::register_return(&state.service_deps, cmd).await?;

    let loan = loan_service::get_loan_info(&state.service_deps, loan_id, Utc::now()).await?;
    Ok(Json(loan.into()))
}

/// POST /loans/:id/extend - 貸出を延長
///
/// 強制されるビジネスルール:
/// - 貸出がACTIVEであること
/// - 延長は1回まで
/// - 他の利用者が予約していないこと
pub async fn extend_loan(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(loan_id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan_id = LoanId::from_uuid(loan_id);

    let owner = loan_service::get_loan_owner(&state.service_deps, loan_id).await?;
    caller.require_self_or_admin(owner)?;

    let cmd = ExtendLoan {
        loan_id,
        extended_at: Utc::now(),
    };
    loan_service::extend_loan(&state.service_deps, cmd).await?;

    let loan = loan_service::get_loan_info(&state.service_deps, loan_id, Utc::now()).await?;
    Ok(Json(loan.into()))
}

/// GET /users/:id/loans - 利用者の貸出一覧
pub async fn list_user_loans(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(user_id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<LoanResponse>>, ApiError> {
    query.validate()?;
    let user_id = UserId::from_uuid(user_id);
    caller.require_self_or_admin(user_id)?;

    let total = loan_service::count_loans_by_user(&state.service_deps, user_id).await?;
    let window = PageWindow::resolve(query.page_number, query.results_per_page, total);

    let loans = loan_service::get_loans_by_user(
        &state.service_deps,
        user_id,
        window.offset(),
        window.limit(),
        Utc::now(),
    )
    .await?;

    Ok(Json(
        window.into_page(loans.into_iter().map(LoanResponse::from).collect()),
    ))
}
