use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::application::article_service;
use crate::domain::{ArticleId, commands::*};

use super::super::{
    auth::Caller,
    error::ApiError,
    types::{
        ArticleCreatedResponse, ArticleInfoResponse, ArticleRequest, ArticleResponse,
        ArticleSearchQuery, Page, PageWindow, UpdateArticleRequest,
    },
};
use super::AppState;

/// POST /articles - 資料を登録（管理者）
pub async fn add_article(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Json(req): Json<ArticleRequest>,
) -> Result<(StatusCode, Json<ArticleCreatedResponse>), ApiError> {
    caller.require_admin()?;
    req.validate()?;

    let (details, kind) = req.into_parts();
    let article_id =
        article_service::add_article(&state.service_deps, AddArticle { details, kind }).await?;

    Ok((
        StatusCode::CREATED,
        Json(ArticleCreatedResponse {
            article_id: article_id.value(),
        }),
    ))
}

/// PUT /articles/:id - 資料を更新（管理者）
///
/// 状態の変更が拒否された場合も書誌情報の更新は保存されたうえで400を返す。
pub async fn update_article(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(article_id): Path<Uuid>,
    Json(req): Json<UpdateArticleRequest>,
) -> Result<Json<ArticleInfoResponse>, ApiError> {
    caller.require_admin()?;
    req.validate()?;

    let article_id = ArticleId::from_uuid(article_id);
    let (details, kind) = req.article.into_parts();
    let cmd = UpdateArticle {
        article_id,
        details,
        kind,
        state: req.requested_state,
    };
    article_service::update_article(&state.service_deps, cmd).await?;

    let info =
        article_service::get_article_info_extended(&state.service_deps, article_id, Utc::now())
            .await?;
    Ok(Json(info.into()))
}

/// DELETE /articles/:id - 資料を削除（管理者）
pub async fn remove_article(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(article_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    caller.require_admin()?;

    let cmd = RemoveArticle {
        article_id: ArticleId::from_uuid(article_id),
    };
    article_service::remove_article(&state.service_deps, cmd).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /articles/:id - 資料の詳細（現在の予約・貸出を含む）
pub async fn get_article(
    State(state): State<Arc<AppState>>,
    Path(article_id): Path<Uuid>,
) -> Result<Json<ArticleInfoResponse>, ApiError> {
    let info = article_service::get_article_info_extended(
        &state.service_deps,
        ArticleId::from_uuid(article_id),
        Utc::now(),
    )
    .await?;

    Ok(Json(info.into()))
}

/// GET /articles - 資料の検索
///
/// クエリパラメータ:
/// - isbn / issn / isan: 指定された場合は識別子の完全一致のみ
/// - title, genre, publisher, year_edition, author, issue_number, director: AND条件
/// - page_number, results_per_page: ページ指定
pub async fn search_articles(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ArticleSearchQuery>,
) -> Result<Json<Page<ArticleResponse>>, ApiError> {
    query.validate()?;

    let criteria = query.criteria();
    let total = article_service::count_articles(&state.service_deps, &criteria).await?;
    let window = PageWindow::resolve(query.page_number, query.results_per_page, total);

    let articles = article_service::search_articles(
        &state.service_deps,
        &criteria,
        window.offset(),
        window.limit(),
    )
    .await?;

    Ok(Json(
        window.into_page(articles.into_iter().map(ArticleResponse::from).collect()),
    ))
}
