use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::domain::{self, Article, ArticleId, ArticleKind, Booking, Loan, LoanState, commands::*};
use crate::ports::ArticleCriteria;

use super::dependencies::ServiceDependencies;
use super::errors::{ApplicationError, Result};
use super::refresh::{refresh_booking, refresh_loan};

/// 資料と、それに現在紐づいている予約・貸出
#[derive(Debug, Clone)]
pub struct ArticleInfo {
    pub article: Article,
    pub booking: Option<Booking>,
    pub loan: Option<Loan>,
}

/// 種別ごとの識別子と必須項目の確認
fn check_kind(kind: &ArticleKind) -> Result<()> {
    let (identifier, secondary, secondary_name) = match kind {
        ArticleKind::Book { isbn, author } => (isbn, Some(author), "Author"),
        ArticleKind::Magazine { issn, .. } => (issn, None, "Issue Number"),
        ArticleKind::MovieDvd { isan, director } => (isan, Some(director), "Director"),
    };

    if identifier.trim().is_empty() {
        return Err(ApplicationError::InvalidArgument(
            "Article identifier is required".to_string(),
        ));
    }
    if secondary.is_some_and(|value| value.trim().is_empty()) {
        return Err(ApplicationError::InvalidArgument(format!(
            "{} is required",
            secondary_name
        )));
    }
    Ok(())
}

/// 資料を登録する（状態はAVAILABLE）
pub async fn add_article(deps: &ServiceDependencies, cmd: AddArticle) -> Result<ArticleId> {
    check_kind(&cmd.kind)?;

    let article = domain::create_article(cmd.details, cmd.kind);

    let mut uow = deps.store.begin().await?;
    uow.save_article(&article).await?;
    uow.commit().await?;

    info!(
        article_id = %article.article_id,
        article_type = article.kind.article_type().as_str(),
        title = %article.details.title,
        "Article added"
    );

    Ok(article.article_id)
}

/// 資料を更新する
///
/// 種別の変更は不可。書誌情報の更新と状態の変更は独立して扱い、
/// 状態の変更が拒否されても書誌情報の更新は保存したうえで
/// `InvalidStateTransition`を返す。
pub async fn update_article(deps: &ServiceDependencies, cmd: UpdateArticle) -> Result<()> {
    check_kind(&cmd.kind)?;

    let mut uow = deps.store.begin().await?;

    let article = uow
        .find_article(cmd.article_id)
        .await?
        .ok_or(ApplicationError::ArticleNotFound)?;

    // 1. 書誌情報の更新
    let updated = domain::update_fields(&article, cmd.details, cmd.kind)?;

    // 2. 状態の変更
    let (updated, rejected) = match cmd.state {
        None => (updated, None),
        Some(requested) => match domain::change_state(&updated, requested) {
            Ok(changed) => (changed, None),
            Err(e) => (updated, Some(e)),
        },
    };

    uow.save_article(&updated).await?;
    uow.commit().await?;

    if let Some(e) = rejected {
        warn!(
            article_id = %updated.article_id,
            current = e.current.as_str(),
            requested = e.requested.as_str(),
            "Article state change rejected"
        );
        return Err(e.into());
    }

    info!(
        article_id = %updated.article_id,
        state = updated.state.as_str(),
        "Article updated"
    );

    Ok(())
}

/// 資料を削除する
///
/// ビジネスルール：
/// - 貸出中（ONLOAN / ONLOANBOOKED）は削除できない
/// - 有効な予約が残っていれば強制的に取り消してから削除する
pub async fn remove_article(deps: &ServiceDependencies, cmd: RemoveArticle) -> Result<()> {
    let mut uow = deps.store.begin().await?;

    let article = uow
        .find_article(cmd.article_id)
        .await?
        .ok_or(ApplicationError::ArticleNotFound)?;

    // 延滞でUNAVAILABLEになった資料にも待ちの予約が残っていることがある
    let active_booking = match article.state {
        domain::ArticleState::OnLoan | domain::ArticleState::OnLoanBooked => None,
        _ => uow.find_active_booking(article.article_id).await?,
    };

    let cancelled = domain::prepare_removal(&article, active_booking.as_ref())?;
    if let Some(booking) = &cancelled {
        uow.save_booking(booking).await?;
    }

    uow.delete_article(&article).await?;
    uow.commit().await?;

    info!(
        article_id = %article.article_id,
        cancelled_booking = ?cancelled.as_ref().map(|b| b.booking_id),
        "Article removed"
    );

    Ok(())
}

/// 資料の詳細（現在の予約・貸出を含む）
///
/// 予約・貸出はそれぞれ遅延検証してから返す。
pub async fn get_article_info_extended(
    deps: &ServiceDependencies,
    article_id: ArticleId,
    now: DateTime<Utc>,
) -> Result<ArticleInfo> {
    let mut uow = deps.store.begin().await?;

    let article = uow
        .find_article(article_id)
        .await?
        .ok_or(ApplicationError::ArticleNotFound)?;

    let booking = if article.state.is_booked() {
        match uow.find_active_booking(article_id).await? {
            Some(booking) => Some(refresh_booking(uow.as_mut(), booking, now).await?),
            None => None,
        }
    } else {
        None
    };

    let loan = if article.state.is_on_loan() {
        match uow.find_current_loan(article_id).await? {
            Some(loan) => Some(refresh_loan(uow.as_mut(), loan, now).await?),
            None => None,
        }
    } else {
        None
    };

    // 検証で状態が変わっている可能性があるため読み直す
    let article = uow
        .find_article(article_id)
        .await?
        .ok_or(ApplicationError::ArticleNotFound)?;

    uow.commit().await?;

    Ok(ArticleInfo {
        article,
        booking: booking.filter(|b| b.is_active()),
        loan: loan.filter(|l| l.state != LoanState::Returned),
    })
}

/// 資料を検索する
///
/// 出版年の降順、タイトルの昇順。0件は`NoResultsFound`。
pub async fn search_articles(
    deps: &ServiceDependencies,
    criteria: &ArticleCriteria,
    offset: i64,
    limit: i64,
) -> Result<Vec<Article>> {
    let mut uow = deps.store.begin().await?;

    let articles = uow.search_articles(criteria, offset, limit).await?;
    if articles.is_empty() {
        return Err(ApplicationError::NoResultsFound(
            "The search has given 0 results!".to_string(),
        ));
    }

    Ok(articles)
}

/// 検索条件に一致する資料の件数
pub async fn count_articles(
    deps: &ServiceDependencies,
    criteria: &ArticleCriteria,
) -> Result<i64> {
    let mut uow = deps.store.begin().await?;
    Ok(uow.count_articles(criteria).await?)
}
