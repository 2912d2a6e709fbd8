use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{self, Article, Booking, Loan, LoanState};
use crate::ports::UnitOfWork;

use super::errors::{ApplicationError, Result};

// ============================================================================
// 遅延検証（読み取り時の期限切れ・延滞判定）
// ============================================================================

/// ACTIVEな予約を検証し、期限切れなら予約と資料を保存する
///
/// ACTIVE以外の予約はそのまま返す。
/// 資料の行を先にロックしてから予約を読み直す（ロック順は常に資料が先）。
/// 資料が削除済みなら予約だけを遷移させる。
pub(crate) async fn refresh_booking(
    uow: &mut dyn UnitOfWork,
    booking: Booking,
    now: DateTime<Utc>,
) -> Result<Booking> {
    if !booking.is_active() {
        return Ok(booking);
    }

    let article = uow.find_article(booking.article_id).await?;
    let booking = uow
        .find_booking(booking.booking_id)
        .await?
        .ok_or(ApplicationError::BookingNotFound)?;
    if !booking.is_active() {
        return Ok(booking);
    }

    let (validated, article_after) = match article {
        Some(article) => {
            let (validated, article) = domain::validate_booking(&booking, &article, now)?;
            (validated, Some(article))
        }
        None => (domain::expire_booking(&booking, now)?, None),
    };

    if validated.state != booking.state {
        debug!(
            booking_id = %validated.booking_id,
            article_id = %validated.article_id,
            article_state = ?article_after.as_ref().map(|a| a.state),
            "Booking expired"
        );
        uow.save_booking(&validated).await?;
        if let Some(article) = &article_after {
            uow.save_article(article).await?;
        }
    }

    Ok(validated)
}

/// ACTIVEな貸出を検証し、延滞なら貸出と資料を保存する
///
/// ACTIVE以外の貸出はそのまま返す。ロック順と削除済みの資料の扱いは
/// `refresh_booking`と同じ。
pub(crate) async fn refresh_loan(
    uow: &mut dyn UnitOfWork,
    loan: Loan,
    now: DateTime<Utc>,
) -> Result<Loan> {
    if loan.state != LoanState::Active {
        return Ok(loan);
    }

    let article = uow.find_article(loan.article_id).await?;
    let loan = uow
        .find_loan(loan.loan_id)
        .await?
        .ok_or(ApplicationError::LoanNotFound)?;
    if loan.state != LoanState::Active {
        return Ok(loan);
    }

    let (validated, article_after) = match article {
        Some(article) => {
            let (validated, article) = domain::validate_loan(&loan, &article, now)?;
            (validated, Some(article))
        }
        None => (domain::mark_overdue(&loan, now)?, None),
    };

    if validated.state != loan.state {
        debug!(
            loan_id = %validated.loan_id,
            article_id = %validated.article_id,
            "Loan became overdue"
        );
        uow.save_loan(&validated).await?;
        if let Some(article) = &article_after {
            uow.save_article(article).await?;
        }
    }

    Ok(validated)
}

/// 資料に紐づく予約・貸出を検証し、最新の資料を返す
///
/// 予約・貸出のワークフローは資料の状態で分岐するため、
/// 分岐の前に必ずこれを通して期限切れ・延滞を反映させる。
pub(crate) async fn refresh_article(
    uow: &mut dyn UnitOfWork,
    article: Article,
    now: DateTime<Utc>,
) -> Result<Article> {
    let mut article = article;

    if article.state.is_booked() {
        if let Some(booking) = uow.find_active_booking(article.article_id).await? {
            let (validated, updated) = domain::validate_booking(&booking, &article, now)?;
            if validated.state != booking.state {
                debug!(
                    booking_id = %validated.booking_id,
                    article_id = %article.article_id,
                    "Booking expired"
                );
                uow.save_booking(&validated).await?;
                uow.save_article(&updated).await?;
                article = updated;
            }
        }
    }

    if article.state.is_on_loan() {
        if let Some(loan) = uow.find_current_loan(article.article_id).await? {
            if loan.state == LoanState::Active {
                let (validated, updated) = domain::validate_loan(&loan, &article, now)?;
                if validated.state != loan.state {
                    debug!(
                        loan_id = %validated.loan_id,
                        article_id = %article.article_id,
                        "Loan became overdue"
                    );
                    uow.save_loan(&validated).await?;
                    uow.save_article(&updated).await?;
                    article = updated;
                }
            }
        }
    }

    Ok(article)
}
