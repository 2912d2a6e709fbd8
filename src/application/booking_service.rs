use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{self, ArticleState, Booking, BookingId, UserId, commands::*};

use super::dependencies::ServiceDependencies;
use super::errors::{ApplicationError, Result};
use super::refresh::{refresh_article, refresh_booking};

/// 資料を予約する
///
/// ビジネスルール：
/// - 利用者・資料が存在すること
/// - 資料の状態で分岐する（AVAILABLE → BOOKED、ONLOAN → ONLOANBOOKED）
/// - 貸出中の資料を借りている本人は予約できない
///
/// 分岐の前に資料の予約・貸出を遅延検証する。
/// 作業単位が資料の行をロックするため、同じ資料への同時予約は直列化され、
/// 後から来た方は BOOKED を見て失敗する。
///
/// # 戻り値
/// 成功時は作成された予約のID
pub async fn register_booking(
    deps: &ServiceDependencies,
    cmd: RegisterBooking,
) -> Result<BookingId> {
    let mut uow = deps.store.begin().await?;

    // 1. 利用者の存在確認
    uow.find_user(cmd.user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    // 2. 資料の取得
    let article = uow
        .find_article(cmd.article_id)
        .await?
        .ok_or(ApplicationError::ArticleNotFound)?;

    // 3. 期限切れ・延滞を反映
    let article = refresh_article(uow.as_mut(), article, cmd.booked_at).await?;

    // 4. 管理者がAVAILABLEに戻した資料に待ちの予約が残っていれば二重予約になる
    if article.state == ArticleState::Available {
        if let Some(waiting) = uow.find_active_booking(article.article_id).await? {
            if refresh_booking(uow.as_mut(), waiting, cmd.booked_at)
                .await?
                .is_active()
            {
                return Err(domain::RegisterBookingError::AlreadyBooked.into());
            }
        }
    }

    // 5. 貸出中なら現在の貸出を取得
    let current_loan = if article.state == ArticleState::OnLoan {
        uow.find_current_loan(article.article_id).await?
    } else {
        None
    };

    // 6. ドメイン層の純粋関数を呼び出し
    let (booking, article) = domain::register_booking(
        &article,
        cmd.user_id,
        current_loan.as_ref(),
        cmd.booked_at,
    )?;

    // 7. 保存
    uow.save_article(&article).await?;
    uow.save_booking(&booking).await?;
    uow.commit().await?;

    info!(
        booking_id = %booking.booking_id,
        article_id = %article.article_id,
        user_id = %booking.user_id,
        article_state = article.state.as_str(),
        booking_end_date = %booking.booking_end_date,
        "Booking registered"
    );

    Ok(booking.booking_id)
}

/// 予約を取得する（ACTIVEなら期限を検証して保存）
pub async fn get_booking_info(
    deps: &ServiceDependencies,
    booking_id: BookingId,
    now: DateTime<Utc>,
) -> Result<Booking> {
    let mut uow = deps.store.begin().await?;

    let booking = uow
        .find_booking(booking_id)
        .await?
        .ok_or(ApplicationError::BookingNotFound)?;
    let booking = refresh_booking(uow.as_mut(), booking, now).await?;

    uow.commit().await?;
    Ok(booking)
}

/// 予約した利用者（検証も保存もしない）
pub async fn get_booking_owner(
    deps: &ServiceDependencies,
    booking_id: BookingId,
) -> Result<UserId> {
    let mut uow = deps.store.begin().await?;

    uow.find_booking(booking_id)
        .await?
        .map(|booking| booking.user_id)
        .ok_or(ApplicationError::BookingNotFound)
}

/// 予約を取り消す
///
/// BOOKEDの資料はAVAILABLEに、ONLOANBOOKEDの資料はONLOANに戻る。
pub async fn cancel_booking(deps: &ServiceDependencies, cmd: CancelBooking) -> Result<()> {
    let mut uow = deps.store.begin().await?;

    let booking = uow
        .find_booking(cmd.booking_id)
        .await?
        .ok_or(ApplicationError::BookingNotFound)?;

    if !booking.is_active() {
        return Err(domain::CancelBookingError::NotActive.into());
    }

    // 資料の行を先にロックしてから予約を読み直す
    let article = uow
        .find_article(booking.article_id)
        .await?
        .ok_or(ApplicationError::ArticleNotFound)?;
    let booking = uow
        .find_booking(cmd.booking_id)
        .await?
        .ok_or(ApplicationError::BookingNotFound)?;

    let (cancelled, article) = domain::cancel_booking(&booking, &article)?;

    uow.save_booking(&cancelled).await?;
    uow.save_article(&article).await?;
    uow.commit().await?;

    info!(
        booking_id = %cancelled.booking_id,
        article_id = %article.article_id,
        article_state = article.state.as_str(),
        "Booking cancelled"
    );

    Ok(())
}

/// 利用者の予約を取得する
///
/// 状態の昇順（ACTIVEが先頭）、予約期限の降順。
/// ACTIVEな予約は返す前にすべて期限を検証する。
pub async fn get_bookings_by_user(
    deps: &ServiceDependencies,
    user_id: UserId,
    offset: i64,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Booking>> {
    let mut uow = deps.store.begin().await?;

    uow.find_user(user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    let bookings = uow.find_bookings_by_user(user_id, offset, limit).await?;
    if bookings.is_empty() {
        return Err(ApplicationError::NoResultsFound(
            "No bookings relative to the specified user found!".to_string(),
        ));
    }

    // 資料のロック順を揃えるため、検証は資料IDの順に行う
    let mut indexed: Vec<(usize, Booking)> = bookings.into_iter().enumerate().collect();
    indexed.sort_by_key(|(_, booking)| booking.article_id);

    let mut validated = Vec::with_capacity(indexed.len());
    for (position, booking) in indexed {
        validated.push((position, refresh_booking(uow.as_mut(), booking, now).await?));
    }
    validated.sort_by_key(|(position, _)| *position);

    uow.commit().await?;
    Ok(validated.into_iter().map(|(_, booking)| booking).collect())
}

/// 利用者の予約件数
pub async fn count_bookings_by_user(deps: &ServiceDependencies, user_id: UserId) -> Result<i64> {
    let mut uow = deps.store.begin().await?;

    uow.find_user(user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    Ok(uow.count_bookings_by_user(user_id).await?)
}
