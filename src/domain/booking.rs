use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Article, ArticleId, ArticleState, BookingId, CancelBookingError, EntityToken, Loan,
    RegisterBookingError, StateNotActive, UserId, booking_deadline_from,
};

/// 予約の状態
///
/// ACTIVE → {COMPLETED, CANCELLED, EXPIRED} のみ。ACTIVE以外は終端状態。
/// 並び順（ACTIVEが先頭）は検索結果の整列に使われる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BookingState {
    Active,
    Completed,
    Cancelled,
    Expired,
}

impl BookingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingState::Active => "ACTIVE",
            BookingState::Completed => "COMPLETED",
            BookingState::Cancelled => "CANCELLED",
            BookingState::Expired => "EXPIRED",
        }
    }
}

impl std::str::FromStr for BookingState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(BookingState::Active),
            "COMPLETED" => Ok(BookingState::Completed),
            "CANCELLED" => Ok(BookingState::Cancelled),
            "EXPIRED" => Ok(BookingState::Expired),
            _ => Err(format!("Invalid booking state: {}", s)),
        }
    }
}

/// Booking集約 - 1点の資料に対する1回の予約
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    // 識別子
    pub booking_id: BookingId,
    pub token: EntityToken,

    // 他の集約への参照（IDのみ、作成後は不変）
    pub article_id: ArticleId,
    pub user_id: UserId,

    // 予約期間
    pub booking_date: DateTime<Utc>,
    pub booking_end_date: DateTime<Utc>,
    pub state: BookingState,
}

impl PartialEq for Booking {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Booking {}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.state == BookingState::Active
    }
}

// ============================================================================
// 予約の登録
// ============================================================================

/// 純粋関数：予約を登録する
///
/// 資料の状態ごとの振る舞い：
/// - BOOKED / ONLOANBOOKED: 既に予約済み
/// - UNAVAILABLE: 利用不可
/// - AVAILABLE: 期限は now + 3日、資料はBOOKEDへ
/// - ONLOAN: 現在の貸出の返却期限 + 3日、資料はONLOANBOOKEDへ
///
/// `current_loan`はONLOANの資料に対するACTIVE/OVERDUEの貸出。
/// 予約者自身が借りている場合は予約できない。
pub fn register_booking(
    article: &Article,
    user_id: UserId,
    current_loan: Option<&Loan>,
    now: DateTime<Utc>,
) -> Result<(Booking, Article), RegisterBookingError> {
    let (booking_end_date, next_state) = match article.state {
        ArticleState::Booked | ArticleState::OnLoanBooked => {
            return Err(RegisterBookingError::AlreadyBooked);
        }
        ArticleState::Unavailable => return Err(RegisterBookingError::Unavailable),
        ArticleState::Available => (booking_deadline_from(now), ArticleState::Booked),
        ArticleState::OnLoan => match current_loan {
            None => return Err(RegisterBookingError::InconsistentState),
            Some(loan) if loan.user_id == user_id => {
                return Err(RegisterBookingError::AlreadyOnLoanToUser);
            }
            Some(loan) => (
                booking_deadline_from(loan.due_date),
                ArticleState::OnLoanBooked,
            ),
        },
    };

    let booking = Booking {
        booking_id: BookingId::new(),
        token: EntityToken::new(),
        article_id: article.article_id,
        user_id,
        booking_date: now,
        booking_end_date,
        state: BookingState::Active,
    };

    let article = Article {
        state: next_state,
        ..article.clone()
    };

    Ok((booking, article))
}

// ============================================================================
// 予約の検証（遅延期限切れ）
// ============================================================================

/// 純粋関数：予約の期限を検証する
///
/// 前提条件：予約はACTIVEであること。
/// 期限を過ぎていればEXPIREDにし、資料がBOOKEDならAVAILABLEに戻す。
/// ONLOANBOOKEDの資料は貸出が保持しているため変更しない。
pub fn validate_booking(
    booking: &Booking,
    article: &Article,
    now: DateTime<Utc>,
) -> Result<(Booking, Article), StateNotActive> {
    let validated = expire_booking(booking, now)?;
    if validated.state == booking.state {
        return Ok((validated, article.clone()));
    }

    let article = if article.state == ArticleState::Booked {
        Article {
            state: ArticleState::Available,
            ..article.clone()
        }
    } else {
        article.clone()
    };

    Ok((validated, article))
}

/// 純粋関数：予約の期限のみを検証する
///
/// 資料が削除済みで状態を反映できない場合に使う。
pub fn expire_booking(
    booking: &Booking,
    now: DateTime<Utc>,
) -> Result<Booking, StateNotActive> {
    if !booking.is_active() {
        return Err(StateNotActive::Booking(booking.state));
    }

    if booking.booking_end_date >= now {
        return Ok(booking.clone());
    }

    Ok(Booking {
        state: BookingState::Expired,
        ..booking.clone()
    })
}

// ============================================================================
// 予約の終了
// ============================================================================

/// 純粋関数：予約を取り消す
///
/// BOOKEDの資料はAVAILABLEに、ONLOANBOOKEDの資料はONLOANに戻す。
pub fn cancel_booking(
    booking: &Booking,
    article: &Article,
) -> Result<(Booking, Article), CancelBookingError> {
    if !booking.is_active() {
        return Err(CancelBookingError::NotActive);
    }

    let state = match article.state {
        ArticleState::Booked => ArticleState::Available,
        ArticleState::OnLoanBooked => ArticleState::OnLoan,
        other => other,
    };

    Ok((
        Booking {
            state: BookingState::Cancelled,
            ..booking.clone()
        },
        Article {
            state,
            ..article.clone()
        },
    ))
}

/// 純粋関数：予約者が貸出を受けたので予約を完了する
pub fn complete_booking(booking: &Booking) -> Booking {
    Booking {
        state: BookingState::Completed,
        ..booking.clone()
    }
}

/// 純粋関数：資料削除に伴う強制取消（資料の状態は変更しない）
pub fn force_cancel_booking(booking: &Booking) -> Booking {
    Booking {
        state: BookingState::Cancelled,
        ..booking.clone()
    }
}

/// 純粋関数：返却時に予約期限を now + 3日 に更新する
pub fn restart_booking_window(booking: &Booking, now: DateTime<Utc>) -> Booking {
    Booking {
        booking_end_date: booking_deadline_from(now),
        ..booking.clone()
    }
}
