use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    Article, ArticleId, ArticleState, Booking, EntityToken, ExtendLoanError, LoanId,
    RegisterLoanError, ReturnLoanError, StateNotActive, UserId, complete_booking,
    loan_due_date_from, restart_booking_window,
};

/// 貸出の状態
///
/// ACTIVE → {OVERDUE, RETURNED}、OVERDUE → RETURNED。
/// 延滞中でも返却は受け付ける。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanState {
    Active,
    Overdue,
    Returned,
}

impl LoanState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanState::Active => "ACTIVE",
            LoanState::Overdue => "OVERDUE",
            LoanState::Returned => "RETURNED",
        }
    }

    /// 資料がまだ手元にない（未返却）
    pub fn is_outstanding(&self) -> bool {
        matches!(self, LoanState::Active | LoanState::Overdue)
    }
}

impl std::str::FromStr for LoanState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(LoanState::Active),
            "OVERDUE" => Ok(LoanState::Overdue),
            "RETURNED" => Ok(LoanState::Returned),
            _ => Err(format!("Invalid loan state: {}", s)),
        }
    }
}

/// Loan集約 - 1点の資料の1回の貸出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loan {
    // 識別子
    pub loan_id: LoanId,
    pub token: EntityToken,

    // 他の集約への参照（IDのみ）
    pub article_id: ArticleId,
    pub user_id: UserId,

    // 貸出管理の責務
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub renewed: bool,
    pub state: LoanState,
}

impl PartialEq for Loan {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Loan {}

/// 貸出登録の結果
#[derive(Debug, Clone)]
pub struct LoanRegistration {
    pub loan: Loan,
    pub article: Article,
    /// 予約者本人が受け取った場合、COMPLETEDになった予約
    pub completed_booking: Option<Booking>,
}

/// 返却の結果
#[derive(Debug, Clone)]
pub struct LoanReturn {
    pub loan: Loan,
    pub article: Article,
    /// ONLOANBOOKEDだった資料の予約（期限を更新済み）
    pub refreshed_booking: Option<Booking>,
}

// ============================================================================
// 貸出の登録
// ============================================================================

/// 純粋関数：資料を貸し出す
///
/// ビジネスルール：
/// - BOOKED: 有効な予約が本人のものであれば予約をCOMPLETEDにして貸し出す
/// - ONLOAN / ONLOANBOOKED: 既に貸出中
/// - UNAVAILABLE: 利用不可
/// - 貸出期間は1か月、延長なし、状態はACTIVE
/// - 資料はONLOANへ
pub fn register_loan(
    article: &Article,
    user_id: UserId,
    active_booking: Option<&Booking>,
    now: DateTime<Utc>,
) -> Result<LoanRegistration, RegisterLoanError> {
    let completed_booking = match article.state {
        ArticleState::Booked => match active_booking {
            Some(booking) if booking.is_active() => {
                if booking.user_id != user_id {
                    return Err(RegisterLoanError::BookedByAnotherUser);
                }
                Some(complete_booking(booking))
            }
            _ => return Err(RegisterLoanError::InconsistentState),
        },
        ArticleState::OnLoan | ArticleState::OnLoanBooked => {
            return Err(RegisterLoanError::AlreadyOnLoan);
        }
        ArticleState::Unavailable => return Err(RegisterLoanError::Unavailable),
        ArticleState::Available => None,
    };

    let loan = Loan {
        loan_id: LoanId::new(),
        token: EntityToken::new(),
        article_id: article.article_id,
        user_id,
        loan_date: now,
        due_date: loan_due_date_from(now),
        renewed: false,
        state: LoanState::Active,
    };

    let article = Article {
        state: ArticleState::OnLoan,
        ..article.clone()
    };

    Ok(LoanRegistration {
        loan,
        article,
        completed_booking,
    })
}

// ============================================================================
// 貸出の検証（遅延延滞判定）
// ============================================================================

/// 純粋関数：貸出の返却期限を検証する
///
/// 前提条件：貸出はACTIVEであること。
/// 返却期限を過ぎていればOVERDUEにし、資料をUNAVAILABLEにする。
pub fn validate_loan(
    loan: &Loan,
    article: &Article,
    now: DateTime<Utc>,
) -> Result<(Loan, Article), StateNotActive> {
    let validated = mark_overdue(loan, now)?;
    if validated.state == loan.state {
        return Ok((validated, article.clone()));
    }

    Ok((
        validated,
        Article {
            state: ArticleState::Unavailable,
            ..article.clone()
        },
    ))
}

/// 純粋関数：貸出の返却期限のみを検証する
///
/// 資料が削除済みで状態を反映できない場合に使う。
pub fn mark_overdue(loan: &Loan, now: DateTime<Utc>) -> Result<Loan, StateNotActive> {
    if loan.state != LoanState::Active {
        return Err(StateNotActive::Loan(loan.state));
    }

    if loan.due_date >= now {
        return Ok(loan.clone());
    }

    Ok(Loan {
        state: LoanState::Overdue,
        ..loan.clone()
    })
}

// ============================================================================
// 返却・延長
// ============================================================================

/// 純粋関数：資料を返却する
///
/// ビジネスルール：
/// - 返却済みは不可、延滞中は受け付ける
/// - 待っている予約があれば資料はBOOKEDへ戻し、予約の期限を now + 3日 にする
///   （延滞でUNAVAILABLEになったONLOANBOOKEDの資料も含む）
/// - 予約がなければ ONLOAN / ONLOANBOOKED / UNAVAILABLE の資料はAVAILABLEへ
pub fn return_loan(
    loan: &Loan,
    article: &Article,
    pending_booking: Option<&Booking>,
    now: DateTime<Utc>,
) -> Result<LoanReturn, ReturnLoanError> {
    let loan = close_loan(loan)?;

    let (state, refreshed_booking) = match article.state {
        ArticleState::OnLoan | ArticleState::OnLoanBooked | ArticleState::Unavailable => {
            match pending_booking {
                Some(booking) if booking.is_active() => (
                    ArticleState::Booked,
                    Some(restart_booking_window(booking, now)),
                ),
                _ => (ArticleState::Available, None),
            }
        }
        other => (other, None),
    };

    Ok(LoanReturn {
        loan,
        article: Article {
            state,
            ..article.clone()
        },
        refreshed_booking,
    })
}

/// 純粋関数：貸出をRETURNEDにする（資料は扱わない）
pub fn close_loan(loan: &Loan) -> Result<Loan, ReturnLoanError> {
    if loan.state == LoanState::Returned {
        return Err(ReturnLoanError::AlreadyReturned);
    }

    Ok(Loan {
        state: LoanState::Returned,
        ..loan.clone()
    })
}

/// 純粋関数：貸出を延長する
///
/// ビジネスルール：
/// - ACTIVEのみ延長可能
/// - 延長は1回まで
/// - 他の利用者が予約している（ONLOANBOOKED）場合は延長不可
/// - 新しい返却期限は now + 1か月
pub fn extend_loan(
    loan: &Loan,
    article: &Article,
    now: DateTime<Utc>,
) -> Result<Loan, ExtendLoanError> {
    if loan.state != LoanState::Active {
        return Err(ExtendLoanError::NotActive);
    }

    if loan.renewed {
        return Err(ExtendLoanError::AlreadyRenewed);
    }

    if article.state != ArticleState::OnLoan {
        return Err(ExtendLoanError::BookedByAnotherUser);
    }

    Ok(Loan {
        due_date: loan_due_date_from(now),
        renewed: true,
        ..loan.clone()
    })
}
