use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    ArticleDetails, ArticleId, ArticleKind, ArticleState, BookingId, LoanId, UserId, UserProfile,
};

// ============================================================================
// 予約
// ============================================================================

/// コマンド：資料を予約する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterBooking {
    pub user_id: UserId,
    pub article_id: ArticleId,
    pub booked_at: DateTime<Utc>,
}

/// コマンド：予約を取り消す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBooking {
    pub booking_id: BookingId,
}

// ============================================================================
// 貸出
// ============================================================================

/// コマンド：資料を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterLoan {
    pub user_id: UserId,
    pub article_id: ArticleId,
    pub loaned_at: DateTime<Utc>,
}

/// コマンド：資料を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterReturn {
    pub loan_id: LoanId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：貸出を延長する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendLoan {
    pub loan_id: LoanId,
    pub extended_at: DateTime<Utc>,
}

// ============================================================================
// 資料（カタログ管理）
// ============================================================================

/// コマンド：資料を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddArticle {
    pub details: ArticleDetails,
    pub kind: ArticleKind,
}

/// コマンド：資料を更新する
///
/// `state`がNoneなら状態は変更しない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateArticle {
    pub article_id: ArticleId,
    pub details: ArticleDetails,
    pub kind: ArticleKind,
    pub state: Option<ArticleState>,
}

/// コマンド：資料を削除する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveArticle {
    pub article_id: ArticleId,
}

// ============================================================================
// 利用者
// ============================================================================

/// コマンド：利用者を登録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddUser {
    pub profile: UserProfile,
}

/// コマンド：利用者を更新する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUser {
    pub user_id: UserId,
    pub profile: UserProfile,
}
