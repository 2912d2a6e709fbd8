use thiserror::Error;

use super::{ArticleState, BookingState, LoanState};

/// 管理者による資料状態の変更エラー
///
/// BOOKED / ONLOAN / ONLOANBOOKED は予約・貸出の副作用でのみ到達する。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cannot change state to inserted value!")]
pub struct InvalidStateTransition {
    pub current: ArticleState,
    pub requested: ArticleState,
}

/// 状態検証の前提条件エラー（ACTIVE以外の予約・貸出に対する検証）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateNotActive {
    #[error("The Booking state is not ACTIVE!")]
    Booking(BookingState),
    #[error("The Loan state is not ACTIVE!")]
    Loan(LoanState),
}

/// 予約登録のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterBookingError {
    /// 既に予約済み（BOOKED, ONLOANBOOKED）
    #[error("Cannot register Booking, specified Article is already booked!")]
    AlreadyBooked,
    /// 利用不可
    #[error("Cannot register Booking, specified Article is UNAVAILABLE!")]
    Unavailable,
    /// 予約者自身が貸出中
    #[error("Cannot register Booking, selected user has selected Article currently on loan!")]
    AlreadyOnLoanToUser,
    /// ONLOANなのに貸出が見つからない
    #[error("Cannot register Booking, specified Article is in an inconsistent state!")]
    InconsistentState,
}

/// 予約取消のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelBookingError {
    #[error("Cannot cancel Booking. Specified Booking is not active!")]
    NotActive,
}

/// 貸出登録のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterLoanError {
    /// 他の利用者が予約中
    #[error("Cannot register Loan, specified Article is booked by another user!")]
    BookedByAnotherUser,
    /// 既に貸出中（ONLOAN, ONLOANBOOKED）
    #[error("Cannot register Loan, specified Article is already on loan!")]
    AlreadyOnLoan,
    /// 利用不可
    #[error("Cannot register Loan, specified Article is UNAVAILABLE!")]
    Unavailable,
    /// BOOKEDなのに有効な予約が見つからない
    #[error("Cannot register Loan, specified Article is in an inconsistent state!")]
    InconsistentState,
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReturnLoanError {
    #[error("Cannot return article! Loan has already been returned!")]
    AlreadyReturned,
}

/// 貸出延長のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtendLoanError {
    /// ACTIVE以外（延滞中・返却済み）
    #[error("Cannot extend loan, selected loan is not Active!")]
    NotActive,
    /// 延長は1回まで
    #[error("Cannot extend loan, loan has already been renewed!")]
    AlreadyRenewed,
    /// 他の利用者が予約中（ONLOANBOOKED）
    #[error("Cannot extend loan, another User has booked the Article!")]
    BookedByAnotherUser,
}

/// 資料削除のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoveArticleError {
    #[error("Cannot remove Article from catalogue! Article currently on loan!")]
    CurrentlyOnLoan,
    #[error("Cannot remove Article from catalogue! Inconsistent state!")]
    InconsistentState,
}
