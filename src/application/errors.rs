use thiserror::Error;

use crate::domain::{
    ArticleTypeMismatch, CancelBookingError, ExtendLoanError, InvalidStateTransition,
    RegisterBookingError, RegisterLoanError, RemoveArticleError, ReturnLoanError, StateNotActive,
};

/// アプリケーション層のエラー
///
/// トランスポート層はこの種別ごとにステータスコードを決める。
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 利用者が存在しない
    #[error("Specified User not present in the system!")]
    UserNotFound,

    /// 資料が存在しない
    #[error("Specified Article not present in catalogue!")]
    ArticleNotFound,

    /// 予約が存在しない
    #[error("Specified Booking not registered in the system!")]
    BookingNotFound,

    /// 貸出が存在しない
    #[error("Specified Loan not registered in the system!")]
    LoanNotFound,

    /// 状態に依存する前提条件の違反（二重予約、返却済みの返却など）
    #[error("{0}")]
    InvalidOperation(String),

    /// 管理者による不正な状態変更
    #[error("{0}")]
    InvalidStateTransition(String),

    /// 検索結果が0件
    #[error("{0}")]
    NoResultsFound(String),

    /// 不正な入力（種別の変更、識別子の欠落、メールアドレスの重複）
    #[error("{0}")]
    InvalidArgument(String),

    /// 永続化層のエラー
    #[error("Repository error")]
    RepositoryError(#[from] Box<dyn std::error::Error + Send + Sync>),
}

macro_rules! invalid_operation_from {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for ApplicationError {
                fn from(e: $error) -> Self {
                    ApplicationError::InvalidOperation(e.to_string())
                }
            }
        )*
    };
}

invalid_operation_from!(
    StateNotActive,
    RegisterBookingError,
    CancelBookingError,
    RegisterLoanError,
    ReturnLoanError,
    ExtendLoanError,
    RemoveArticleError,
);

impl From<InvalidStateTransition> for ApplicationError {
    fn from(e: InvalidStateTransition) -> Self {
        ApplicationError::InvalidStateTransition(e.to_string())
    }
}

impl From<ArticleTypeMismatch> for ApplicationError {
    fn from(e: ArticleTypeMismatch) -> Self {
        ApplicationError::InvalidArgument(e.to_string())
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, ApplicationError>;
