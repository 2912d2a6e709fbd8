use crate::domain::{ArticleId, Loan, LoanId, UserId};
use async_trait::async_trait;

use super::Result;

/// 貸出リポジトリポート
#[async_trait]
pub trait LoanRepository: Send {
    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 新規ならINSERT、既存ならUPDATE（upsert）
    async fn save_loan(&mut self, loan: &Loan) -> Result<()>;

    /// 永続化されていない貸出の削除はエラー
    async fn delete_loan(&mut self, loan: &Loan) -> Result<()>;

    /// 利用者の貸出を検索する
    ///
    /// 状態の昇順（ACTIVEが先頭）、返却期限の降順で並ぶ。
    async fn find_loans_by_user(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Loan>>;

    async fn count_loans_by_user(&mut self, user_id: UserId) -> Result<i64>;

    /// 資料に対する未返却（ACTIVE / OVERDUE）の貸出（高々1件）
    async fn find_current_loan(&mut self, article_id: ArticleId) -> Result<Option<Loan>>;
}
