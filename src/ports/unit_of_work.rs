use async_trait::async_trait;

use super::{ArticleRepository, BookingRepository, LoanRepository, Result, UserRepository};

/// 作業単位（Unit of Work）
///
/// 1つのワークフローの読み取り・変更・書き込みを1つのトランザクションにまとめる。
/// `commit`せずにdropした場合はロールバックされる。
///
/// 同じ資料に触れる作業単位どうしは直列化されること（実装の責務）。
/// 予約の二重登録や遅延期限切れの競合はここで防ぐ。
#[async_trait]
pub trait UnitOfWork:
    ArticleRepository + BookingRepository + LoanRepository + UserRepository + Send
{
    async fn commit(self: Box<Self>) -> Result<()>;
}

/// 永続化ストアポート
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// 新しい作業単位を開始する
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}
