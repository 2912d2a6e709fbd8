use crate::domain::{ArticleId, Booking, BookingId, UserId};
use async_trait::async_trait;

use super::Result;

/// 予約リポジトリポート
#[async_trait]
pub trait BookingRepository: Send {
    async fn find_booking(&mut self, booking_id: BookingId) -> Result<Option<Booking>>;

    /// 新規ならINSERT、既存ならUPDATE（upsert）
    async fn save_booking(&mut self, booking: &Booking) -> Result<()>;

    /// 永続化されていない予約の削除はエラー
    async fn delete_booking(&mut self, booking: &Booking) -> Result<()>;

    /// 利用者の予約を検索する
    ///
    /// 状態の昇順（ACTIVEが先頭）、予約期限の降順で並ぶ。
    async fn find_bookings_by_user(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Booking>>;

    async fn count_bookings_by_user(&mut self, user_id: UserId) -> Result<i64>;

    /// 資料に対するACTIVEな予約（高々1件）
    async fn find_active_booking(&mut self, article_id: ArticleId) -> Result<Option<Booking>>;
}
