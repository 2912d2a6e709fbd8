use crate::domain::{ArticleId, Booking, BookingId, BookingState, EntityToken, UserId};
use crate::ports::{BookingRepository, Result};
use async_trait::async_trait;
use sqlx::{Row, postgres::PgRow};
use std::str::FromStr;

use super::store::{PostgresUnitOfWork, invalid_data, not_persisted};

/// 状態の並び順（ACTIVE → COMPLETED → CANCELLED → EXPIRED）
const STATE_ORDER: &str = r#"
    CASE state
        WHEN 'ACTIVE' THEN 0
        WHEN 'COMPLETED' THEN 1
        WHEN 'CANCELLED' THEN 2
        ELSE 3
    END
"#;

/// PostgreSQLの行データをBookingに変換する
fn map_row_to_booking(row: &PgRow) -> Result<Booking> {
    let state_str: &str = row.get("state");
    let state = BookingState::from_str(state_str).map_err(invalid_data)?;

    Ok(Booking {
        booking_id: BookingId::from_uuid(row.get("booking_id")),
        token: EntityToken::from_uuid(row.get("token")),
        article_id: ArticleId::from_uuid(row.get("article_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        booking_date: row.get("booking_date"),
        booking_end_date: row.get("booking_end_date"),
        state,
    })
}

#[async_trait]
impl BookingRepository for PostgresUnitOfWork {
    /// IDで予約を取得
    ///
    /// 行ロックは取らない。更新する側は資料の行を先にロックしてから読み直す。
    async fn find_booking(&mut self, booking_id: BookingId) -> Result<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT booking_id, token, article_id, user_id, booking_date, booking_end_date, state
            FROM bookings
            WHERE booking_id = $1
            "#,
        )
        .bind(booking_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_booking).transpose()
    }

    /// 予約を保存（upsert）
    ///
    /// 資料と利用者への参照は作成後に変わらないため更新しない。
    async fn save_booking(&mut self, booking: &Booking) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO bookings (
                booking_id,
                token,
                article_id,
                user_id,
                booking_date,
                booking_end_date,
                state
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (booking_id)
            DO UPDATE SET
                booking_end_date = EXCLUDED.booking_end_date,
                state = EXCLUDED.state
            "#,
        )
        .bind(booking.booking_id.value())
        .bind(booking.token.value())
        .bind(booking.article_id.value())
        .bind(booking.user_id.value())
        .bind(booking.booking_date)
        .bind(booking.booking_end_date)
        .bind(booking.state.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_booking(&mut self, booking: &Booking) -> Result<()> {
        let result = sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking.booking_id.value())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_persisted("Booking", booking.booking_id));
        }
        Ok(())
    }

    /// 利用者の予約（状態の昇順、予約期限の降順）
    async fn find_bookings_by_user(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Booking>> {
        let sql = format!(
            r#"
            SELECT booking_id, token, article_id, user_id, booking_date, booking_end_date, state
            FROM bookings
            WHERE user_id = $1
            ORDER BY {} ASC, booking_end_date DESC
            LIMIT $2 OFFSET $3
            "#,
            STATE_ORDER
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.value())
            .bind(limit)
            .bind(offset)
            .fetch_all(&mut *self.tx)
            .await?;

        rows.iter().map(map_row_to_booking).collect()
    }

    async fn count_bookings_by_user(&mut self, user_id: UserId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM bookings WHERE user_id = $1")
            .bind(user_id.value())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row.get("count"))
    }

    /// 資料に対するACTIVEな予約（行ロック）
    async fn find_active_booking(&mut self, article_id: ArticleId) -> Result<Option<Booking>> {
        let row = sqlx::query(
            r#"
            SELECT booking_id, token, article_id, user_id, booking_date, booking_end_date, state
            FROM bookings
            WHERE article_id = $1 AND state = 'ACTIVE'
            FOR UPDATE
            "#,
        )
        .bind(article_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_booking).transpose()
    }
}
