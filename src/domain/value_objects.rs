use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 予約の有効期間（日数）
pub const BOOKING_PERIOD_DAYS: i64 = 3;

/// 貸出期間（月数）
pub const LOAN_PERIOD_MONTHS: u32 = 1;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// 資料ID - 永続化層の識別子
    ArticleId
);
entity_id!(
    /// 予約ID
    BookingId
);
entity_id!(
    /// 貸出ID
    LoanId
);
entity_id!(
    /// 利用者ID
    UserId
);

/// 相関トークン
///
/// 永続化層の識別子とは独立して生成される安定した外部識別子。
/// エンティティの等価性はこのトークンで判定する（再読み込み後も不変）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityToken(Uuid);

impl EntityToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl Default for EntityToken {
    fn default() -> Self {
        Self::new()
    }
}

/// 予約期限：基準時刻 + 3日
pub fn booking_deadline_from(start: DateTime<Utc>) -> DateTime<Utc> {
    start + Duration::days(BOOKING_PERIOD_DAYS)
}

/// 返却期限：基準時刻 + 1か月
///
/// 月末の丸めはchronoの暦計算に従う（1/31 → 2/28）。
pub fn loan_due_date_from(start: DateTime<Utc>) -> DateTime<Utc> {
    start
        .checked_add_months(Months::new(LOAN_PERIOD_MONTHS))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
