use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    ArticleId, Booking, EntityToken, InvalidStateTransition, RemoveArticleError,
    force_cancel_booking,
};

/// 資料の状態
///
/// AVAILABLE / UNAVAILABLE のみ管理者が直接設定できる。
/// BOOKED / ONLOAN / ONLOANBOOKED は予約・貸出ワークフローの副作用でのみ遷移する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArticleState {
    Available,
    Booked,
    OnLoan,
    OnLoanBooked,
    Unavailable,
}

impl ArticleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleState::Available => "AVAILABLE",
            ArticleState::Booked => "BOOKED",
            ArticleState::OnLoan => "ONLOAN",
            ArticleState::OnLoanBooked => "ONLOANBOOKED",
            ArticleState::Unavailable => "UNAVAILABLE",
        }
    }

    /// 管理者が直接設定できる状態か
    pub fn is_administrative(&self) -> bool {
        matches!(self, ArticleState::Available | ArticleState::Unavailable)
    }

    /// 予約が付いている状態か
    pub fn is_booked(&self) -> bool {
        matches!(self, ArticleState::Booked | ArticleState::OnLoanBooked)
    }

    /// 物理的に貸し出されている状態か
    pub fn is_on_loan(&self) -> bool {
        matches!(self, ArticleState::OnLoan | ArticleState::OnLoanBooked)
    }
}

impl std::str::FromStr for ArticleState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(ArticleState::Available),
            "BOOKED" => Ok(ArticleState::Booked),
            "ONLOAN" => Ok(ArticleState::OnLoan),
            "ONLOANBOOKED" => Ok(ArticleState::OnLoanBooked),
            "UNAVAILABLE" => Ok(ArticleState::Unavailable),
            _ => Err(format!("Invalid article state: {}", s)),
        }
    }
}

/// 資料種別の判別子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ArticleType {
    Book,
    Magazine,
    #[serde(rename = "MOVIEDVD")]
    MovieDvd,
}

impl ArticleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleType::Book => "BOOK",
            ArticleType::Magazine => "MAGAZINE",
            ArticleType::MovieDvd => "MOVIEDVD",
        }
    }
}

impl std::str::FromStr for ArticleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOK" => Ok(ArticleType::Book),
            "MAGAZINE" => Ok(ArticleType::Magazine),
            "MOVIEDVD" => Ok(ArticleType::MovieDvd),
            _ => Err(format!("Invalid article type: {}", s)),
        }
    }
}

/// 種別ごとの識別情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum ArticleKind {
    Book {
        isbn: String,
        author: String,
    },
    Magazine {
        issn: String,
        issue_number: i32,
    },
    #[serde(rename = "MOVIEDVD")]
    MovieDvd {
        isan: String,
        director: String,
    },
}

impl ArticleKind {
    pub fn article_type(&self) -> ArticleType {
        match self {
            ArticleKind::Book { .. } => ArticleType::Book,
            ArticleKind::Magazine { .. } => ArticleType::Magazine,
            ArticleKind::MovieDvd { .. } => ArticleType::MovieDvd,
        }
    }
}

/// 全種別共通の書誌情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleDetails {
    pub location: String,
    pub title: String,
    pub year_edition: NaiveDate,
    pub publisher: String,
    pub genre: String,
    pub description: Option<String>,
}

/// Article集約 - 予約・貸出の対象となる1点の資料
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub article_id: ArticleId,
    pub token: EntityToken,
    #[serde(flatten)]
    pub details: ArticleDetails,
    pub state: ArticleState,
    #[serde(flatten)]
    pub kind: ArticleKind,
}

impl PartialEq for Article {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Article {}

/// 種別の変更は許可されない
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot change type of Article")]
pub struct ArticleTypeMismatch {
    pub current: ArticleType,
    pub requested: ArticleType,
}

/// 純粋関数：資料を登録する
///
/// 新規資料は常にAVAILABLE。
pub fn create_article(details: ArticleDetails, kind: ArticleKind) -> Article {
    Article {
        article_id: ArticleId::new(),
        token: EntityToken::new(),
        details,
        state: ArticleState::Available,
        kind,
    }
}

/// 純粋関数：状態遷移の判定
///
/// 許可される遷移：
/// - 同一状態への遷移
/// - AVAILABLE ⇄ UNAVAILABLE
///
/// それ以外（BOOKED / ONLOAN / ONLOANBOOKED が関わる遷移）はすべて拒否。
pub fn update_state(
    current: ArticleState,
    requested: ArticleState,
) -> Result<ArticleState, InvalidStateTransition> {
    if current == requested || (current.is_administrative() && requested.is_administrative()) {
        Ok(requested)
    } else {
        Err(InvalidStateTransition { current, requested })
    }
}

/// 純粋関数：書誌情報と識別情報を更新する
///
/// 状態は変更しない（状態変更は`change_state`で別途検証する）。
pub fn update_fields(
    article: &Article,
    details: ArticleDetails,
    kind: ArticleKind,
) -> Result<Article, ArticleTypeMismatch> {
    let current = article.kind.article_type();
    let requested = kind.article_type();
    if current != requested {
        return Err(ArticleTypeMismatch { current, requested });
    }

    Ok(Article {
        details,
        kind,
        ..article.clone()
    })
}

/// 純粋関数：管理者による状態変更
pub fn change_state(
    article: &Article,
    requested: ArticleState,
) -> Result<Article, InvalidStateTransition> {
    let state = update_state(article.state, requested)?;
    Ok(Article {
        state,
        ..article.clone()
    })
}

/// 純粋関数：資料削除の前処理
///
/// - ONLOAN / ONLOANBOOKED: 貸出中のため削除不可
/// - BOOKED: 有効な予約を強制的にCANCELLEDにしてから削除する
/// - AVAILABLE / UNAVAILABLE: そのまま削除（延滞で残った待ちの予約があれば取り消す）
///
/// 強制取消した予約を返す（保存は呼び出し側の責務）。
pub fn prepare_removal(
    article: &Article,
    active_booking: Option<&Booking>,
) -> Result<Option<Booking>, RemoveArticleError> {
    match article.state {
        ArticleState::OnLoan | ArticleState::OnLoanBooked => {
            Err(RemoveArticleError::CurrentlyOnLoan)
        }
        ArticleState::Booked => match active_booking {
            Some(booking) if booking.is_active() => Ok(Some(force_cancel_booking(booking))),
            _ => Err(RemoveArticleError::InconsistentState),
        },
        ArticleState::Available | ArticleState::Unavailable => {
            Ok(active_booking.filter(|b| b.is_active()).map(force_cancel_booking))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BookingState, UserId, register_booking};
    use chrono::{TimeZone, Utc};

    const ALL_STATES: [ArticleState; 5] = [
        ArticleState::Available,
        ArticleState::Booked,
        ArticleState::OnLoan,
        ArticleState::OnLoanBooked,
        ArticleState::Unavailable,
    ];

    fn details() -> ArticleDetails {
        ArticleDetails {
            location: "upstairs".to_string(),
            title: "Cujo".to_string(),
            year_edition: NaiveDate::from_ymd_opt(1981, 9, 8).unwrap(),
            publisher: "Viking".to_string(),
            genre: "horror".to_string(),
            description: None,
        }
    }

    fn book() -> ArticleKind {
        ArticleKind::Book {
            isbn: "978-0-670-45193-9".to_string(),
            author: "Stephen King".to_string(),
        }
    }

    #[test]
    fn test_create_article_is_available() {
        let article = create_article(details(), book());
        assert_eq!(article.state, ArticleState::Available);
        assert_eq!(article.kind.article_type(), ArticleType::Book);
    }

    #[test]
    fn test_update_state_between_administrative_states() {
        assert_eq!(
            update_state(ArticleState::Available, ArticleState::Unavailable),
            Ok(ArticleState::Unavailable)
        );
        assert_eq!(
            update_state(ArticleState::Unavailable, ArticleState::Available),
            Ok(ArticleState::Available)
        );
    }

    #[test]
    fn test_update_state_to_same_state_is_allowed() {
        for state in ALL_STATES {
            assert_eq!(update_state(state, state), Ok(state));
        }
    }

    #[test]
    fn test_update_state_rejects_workflow_states() {
        for current in ALL_STATES {
            for requested in ALL_STATES {
                if current == requested {
                    continue;
                }
                let result = update_state(current, requested);
                let touches_workflow = !current.is_administrative() || !requested.is_administrative();
                assert_eq!(
                    result.is_err(),
                    touches_workflow,
                    "{:?} -> {:?}",
                    current,
                    requested
                );
            }
        }
    }

    #[test]
    fn test_change_state_keeps_fields() {
        let article = create_article(details(), book());
        let updated = change_state(&article, ArticleState::Unavailable).unwrap();
        assert_eq!(updated.state, ArticleState::Unavailable);
        assert_eq!(updated.details, article.details);
        assert_eq!(updated, article);
    }

    #[test]
    fn test_change_state_to_booked_fails() {
        let article = create_article(details(), book());
        let err = change_state(&article, ArticleState::Booked).unwrap_err();
        assert_eq!(err.current, ArticleState::Available);
        assert_eq!(err.requested, ArticleState::Booked);
        assert_eq!(err.to_string(), "Cannot change state to inserted value!");
    }

    #[test]
    fn test_update_fields_rejects_type_change() {
        let article = create_article(details(), book());
        let result = update_fields(
            &article,
            details(),
            ArticleKind::Magazine {
                issn: "0028-0836".to_string(),
                issue_number: 7,
            },
        );
        assert_eq!(
            result.unwrap_err(),
            ArticleTypeMismatch {
                current: ArticleType::Book,
                requested: ArticleType::Magazine,
            }
        );
    }

    #[test]
    fn test_update_fields_copies_details_and_keeps_state() {
        let mut article = create_article(details(), book());
        article.state = ArticleState::Booked;

        let mut new_details = details();
        new_details.title = "Carrie".to_string();
        let updated = update_fields(&article, new_details, book()).unwrap();

        assert_eq!(updated.details.title, "Carrie");
        assert_eq!(updated.state, ArticleState::Booked);
        assert_eq!(updated.article_id, article.article_id);
    }

    #[test]
    fn test_equality_uses_token_not_fields() {
        let article = create_article(details(), book());
        let mut reloaded = article.clone();
        reloaded.details.title = "changed".to_string();
        assert_eq!(article, reloaded);

        let other = create_article(details(), book());
        assert_ne!(article, other);
    }

    #[test]
    fn test_state_round_trips_through_str() {
        for state in ALL_STATES {
            assert_eq!(state.as_str().parse::<ArticleState>(), Ok(state));
        }
    }

    #[test]
    fn test_prepare_removal_force_cancels_booking() {
        let article = create_article(details(), book());
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        let (booking, booked) = register_booking(&article, UserId::new(), None, now).unwrap();

        let cancelled = prepare_removal(&booked, Some(&booking)).unwrap().unwrap();

        assert_eq!(cancelled.state, BookingState::Cancelled);
        assert_eq!(cancelled, booking);
    }

    #[test]
    fn test_prepare_removal_of_booked_article_without_booking() {
        let mut booked = create_article(details(), book());
        booked.state = ArticleState::Booked;

        assert_eq!(
            prepare_removal(&booked, None).unwrap_err(),
            RemoveArticleError::InconsistentState
        );
    }

    #[test]
    fn test_prepare_removal_rejects_loaned_article() {
        let mut article = create_article(details(), book());
        for state in [ArticleState::OnLoan, ArticleState::OnLoanBooked] {
            article.state = state;
            assert_eq!(
                prepare_removal(&article, None).unwrap_err(),
                RemoveArticleError::CurrentlyOnLoan
            );
        }

        article.state = ArticleState::Unavailable;
        assert_eq!(prepare_removal(&article, None), Ok(None));
    }

    #[test]
    fn test_prepare_removal_cancels_waiting_booking_on_unavailable_article() {
        let article = create_article(details(), book());
        let now = Utc.with_ymd_and_hms(2024, 2, 1, 8, 0, 0).unwrap();
        let (booking, _) = register_booking(&article, UserId::new(), None, now).unwrap();
        let unavailable = Article {
            state: ArticleState::Unavailable,
            ..article
        };

        let cancelled = prepare_removal(&unavailable, Some(&booking)).unwrap().unwrap();
        assert_eq!(cancelled.state, BookingState::Cancelled);
    }
}
