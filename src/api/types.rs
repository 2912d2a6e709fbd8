use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::application::article_service::ArticleInfo;
use crate::application::user_service::UserDashboard;
use crate::domain::{
    Article, ArticleDetails, ArticleKind, ArticleState, Booking, Loan, User, UserProfile,
};
use crate::ports::{ArticleCriteria, UserCriteria};

/// 1ページあたりの既定件数
pub const DEFAULT_RESULTS_PER_PAGE: i64 = 10;

/// 1ページあたりの上限件数
pub const MAX_RESULTS_PER_PAGE: i64 = 100;

// ============================================================================
// Pagination
// ============================================================================

/// ページ指定のクエリパラメータ
#[derive(Debug, Default, Deserialize, Validate)]
pub struct PageQuery {
    #[validate(range(min = 1))]
    pub page_number: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub results_per_page: Option<i64>,
}

/// 総件数から決まった取得範囲
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page_number: i64,
    pub results_per_page: i64,
    pub total_results: i64,
    pub total_pages: i64,
}

impl PageWindow {
    /// ページ番号は最終ページに、件数は上限に切り詰める
    pub fn resolve(page_number: Option<i64>, results_per_page: Option<i64>, total: i64) -> Self {
        let results_per_page = results_per_page
            .unwrap_or(DEFAULT_RESULTS_PER_PAGE)
            .clamp(1, MAX_RESULTS_PER_PAGE);
        let total = total.max(0);
        let total_pages = total.saturating_add(results_per_page - 1) / results_per_page;
        let page_number = page_number.unwrap_or(1).clamp(1, total_pages.max(1));

        Self {
            page_number,
            results_per_page,
            total_results: total,
            total_pages,
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page_number - 1) * self.results_per_page
    }

    pub fn limit(&self) -> i64 {
        self.results_per_page
    }

    pub fn into_page<T>(self, items: Vec<T>) -> Page<T> {
        Page {
            items,
            page_number: self.page_number,
            results_per_page: self.results_per_page,
            total_results: self.total_results,
            total_pages: self.total_pages,
        }
    }
}

/// 一覧レスポンス
#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_number: i64,
    pub results_per_page: i64,
    pub total_results: i64,
    pub total_pages: i64,
}

// ============================================================================
// Requests
// ============================================================================

/// POST /articles
#[derive(Debug, Deserialize, Validate)]
pub struct ArticleRequest {
    #[validate(length(min = 1))]
    pub location: String,
    #[validate(length(min = 1))]
    pub title: String,
    pub year_edition: NaiveDate,
    #[validate(length(min = 1))]
    pub publisher: String,
    #[validate(length(min = 1))]
    pub genre: String,
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: ArticleKind,
}

impl ArticleRequest {
    pub fn into_parts(self) -> (ArticleDetails, ArticleKind) {
        let details = ArticleDetails {
            location: self.location,
            title: self.title,
            year_edition: self.year_edition,
            publisher: self.publisher,
            genre: self.genre,
            description: self.description,
        };
        (details, self.kind)
    }
}

/// PUT /articles/:id
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateArticleRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub article: ArticleRequest,
    /// 管理者による状態変更（BOOKED・ONLOAN系は指定できない）
    pub requested_state: Option<ArticleState>,
}

/// POST /bookings, POST /loans
#[derive(Debug, Deserialize)]
pub struct ArticleForUserRequest {
    pub user_id: Uuid,
    pub article_id: Uuid,
}

/// POST /users, PUT /users/:id
#[derive(Debug, Deserialize, Validate)]
pub struct UserRequest {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(length(min = 1))]
    pub surname: String,
    #[validate(email)]
    pub email: String,
    pub address: Option<String>,
    #[validate(length(min = 1))]
    pub telephone_number: String,
}

impl From<UserRequest> for UserProfile {
    fn from(req: UserRequest) -> Self {
        Self {
            name: req.name,
            surname: req.surname,
            email: req.email,
            address: req.address,
            telephone_number: req.telephone_number,
        }
    }
}

/// GET /articles
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ArticleSearchQuery {
    pub title: Option<String>,
    pub genre: Option<String>,
    pub publisher: Option<String>,
    pub year_edition: Option<NaiveDate>,
    pub author: Option<String>,
    pub issue_number: Option<i32>,
    pub director: Option<String>,
    pub isbn: Option<String>,
    pub issn: Option<String>,
    pub isan: Option<String>,
    #[validate(range(min = 1))]
    pub page_number: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub results_per_page: Option<i64>,
}

impl ArticleSearchQuery {
    pub fn criteria(&self) -> ArticleCriteria {
        ArticleCriteria {
            title: self.title.clone(),
            genre: self.genre.clone(),
            publisher: self.publisher.clone(),
            year_edition: self.year_edition,
            author: self.author.clone(),
            issue_number: self.issue_number,
            director: self.director.clone(),
            isbn: self.isbn.clone(),
            issn: self.issn.clone(),
            isan: self.isan.clone(),
        }
    }
}

/// GET /users
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UserSearchQuery {
    pub email: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub telephone_number: Option<String>,
    #[validate(range(min = 1))]
    pub page_number: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub results_per_page: Option<i64>,
}

impl UserSearchQuery {
    pub fn criteria(&self) -> UserCriteria {
        UserCriteria {
            email: self.email.clone(),
            name: self.name.clone(),
            surname: self.surname.clone(),
            telephone_number: self.telephone_number.clone(),
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ArticleCreatedResponse {
    pub article_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct BookingCreatedResponse {
    pub booking_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct LoanCreatedResponse {
    pub loan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct UserCreatedResponse {
    pub user_id: Uuid,
}

/// 資料レスポンス（種別ごとの項目は `type` で判別）
#[derive(Debug, Serialize)]
pub struct ArticleResponse {
    pub article_id: Uuid,
    pub state: String,
    #[serde(flatten)]
    pub details: ArticleDetails,
    #[serde(flatten)]
    pub kind: ArticleKind,
}

impl From<Article> for ArticleResponse {
    fn from(article: Article) -> Self {
        Self {
            article_id: article.article_id.value(),
            state: article.state.as_str().to_string(),
            details: article.details,
            kind: article.kind,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub booking_id: Uuid,
    pub article_id: Uuid,
    pub user_id: Uuid,
    pub booking_date: DateTime<Utc>,
    pub booking_end_date: DateTime<Utc>,
    pub state: String,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            booking_id: booking.booking_id.value(),
            article_id: booking.article_id.value(),
            user_id: booking.user_id.value(),
            booking_date: booking.booking_date,
            booking_end_date: booking.booking_end_date,
            state: booking.state.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub loan_id: Uuid,
    pub article_id: Uuid,
    pub user_id: Uuid,
    pub loan_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub renewed: bool,
    pub state: String,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            loan_id: loan.loan_id.value(),
            article_id: loan.article_id.value(),
            user_id: loan.user_id.value(),
            loan_date: loan.loan_date,
            due_date: loan.due_date,
            renewed: loan.renewed,
            state: loan.state.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: Uuid,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub address: Option<String>,
    pub telephone_number: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            user_id: user.user_id.value(),
            name: user.profile.name,
            surname: user.profile.surname,
            email: user.profile.email,
            address: user.profile.address,
            telephone_number: user.profile.telephone_number,
            role: user.role.as_str().to_string(),
        }
    }
}

/// GET /articles/:id
#[derive(Debug, Serialize)]
pub struct ArticleInfoResponse {
    pub article: ArticleResponse,
    pub booking: Option<BookingResponse>,
    pub loan: Option<LoanResponse>,
}

impl From<ArticleInfo> for ArticleInfoResponse {
    fn from(info: ArticleInfo) -> Self {
        Self {
            article: info.article.into(),
            booking: info.booking.map(BookingResponse::from),
            loan: info.loan.map(LoanResponse::from),
        }
    }
}

/// GET /users/:id/dashboard
///
/// 取得できなかった予約・貸出の一覧は省略される。
#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub user: UserResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bookings: Option<Vec<BookingResponse>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loans: Option<Vec<LoanResponse>>,
    pub total_bookings: i64,
    pub total_loans: i64,
}

impl From<UserDashboard> for DashboardResponse {
    fn from(dashboard: UserDashboard) -> Self {
        Self {
            user: dashboard.user.into(),
            bookings: dashboard
                .bookings
                .map(|b| b.into_iter().map(BookingResponse::from).collect()),
            loans: dashboard
                .loans
                .map(|l| l.into_iter().map(LoanResponse::from).collect()),
            total_bookings: dashboard.total_bookings,
            total_loans: dashboard.total_loans,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}
