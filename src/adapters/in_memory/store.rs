use crate::domain::{
    Article, ArticleId, ArticleKind, Booking, BookingId, BookingState, Loan, LoanId, User, UserId,
};
use crate::ports::{
    ArticleCriteria, ArticleRepository, BookingRepository, DuplicateEmail, LibraryStore,
    LoanRepository, Result, UnitOfWork, UserCriteria, UserRepository,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// インメモリストアのエラー
#[derive(Debug, thiserror::Error)]
pub enum InMemoryStoreError {
    #[error("{entity} {id} is not persisted")]
    NotPersisted { entity: &'static str, id: String },
}

#[derive(Debug, Clone, Default)]
struct Tables {
    articles: HashMap<ArticleId, Article>,
    bookings: HashMap<BookingId, Booking>,
    loans: HashMap<LoanId, Loan>,
    users: HashMap<UserId, User>,
}

/// LibraryStoreのインメモリ実装
///
/// 作業単位は生存中ずっとストア全体のロックを保持するため、
/// ワークフローは完全に直列化される。
/// 変更はスナップショット上に積み、commitで書き戻す。dropした場合は破棄される。
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LibraryStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, staged }))
    }
}

struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnitOfWork { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}

/// 整列済みの列にoffset/limitを適用する
fn page<T: Clone>(items: Vec<&T>, offset: i64, limit: i64) -> Vec<T> {
    let offset = usize::try_from(offset).unwrap_or(0);
    let limit = usize::try_from(limit).unwrap_or(0);
    items.into_iter().skip(offset).take(limit).cloned().collect()
}

fn not_persisted(
    entity: &'static str,
    id: impl ToString,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(InMemoryStoreError::NotPersisted {
        entity,
        id: id.to_string(),
    })
}

fn article_matches(article: &Article, criteria: &ArticleCriteria) -> bool {
    if let Some(isbn) = &criteria.isbn {
        return matches!(&article.kind, ArticleKind::Book { isbn: value, .. } if value == isbn);
    }
    if let Some(issn) = &criteria.issn {
        return matches!(&article.kind, ArticleKind::Magazine { issn: value, .. } if value == issn);
    }
    if let Some(isan) = &criteria.isan {
        return matches!(&article.kind, ArticleKind::MovieDvd { isan: value, .. } if value == isan);
    }

    let details = &article.details;
    criteria.title.as_ref().is_none_or(|t| &details.title == t)
        && criteria.genre.as_ref().is_none_or(|g| &details.genre == g)
        && criteria.publisher.as_ref().is_none_or(|p| &details.publisher == p)
        && criteria.year_edition.is_none_or(|y| details.year_edition == y)
        && criteria.author.as_ref().is_none_or(|a| {
            matches!(&article.kind, ArticleKind::Book { author, .. } if author == a)
        })
        && criteria.issue_number.is_none_or(|n| {
            matches!(&article.kind, ArticleKind::Magazine { issue_number, .. } if *issue_number == n)
        })
        && criteria.director.as_ref().is_none_or(|d| {
            matches!(&article.kind, ArticleKind::MovieDvd { director, .. } if director == d)
        })
}

fn user_matches(user: &User, criteria: &UserCriteria) -> bool {
    let profile = &user.profile;
    if let Some(email) = &criteria.email {
        return &profile.email == email;
    }

    criteria.name.as_ref().is_none_or(|n| &profile.name == n)
        && criteria.surname.as_ref().is_none_or(|s| &profile.surname == s)
        && criteria
            .telephone_number
            .as_ref()
            .is_none_or(|t| &profile.telephone_number == t)
}

impl InMemoryUnitOfWork {
    fn matching_articles(&self, criteria: &ArticleCriteria) -> Vec<&Article> {
        let mut articles: Vec<&Article> = self
            .staged
            .articles
            .values()
            .filter(|a| article_matches(a, criteria))
            .collect();
        articles.sort_by(|a, b| {
            b.details
                .year_edition
                .cmp(&a.details.year_edition)
                .then_with(|| a.details.title.cmp(&b.details.title))
        });
        articles
    }

    fn bookings_of(&self, user_id: UserId) -> Vec<&Booking> {
        let mut bookings: Vec<&Booking> = self
            .staged
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .collect();
        bookings.sort_by(|a, b| {
            a.state
                .cmp(&b.state)
                .then_with(|| b.booking_end_date.cmp(&a.booking_end_date))
        });
        bookings
    }

    fn loans_of(&self, user_id: UserId) -> Vec<&Loan> {
        let mut loans: Vec<&Loan> = self
            .staged
            .loans
            .values()
            .filter(|l| l.user_id == user_id)
            .collect();
        loans.sort_by(|a, b| {
            a.state
                .cmp(&b.state)
                .then_with(|| b.due_date.cmp(&a.due_date))
        });
        loans
    }

    fn matching_users(&self, criteria: &UserCriteria) -> Vec<&User> {
        let mut users: Vec<&User> = self
            .staged
            .users
            .values()
            .filter(|u| user_matches(u, criteria))
            .collect();
        users.sort_by(|a, b| {
            a.profile
                .name
                .cmp(&b.profile.name)
                .then_with(|| a.profile.surname.cmp(&b.profile.surname))
        });
        users
    }
}

#[async_trait]
impl ArticleRepository for InMemoryUnitOfWork {
    async fn find_article(&mut self, article_id: ArticleId) -> Result<Option<Article>> {
        Ok(self.staged.articles.get(&article_id).cloned())
    }

    async fn save_article(&mut self, article: &Article) -> Result<()> {
        self.staged
            .articles
            .insert(article.article_id, article.clone());
        Ok(())
    }

    async fn delete_article(&mut self, article: &Article) -> Result<()> {
        self.staged
            .articles
            .remove(&article.article_id)
            .map(|_| ())
            .ok_or_else(|| not_persisted("Article", article.article_id))
    }

    async fn search_articles(
        &mut self,
        criteria: &ArticleCriteria,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>> {
        Ok(page(self.matching_articles(criteria), offset, limit))
    }

    async fn count_articles(&mut self, criteria: &ArticleCriteria) -> Result<i64> {
        Ok(self.matching_articles(criteria).len() as i64)
    }
}

#[async_trait]
impl BookingRepository for InMemoryUnitOfWork {
    async fn find_booking(&mut self, booking_id: BookingId) -> Result<Option<Booking>> {
        Ok(self.staged.bookings.get(&booking_id).cloned())
    }

    async fn save_booking(&mut self, booking: &Booking) -> Result<()> {
        self.staged
            .bookings
            .insert(booking.booking_id, booking.clone());
        Ok(())
    }

    async fn delete_booking(&mut self, booking: &Booking) -> Result<()> {
        self.staged
            .bookings
            .remove(&booking.booking_id)
            .map(|_| ())
            .ok_or_else(|| not_persisted("Booking", booking.booking_id))
    }

    async fn find_bookings_by_user(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Booking>> {
        Ok(page(self.bookings_of(user_id), offset, limit))
    }

    async fn count_bookings_by_user(&mut self, user_id: UserId) -> Result<i64> {
        Ok(self.bookings_of(user_id).len() as i64)
    }

    async fn find_active_booking(&mut self, article_id: ArticleId) -> Result<Option<Booking>> {
        Ok(self
            .staged
            .bookings
            .values()
            .find(|b| b.article_id == article_id && b.state == BookingState::Active)
            .cloned())
    }
}

#[async_trait]
impl LoanRepository for InMemoryUnitOfWork {
    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.staged.loans.get(&loan_id).cloned())
    }

    async fn save_loan(&mut self, loan: &Loan) -> Result<()> {
        self.staged.loans.insert(loan.loan_id, loan.clone());
        Ok(())
    }

    async fn delete_loan(&mut self, loan: &Loan) -> Result<()> {
        self.staged
            .loans
            .remove(&loan.loan_id)
            .map(|_| ())
            .ok_or_else(|| not_persisted("Loan", loan.loan_id))
    }

    async fn find_loans_by_user(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Loan>> {
        Ok(page(self.loans_of(user_id), offset, limit))
    }

    async fn count_loans_by_user(&mut self, user_id: UserId) -> Result<i64> {
        Ok(self.loans_of(user_id).len() as i64)
    }

    async fn find_current_loan(&mut self, article_id: ArticleId) -> Result<Option<Loan>> {
        Ok(self
            .staged
            .loans
            .values()
            .find(|l| l.article_id == article_id && l.state.is_outstanding())
            .cloned())
    }
}

#[async_trait]
impl UserRepository for InMemoryUnitOfWork {
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        Ok(self.staged.users.get(&user_id).cloned())
    }

    async fn save_user(&mut self, user: &User) -> Result<()> {
        let taken = self.staged.users.values().any(|other| {
            other.user_id != user.user_id && other.profile.email == user.profile.email
        });
        if taken {
            return Err(Box::new(DuplicateEmail(user.profile.email.clone())));
        }

        self.staged.users.insert(user.user_id, user.clone());
        Ok(())
    }

    async fn delete_user(&mut self, user: &User) -> Result<()> {
        self.staged
            .users
            .remove(&user.user_id)
            .map(|_| ())
            .ok_or_else(|| not_persisted("User", user.user_id))
    }

    async fn search_users(
        &mut self,
        criteria: &UserCriteria,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<User>> {
        Ok(page(self.matching_users(criteria), offset, limit))
    }

    async fn count_users(&mut self, criteria: &UserCriteria) -> Result<i64> {
        Ok(self.matching_users(criteria).len() as i64)
    }
}
