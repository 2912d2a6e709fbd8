use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::domain::{self, Booking, Loan, User, UserId, commands::*};
use crate::ports::{DuplicateEmail, UserCriteria};

use super::booking_service::{count_bookings_by_user, get_bookings_by_user};
use super::dependencies::ServiceDependencies;
use super::errors::{ApplicationError, Result};
use super::loan_service::{count_loans_by_user, get_loans_by_user};

/// ダッシュボードに表示する予約・貸出の件数
pub const DASHBOARD_PREVIEW_SIZE: i64 = 5;

/// 利用者のダッシュボード
#[derive(Debug, Clone)]
pub struct UserDashboard {
    pub user: User,
    /// 取得に失敗した場合はNone
    pub bookings: Option<Vec<Booking>>,
    /// 取得に失敗した場合はNone
    pub loans: Option<Vec<Loan>>,
    pub total_bookings: i64,
    pub total_loans: i64,
}

/// 保存時のメールアドレス重複を入力エラーにする
fn email_conflict(e: Box<dyn std::error::Error + Send + Sync>) -> ApplicationError {
    if e.is::<DuplicateEmail>() {
        ApplicationError::InvalidArgument("Email already registered!".to_string())
    } else {
        ApplicationError::RepositoryError(e)
    }
}

/// 利用者を登録する
///
/// メールアドレスは一意。役割は常にCITIZEN。
pub async fn add_user(deps: &ServiceDependencies, cmd: AddUser) -> Result<UserId> {
    let mut uow = deps.store.begin().await?;

    let by_email = UserCriteria {
        email: Some(cmd.profile.email.clone()),
        ..Default::default()
    };
    if uow.count_users(&by_email).await? > 0 {
        return Err(ApplicationError::InvalidArgument(
            "Email already registered!".to_string(),
        ));
    }

    // 同時登録は保存時の一意性違反で検出する
    let user = domain::register_user(cmd.profile);
    uow.save_user(&user).await.map_err(email_conflict)?;
    uow.commit().await?;

    info!(user_id = %user.user_id, "User registered");

    Ok(user.user_id)
}

/// 利用者のプロフィールを更新する
///
/// 他の利用者のメールアドレスへの変更は`InvalidArgument`。
pub async fn update_user(deps: &ServiceDependencies, cmd: UpdateUser) -> Result<()> {
    let mut uow = deps.store.begin().await?;

    let user = uow
        .find_user(cmd.user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    let updated = domain::update_profile(&user, cmd.profile);
    uow.save_user(&updated).await.map_err(email_conflict)?;
    uow.commit().await?;

    info!(user_id = %updated.user_id, "User updated");

    Ok(())
}

/// 利用者を取得する
pub async fn get_user(deps: &ServiceDependencies, user_id: UserId) -> Result<User> {
    let mut uow = deps.store.begin().await?;

    uow.find_user(user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)
}

/// 利用者を検索する
///
/// メールアドレスが指定された場合は完全一致。名前、姓の昇順。
pub async fn search_users(
    deps: &ServiceDependencies,
    criteria: &UserCriteria,
    offset: i64,
    limit: i64,
) -> Result<Vec<User>> {
    let mut uow = deps.store.begin().await?;

    let users = uow.search_users(criteria, offset, limit).await?;
    if users.is_empty() {
        return Err(ApplicationError::NoResultsFound(
            "Search has given no results!".to_string(),
        ));
    }

    Ok(users)
}

/// 検索条件に一致する利用者の件数
pub async fn count_users(deps: &ServiceDependencies, criteria: &UserCriteria) -> Result<i64> {
    let mut uow = deps.store.begin().await?;
    Ok(uow.count_users(criteria).await?)
}

/// 利用者のダッシュボード
///
/// 予約・貸出の先頭5件は取得に失敗しても（0件を含む）省略して続行する。
/// 利用者の取得と総件数の失敗はそのまま返す。
pub async fn get_user_dashboard(
    deps: &ServiceDependencies,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<UserDashboard> {
    let user = get_user(deps, user_id).await?;

    let (bookings, loans) = futures::join!(
        get_bookings_by_user(deps, user_id, 0, DASHBOARD_PREVIEW_SIZE, now),
        get_loans_by_user(deps, user_id, 0, DASHBOARD_PREVIEW_SIZE, now),
    );

    let bookings = bookings
        .inspect_err(|e| debug!(user_id = %user_id, error = %e, "Dashboard bookings omitted"))
        .ok();
    let loans = loans
        .inspect_err(|e| debug!(user_id = %user_id, error = %e, "Dashboard loans omitted"))
        .ok();

    let total_bookings = count_bookings_by_user(deps, user_id).await?;
    let total_loans = count_loans_by_user(deps, user_id).await?;

    Ok(UserDashboard {
        user,
        bookings,
        loans,
        total_bookings,
        total_loans,
    })
}
