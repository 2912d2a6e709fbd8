use chrono::{DateTime, Utc};
use tracing::info;

use crate::domain::{self, ArticleState, Loan, LoanId, UserId, commands::*};

use super::dependencies::ServiceDependencies;
use super::errors::{ApplicationError, Result};
use super::refresh::{refresh_article, refresh_booking, refresh_loan};

/// 資料を貸し出す
///
/// ビジネスルール：
/// - 利用者・資料が存在すること
/// - BOOKEDの資料は予約者本人にのみ貸し出せる（予約はCOMPLETEDになる）
/// - 貸出中・利用不可の資料は貸し出せない
/// - 貸出期間は1か月
///
/// # 戻り値
/// 成功時は作成された貸出のID
pub async fn register_loan(deps: &ServiceDependencies, cmd: RegisterLoan) -> Result<LoanId> {
    let mut uow = deps.store.begin().await?;

    // 1. 利用者の存在確認
    uow.find_user(cmd.user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    // 2. 資料の取得と遅延検証
    let article = uow
        .find_article(cmd.article_id)
        .await?
        .ok_or(ApplicationError::ArticleNotFound)?;
    let article = refresh_article(uow.as_mut(), article, cmd.loaned_at).await?;

    // 3. 予約済みなら有効な予約を取得
    let active_booking = if article.state == ArticleState::Booked {
        uow.find_active_booking(article.article_id).await?
    } else {
        None
    };

    // 4. ドメイン層の純粋関数を呼び出し
    let registration = domain::register_loan(
        &article,
        cmd.user_id,
        active_booking.as_ref(),
        cmd.loaned_at,
    )?;

    // 5. 保存
    if let Some(completed) = &registration.completed_booking {
        uow.save_booking(completed).await?;
    }
    uow.save_article(&registration.article).await?;
    uow.save_loan(&registration.loan).await?;
    uow.commit().await?;

    info!(
        loan_id = %registration.loan.loan_id,
        article_id = %registration.article.article_id,
        user_id = %registration.loan.user_id,
        due_date = %registration.loan.due_date,
        completed_booking = registration.completed_booking.is_some(),
        "Loan registered"
    );

    Ok(registration.loan.loan_id)
}

/// 資料を返却する
///
/// ビジネスルール：
/// - 返却済みの貸出は返却できない（延滞中は受け付ける）
/// - 待っている予約があれば資料はBOOKEDに戻り、予約の期限が now + 3日 になる
/// - 資料が削除済みでも貸出はRETURNEDにする
pub async fn register_return(deps: &ServiceDependencies, cmd: RegisterReturn) -> Result<()> {
    let mut uow = deps.store.begin().await?;

    let loan = uow
        .find_loan(cmd.loan_id)
        .await?
        .ok_or(ApplicationError::LoanNotFound)?;

    if loan.state == domain::LoanState::Returned {
        return Err(domain::ReturnLoanError::AlreadyReturned.into());
    }

    // 資料の行を先にロックしてから貸出を読み直す
    let article = uow.find_article(loan.article_id).await?;
    let loan = uow
        .find_loan(cmd.loan_id)
        .await?
        .ok_or(ApplicationError::LoanNotFound)?;

    let Some(article) = article else {
        let returned = domain::close_loan(&loan)?;
        uow.save_loan(&returned).await?;
        uow.commit().await?;

        info!(
            loan_id = %returned.loan_id,
            article_id = %returned.article_id,
            "Return registered for removed article"
        );
        return Ok(());
    };

    // 延滞でUNAVAILABLEになった資料にも予約が待っていることがある
    let pending_booking = match uow.find_active_booking(article.article_id).await? {
        Some(booking) => Some(refresh_booking(uow.as_mut(), booking, cmd.returned_at).await?),
        None => None,
    };

    let returned = domain::return_loan(
        &loan,
        &article,
        pending_booking.as_ref(),
        cmd.returned_at,
    )?;

    if let Some(booking) = &returned.refreshed_booking {
        uow.save_booking(booking).await?;
    }
    uow.save_article(&returned.article).await?;
    uow.save_loan(&returned.loan).await?;
    uow.commit().await?;

    info!(
        loan_id = %returned.loan.loan_id,
        article_id = %returned.article.article_id,
        article_state = returned.article.state.as_str(),
        "Return registered"
    );

    Ok(())
}

/// 貸出を延長する
///
/// ビジネスルール：
/// - ACTIVEのみ（延長前に延滞判定を行う）
/// - 延長は1回まで
/// - 他の利用者が予約している資料は延長できない
/// - 新しい返却期限は now + 1か月
pub async fn extend_loan(deps: &ServiceDependencies, cmd: ExtendLoan) -> Result<()> {
    let mut uow = deps.store.begin().await?;

    let loan = uow
        .find_loan(cmd.loan_id)
        .await?
        .ok_or(ApplicationError::LoanNotFound)?;
    let loan = refresh_loan(uow.as_mut(), loan, cmd.extended_at).await?;

    if loan.state != domain::LoanState::Active {
        // 延滞判定の結果は延長の失敗とは独立して残す
        uow.commit().await?;
        return Err(domain::ExtendLoanError::NotActive.into());
    }

    let article = uow
        .find_article(loan.article_id)
        .await?
        .ok_or(ApplicationError::ArticleNotFound)?;

    let extended = match domain::extend_loan(&loan, &article, cmd.extended_at) {
        Ok(extended) => extended,
        Err(e) => {
            // 延滞判定の結果は延長の失敗とは独立して残す
            uow.commit().await?;
            return Err(e.into());
        }
    };

    uow.save_loan(&extended).await?;
    uow.commit().await?;

    info!(
        loan_id = %extended.loan_id,
        due_date = %extended.due_date,
        "Loan extended"
    );

    Ok(())
}

/// 貸出を取得する（ACTIVEなら延滞を判定して保存）
pub async fn get_loan_info(
    deps: &ServiceDependencies,
    loan_id: LoanId,
    now: DateTime<Utc>,
) -> Result<Loan> {
    let mut uow = deps.store.begin().await?;

    let loan = uow
        .find_loan(loan_id)
        .await?
        .ok_or(ApplicationError::LoanNotFound)?;
    let loan = refresh_loan(uow.as_mut(), loan, now).await?;

    uow.commit().await?;
    Ok(loan)
}

/// 借りた利用者（検証も保存もしない）
pub async fn get_loan_owner(deps: &ServiceDependencies, loan_id: LoanId) -> Result<UserId> {
    let mut uow = deps.store.begin().await?;

    uow.find_loan(loan_id)
        .await?
        .map(|loan| loan.user_id)
        .ok_or(ApplicationError::LoanNotFound)
}

/// 利用者の貸出を取得する
///
/// 状態の昇順（ACTIVEが先頭）、返却期限の降順。
pub async fn get_loans_by_user(
    deps: &ServiceDependencies,
    user_id: UserId,
    offset: i64,
    limit: i64,
    now: DateTime<Utc>,
) -> Result<Vec<Loan>> {
    let mut uow = deps.store.begin().await?;

    uow.find_user(user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    let loans = uow.find_loans_by_user(user_id, offset, limit).await?;
    if loans.is_empty() {
        return Err(ApplicationError::NoResultsFound(
            "No loans relative to the specified user found!".to_string(),
        ));
    }

    // 資料のロック順を揃えるため、検証は資料IDの順に行う
    let mut indexed: Vec<(usize, Loan)> = loans.into_iter().enumerate().collect();
    indexed.sort_by_key(|(_, loan)| loan.article_id);

    let mut validated = Vec::with_capacity(indexed.len());
    for (position, loan) in indexed {
        validated.push((position, refresh_loan(uow.as_mut(), loan, now).await?));
    }
    validated.sort_by_key(|(position, _)| *position);

    uow.commit().await?;
    Ok(validated.into_iter().map(|(_, loan)| loan).collect())
}

/// 利用者の貸出件数
pub async fn count_loans_by_user(deps: &ServiceDependencies, user_id: UserId) -> Result<i64> {
    let mut uow = deps.store.begin().await?;

    uow.find_user(user_id)
        .await?
        .ok_or(ApplicationError::UserNotFound)?;

    Ok(uow.count_loans_by_user(user_id).await?)
}
