use crate::domain::{ArticleId, EntityToken, Loan, LoanId, LoanState, UserId};
use crate::ports::{LoanRepository, Result};
use async_trait::async_trait;
use sqlx::{Row, postgres::PgRow};
use std::str::FromStr;

use super::store::{PostgresUnitOfWork, invalid_data, not_persisted};

/// PostgreSQLの行データをLoanに変換する
fn map_row_to_loan(row: &PgRow) -> Result<Loan> {
    let state_str: &str = row.get("state");
    let state = LoanState::from_str(state_str).map_err(invalid_data)?;

    Ok(Loan {
        loan_id: LoanId::from_uuid(row.get("loan_id")),
        token: EntityToken::from_uuid(row.get("token")),
        article_id: ArticleId::from_uuid(row.get("article_id")),
        user_id: UserId::from_uuid(row.get("user_id")),
        loan_date: row.get("loan_date"),
        due_date: row.get("due_date"),
        renewed: row.get("renewed"),
        state,
    })
}

#[async_trait]
impl LoanRepository for PostgresUnitOfWork {
    /// IDで貸出を取得
    ///
    /// 行ロックは取らない。更新する側は資料の行を先にロックしてから読み直す。
    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT loan_id, token, article_id, user_id, loan_date, due_date, renewed, state
            FROM loans
            WHERE loan_id = $1
            "#,
        )
        .bind(loan_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// 貸出を保存（upsert）
    async fn save_loan(&mut self, loan: &Loan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                token,
                article_id,
                user_id,
                loan_date,
                due_date,
                renewed,
                state
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (loan_id)
            DO UPDATE SET
                due_date = EXCLUDED.due_date,
                renewed = EXCLUDED.renewed,
                state = EXCLUDED.state
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.token.value())
        .bind(loan.article_id.value())
        .bind(loan.user_id.value())
        .bind(loan.loan_date)
        .bind(loan.due_date)
        .bind(loan.renewed)
        .bind(loan.state.as_str())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_loan(&mut self, loan: &Loan) -> Result<()> {
        let result = sqlx::query("DELETE FROM loans WHERE loan_id = $1")
            .bind(loan.loan_id.value())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_persisted("Loan", loan.loan_id));
        }
        Ok(())
    }

    /// 利用者の貸出（状態の昇順、返却期限の降順）
    async fn find_loans_by_user(
        &mut self,
        user_id: UserId,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Loan>> {
        let rows = sqlx::query(
            r#"
            SELECT loan_id, token, article_id, user_id, loan_date, due_date, renewed, state
            FROM loans
            WHERE user_id = $1
            ORDER BY
                CASE state
                    WHEN 'ACTIVE' THEN 0
                    WHEN 'OVERDUE' THEN 1
                    ELSE 2
                END ASC,
                due_date DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id.value())
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *self.tx)
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    async fn count_loans_by_user(&mut self, user_id: UserId) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM loans WHERE user_id = $1")
            .bind(user_id.value())
            .fetch_one(&mut *self.tx)
            .await?;

        Ok(row.get("count"))
    }

    /// 資料に対する未返却の貸出（行ロック）
    async fn find_current_loan(&mut self, article_id: ArticleId) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT loan_id, token, article_id, user_id, loan_date, due_date, renewed, state
            FROM loans
            WHERE article_id = $1 AND state IN ('ACTIVE', 'OVERDUE')
            FOR UPDATE
            "#,
        )
        .bind(article_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }
}
