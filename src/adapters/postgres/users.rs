use crate::domain::{EntityToken, User, UserId, UserProfile, UserRole};
use crate::ports::{DuplicateEmail, Result, UserCriteria, UserRepository};
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Row, postgres::PgRow};
use std::str::FromStr;

use super::store::{PostgresUnitOfWork, invalid_data, not_persisted};

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// メールアドレスの一意インデックス
const EMAIL_INDEX: &str = "idx_users_email_unique";

const USER_COLUMNS: &str =
    "user_id, token, name, surname, email, address, telephone_number, role";

/// PostgreSQLの行データをUserに変換する
fn map_row_to_user(row: &PgRow) -> Result<User> {
    let role_str: &str = row.get("role");
    let role = UserRole::from_str(role_str).map_err(invalid_data)?;

    Ok(User {
        user_id: UserId::from_uuid(row.get("user_id")),
        token: EntityToken::from_uuid(row.get("token")),
        profile: UserProfile {
            name: row.get("name"),
            surname: row.get("surname"),
            email: row.get("email"),
            address: row.get("address"),
            telephone_number: row.get("telephone_number"),
        },
        role,
    })
}

/// メールアドレスが指定された場合は完全一致のみ
fn push_user_filters(builder: &mut QueryBuilder<'_, Postgres>, criteria: &UserCriteria) {
    builder.push(" WHERE TRUE");

    if let Some(email) = &criteria.email {
        builder.push(" AND email = ").push_bind(email.clone());
        return;
    }
    if let Some(name) = &criteria.name {
        builder.push(" AND name = ").push_bind(name.clone());
    }
    if let Some(surname) = &criteria.surname {
        builder.push(" AND surname = ").push_bind(surname.clone());
    }
    if let Some(telephone_number) = &criteria.telephone_number {
        builder
            .push(" AND telephone_number = ")
            .push_bind(telephone_number.clone());
    }
}

#[async_trait]
impl UserRepository for PostgresUnitOfWork {
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE user_id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(user_id.value())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(map_row_to_user).transpose()
    }

    /// 利用者を保存（upsert）
    ///
    /// メールアドレスの一意インデックス違反は`DuplicateEmail`にする。
    async fn save_user(&mut self, user: &User) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                token,
                name,
                surname,
                email,
                address,
                telephone_number,
                role
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id)
            DO UPDATE SET
                name = EXCLUDED.name,
                surname = EXCLUDED.surname,
                email = EXCLUDED.email,
                address = EXCLUDED.address,
                telephone_number = EXCLUDED.telephone_number,
                role = EXCLUDED.role
            "#,
        )
        .bind(user.user_id.value())
        .bind(user.token.value())
        .bind(&user.profile.name)
        .bind(&user.profile.surname)
        .bind(&user.profile.email)
        .bind(&user.profile.address)
        .bind(&user.profile.telephone_number)
        .bind(user.role.as_str())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.constraint() == Some(EMAIL_INDEX) => {
                Box::new(DuplicateEmail(user.profile.email.clone())) as BoxedError
            }
            other => other.into(),
        })?;

        Ok(())
    }

    async fn delete_user(&mut self, user: &User) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user.user_id.value())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_persisted("User", user.user_id));
        }
        Ok(())
    }

    /// 名前、姓の昇順
    async fn search_users(
        &mut self,
        criteria: &UserCriteria,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<User>> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM users", USER_COLUMNS));
        push_user_filters(&mut builder, criteria);
        builder
            .push(" ORDER BY name ASC, surname ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder.build().fetch_all(&mut *self.tx).await?;

        rows.iter().map(map_row_to_user).collect()
    }

    async fn count_users(&mut self, criteria: &UserCriteria) -> Result<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS count FROM users");
        push_user_filters(&mut builder, criteria);

        let row = builder.build().fetch_one(&mut *self.tx).await?;
        Ok(row.get("count"))
    }
}
