use crate::domain::{User, UserId};
use async_trait::async_trait;

use super::Result;

/// 利用者の検索条件
///
/// メールアドレスが指定された場合は完全一致検索になり、他の条件は無視される。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserCriteria {
    pub email: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub telephone_number: Option<String>,
}

/// メールアドレスの重複
///
/// ストアが保存時に一意性の違反を検出した場合に返す。
#[derive(Debug, thiserror::Error)]
#[error("Email {0} already registered")]
pub struct DuplicateEmail(pub String);

/// 利用者リポジトリポート
///
/// 検索結果は名前、姓の昇順で並ぶ。
#[async_trait]
pub trait UserRepository: Send {
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<User>>;

    /// 新規ならINSERT、既存ならUPDATE（upsert）
    ///
    /// 他の利用者と同じメールアドレスなら`DuplicateEmail`。
    async fn save_user(&mut self, user: &User) -> Result<()>;

    /// 永続化されていない利用者の削除はエラー
    async fn delete_user(&mut self, user: &User) -> Result<()>;

    async fn search_users(
        &mut self,
        criteria: &UserCriteria,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<User>>;

    async fn count_users(&mut self, criteria: &UserCriteria) -> Result<i64>;
}
