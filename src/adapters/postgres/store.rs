use crate::ports::{LibraryStore, Result, UnitOfWork};
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

/// LibraryStoreのPostgreSQL実装
///
/// 作業単位ごとに1つのトランザクションを開始する。
/// 資料の取得と、資料に対する有効な予約・未返却の貸出の取得は
/// `SELECT ... FOR UPDATE`で行ロックを取る。ロックは常に資料の行から取るため、
/// 同じ資料に触れるワークフローは資料の行で直列化され、デッドロックしない。
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// PostgreSQLコネクションプールから新しいストアを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LibraryStore for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }
}

/// PostgreSQLの作業単位
///
/// commitせずにdropされた場合、sqlxがトランザクションをロールバックする。
pub(super) struct PostgresUnitOfWork {
    pub(super) tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// 行データの変換エラー
pub(super) fn invalid_data(
    message: impl Into<String>,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::InvalidData,
        message.into(),
    ))
}

/// 永続化されていないエンティティの削除
pub(super) fn not_persisted(
    entity: &str,
    id: impl std::fmt::Display,
) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{} {} is not persisted", entity, id),
    ))
}
