use crate::domain::{Article, ArticleId};
use async_trait::async_trait;
use chrono::NaiveDate;

use super::Result;

/// 資料の検索条件
///
/// ISBN / ISSN / ISAN のいずれかが指定された場合はその識別子の完全一致検索になり、
/// 他の条件は無視される。それ以外は指定された条件すべての完全一致（AND）。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleCriteria {
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
}

impl ArticleCriteria {
    /// 識別子による完全一致検索か
    pub fn is_identifier_lookup(&self) -> bool {
        self.isbn.is_some() || self.issn.is_some() || self.isan.is_some()
    }
}

/// 資料リポジトリポート
///
/// 検索結果は出版年の降順、タイトルの昇順で並ぶ。
#[async_trait]
pub trait ArticleRepository: Send {
    async fn find_article(&mut self, article_id: ArticleId) -> Result<Option<Article>>;

    /// 新規ならINSERT、既存ならUPDATE（upsert）
    async fn save_article(&mut self, article: &Article) -> Result<()>;

    /// 永続化されていない資料の削除はエラー
    async fn delete_article(&mut self, article: &Article) -> Result<()>;

    async fn search_articles(
        &mut self,
        criteria: &ArticleCriteria,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>>;

    async fn count_articles(&mut self, criteria: &ArticleCriteria) -> Result<i64>;
}
