use crate::domain::{
    Article, ArticleDetails, ArticleId, ArticleKind, ArticleState, ArticleType, EntityToken,
};
use crate::ports::{ArticleCriteria, ArticleRepository, Result};
use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder, Row, postgres::PgRow};
use std::str::FromStr;

use super::store::{PostgresUnitOfWork, invalid_data, not_persisted};

const ARTICLE_COLUMNS: &str = r#"
    article_id,
    token,
    article_type,
    location,
    title,
    year_edition,
    publisher,
    genre,
    description,
    state,
    isbn,
    author,
    issn,
    issue_number,
    isan,
    director
"#;

/// 種別ごとの列を取り出す（NULLは変換エラー）
fn required<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: for<'r> sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    let value: Option<T> = row.try_get(column)?;
    value.ok_or_else(|| invalid_data(format!("{} must not be NULL", column)))
}

/// PostgreSQLの行データをArticleに変換する
fn map_row_to_article(row: &PgRow) -> Result<Article> {
    let article_type_str: &str = row.get("article_type");
    let article_type = ArticleType::from_str(article_type_str).map_err(invalid_data)?;

    let state_str: &str = row.get("state");
    let state = ArticleState::from_str(state_str).map_err(invalid_data)?;

    let kind = match article_type {
        ArticleType::Book => ArticleKind::Book {
            isbn: required(row, "isbn")?,
            author: required(row, "author")?,
        },
        ArticleType::Magazine => ArticleKind::Magazine {
            issn: required(row, "issn")?,
            issue_number: required(row, "issue_number")?,
        },
        ArticleType::MovieDvd => ArticleKind::MovieDvd {
            isan: required(row, "isan")?,
            director: required(row, "director")?,
        },
    };

    Ok(Article {
        article_id: ArticleId::from_uuid(row.get("article_id")),
        token: EntityToken::from_uuid(row.get("token")),
        details: ArticleDetails {
            location: row.get("location"),
            title: row.get("title"),
            year_edition: row.get("year_edition"),
            publisher: row.get("publisher"),
            genre: row.get("genre"),
            description: row.get("description"),
        },
        state,
        kind,
    })
}

/// 検索条件をWHERE句として追加する
///
/// ISBN / ISSN / ISAN が指定された場合はその識別子の完全一致のみ。
fn push_article_filters(builder: &mut QueryBuilder<'_, Postgres>, criteria: &ArticleCriteria) {
    builder.push(" WHERE TRUE");

    if let Some(isbn) = &criteria.isbn {
        builder.push(" AND article_type = 'BOOK' AND isbn = ");
        builder.push_bind(isbn.clone());
        return;
    }
    if let Some(issn) = &criteria.issn {
        builder.push(" AND article_type = 'MAGAZINE' AND issn = ");
        builder.push_bind(issn.clone());
        return;
    }
    if let Some(isan) = &criteria.isan {
        builder.push(" AND article_type = 'MOVIEDVD' AND isan = ");
        builder.push_bind(isan.clone());
        return;
    }

    if let Some(title) = &criteria.title {
        builder.push(" AND title = ").push_bind(title.clone());
    }
    if let Some(genre) = &criteria.genre {
        builder.push(" AND genre = ").push_bind(genre.clone());
    }
    if let Some(publisher) = &criteria.publisher {
        builder.push(" AND publisher = ").push_bind(publisher.clone());
    }
    if let Some(year_edition) = criteria.year_edition {
        builder.push(" AND year_edition = ").push_bind(year_edition);
    }
    if let Some(author) = &criteria.author {
        builder
            .push(" AND article_type = 'BOOK' AND author = ")
            .push_bind(author.clone());
    }
    if let Some(issue_number) = criteria.issue_number {
        builder
            .push(" AND article_type = 'MAGAZINE' AND issue_number = ")
            .push_bind(issue_number);
    }
    if let Some(director) = &criteria.director {
        builder
            .push(" AND article_type = 'MOVIEDVD' AND director = ")
            .push_bind(director.clone());
    }
}

#[async_trait]
impl ArticleRepository for PostgresUnitOfWork {
    /// IDで資料を取得（行ロック）
    async fn find_article(&mut self, article_id: ArticleId) -> Result<Option<Article>> {
        let sql = format!(
            "SELECT {} FROM articles WHERE article_id = $1 FOR UPDATE",
            ARTICLE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(article_id.value())
            .fetch_optional(&mut *self.tx)
            .await?;

        row.as_ref().map(map_row_to_article).transpose()
    }

    /// 資料を保存（upsert）
    ///
    /// 種別ごとの列は該当しない種別ではNULLになる。
    async fn save_article(&mut self, article: &Article) -> Result<()> {
        let (isbn, author, issn, issue_number, isan, director) = match &article.kind {
            ArticleKind::Book { isbn, author } => {
                (Some(isbn), Some(author), None, None, None, None)
            }
            ArticleKind::Magazine { issn, issue_number } => {
                (None, None, Some(issn), Some(*issue_number), None, None)
            }
            ArticleKind::MovieDvd { isan, director } => {
                (None, None, None, None, Some(isan), Some(director))
            }
        };

        sqlx::query(
            r#"
            INSERT INTO articles (
                article_id,
                token,
                article_type,
                location,
                title,
                year_edition,
                publisher,
                genre,
                description,
                state,
                isbn,
                author,
                issn,
                issue_number,
                isan,
                director
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (article_id)
            DO UPDATE SET
                article_type = EXCLUDED.article_type,
                location = EXCLUDED.location,
                title = EXCLUDED.title,
                year_edition = EXCLUDED.year_edition,
                publisher = EXCLUDED.publisher,
                genre = EXCLUDED.genre,
                description = EXCLUDED.description,
                state = EXCLUDED.state,
                isbn = EXCLUDED.isbn,
                author = EXCLUDED.author,
                issn = EXCLUDED.issn,
                issue_number = EXCLUDED.issue_number,
                isan = EXCLUDED.isan,
                director = EXCLUDED.director
            "#,
        )
        .bind(article.article_id.value())
        .bind(article.token.value())
        .bind(article.kind.article_type().as_str())
        .bind(&article.details.location)
        .bind(&article.details.title)
        .bind(article.details.year_edition)
        .bind(&article.details.publisher)
        .bind(&article.details.genre)
        .bind(&article.details.description)
        .bind(article.state.as_str())
        .bind(isbn)
        .bind(author)
        .bind(issn)
        .bind(issue_number)
        .bind(isan)
        .bind(director)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn delete_article(&mut self, article: &Article) -> Result<()> {
        let result = sqlx::query("DELETE FROM articles WHERE article_id = $1")
            .bind(article.article_id.value())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(not_persisted("Article", article.article_id));
        }
        Ok(())
    }

    /// 出版年の降順、タイトルの昇順
    async fn search_articles(
        &mut self,
        criteria: &ArticleCriteria,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Article>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM articles",
            ARTICLE_COLUMNS
        ));
        push_article_filters(&mut builder, criteria);
        builder
            .push(" ORDER BY year_edition DESC, title ASC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let rows = builder.build().fetch_all(&mut *self.tx).await?;

        rows.iter().map(map_row_to_article).collect()
    }

    async fn count_articles(&mut self, criteria: &ArticleCriteria) -> Result<i64> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) AS count FROM articles");
        push_article_filters(&mut builder, criteria);

        let row = builder.build().fetch_one(&mut *self.tx).await?;
        Ok(row.get("count"))
    }
}
