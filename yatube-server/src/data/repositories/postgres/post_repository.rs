use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::data::post_repository::{NewPost, PostFilter, PostPatch, PostRepository};
use crate::domain::error::DomainError;
use crate::domain::pagination::Pagination;
use crate::domain::post::{Author, GroupRef, Post};

#[derive(Debug, Clone)]
pub(crate) struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    text: String,
    created_at: DateTime<Utc>,
    author_id: i64,
    author_username: String,
    group_id: Option<i64>,
    group_slug: Option<String>,
    group_title: Option<String>,
}

// Shared projection; `p` is the posts row source, joined with author and group.
const POST_COLUMNS: &str = r#"
    p.id,
    p.text,
    p.created_at,
    p.author_id,
    u.username AS author_username,
    p.group_id,
    g.slug AS group_slug,
    g.title AS group_title
"#;

const POST_JOINS: &str = r#"
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id
"#;

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create_post(&self, input: NewPost) -> Result<Post, DomainError> {
        let sql = format!(
            r#"
            WITH p AS (
                INSERT INTO posts (text, author_id, group_id)
                VALUES ($1, $2, $3)
                RETURNING id, text, author_id, group_id, created_at
            )
            SELECT {POST_COLUMNS}
            FROM p
            {POST_JOINS}
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(&input.text)
            .bind(input.author_id)
            .bind(input.group_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| map_insert_error(err, input.author_id))?;

        map_row_to_post(row)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, DomainError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            {POST_JOINS}
            WHERE p.id = $1
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_post_db_error)?;

        row.map(map_row_to_post).transpose()
    }

    async fn update_post_owned(
        &self,
        post_id: i64,
        owner_id: i64,
        patch: PostPatch,
    ) -> Result<Option<Post>, DomainError> {
        let sql = format!(
            r#"
            WITH p AS (
                UPDATE posts
                SET text = $3,
                    group_id = $4
                WHERE id = $1 AND author_id = $2
                RETURNING id, text, author_id, group_id, created_at
            )
            SELECT {POST_COLUMNS}
            FROM p
            {POST_JOINS}
            "#
        );

        let row = sqlx::query_as::<_, PostRow>(&sql)
            .bind(post_id)
            .bind(owner_id)
            .bind(&patch.text)
            .bind(patch.group_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_post_db_error)?;

        row.map(map_row_to_post).transpose()
    }

    async fn list_posts(
        &self,
        filter: PostFilter,
        pagination: Pagination,
    ) -> Result<Vec<Post>, DomainError> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            {POST_JOINS}
            WHERE ($1::BIGINT IS NULL OR p.group_id = $1)
              AND ($2::BIGINT IS NULL OR p.author_id = $2)
            ORDER BY p.created_at DESC, p.id DESC
            LIMIT $3
            OFFSET $4
            "#
        );

        let rows = sqlx::query_as::<_, PostRow>(&sql)
            .bind(filter.group_id())
            .bind(filter.author_id())
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(&self.pool)
            .await
            .map_err(map_post_db_error)?;

        rows.into_iter().map(map_row_to_post).collect()
    }

    async fn count_posts(&self, filter: PostFilter) -> Result<i64, DomainError> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM posts p
            WHERE ($1::BIGINT IS NULL OR p.group_id = $1)
              AND ($2::BIGINT IS NULL OR p.author_id = $2)
            "#,
        )
        .bind(filter.group_id())
        .bind(filter.author_id())
        .fetch_one(&self.pool)
        .await
        .map_err(map_post_db_error)
    }
}

fn map_row_to_post(row: PostRow) -> Result<Post, DomainError> {
    let author = Author {
        id: row.author_id,
        username: row.author_username,
    };
    let group = match (row.group_id, row.group_slug, row.group_title) {
        (Some(id), Some(slug), Some(title)) => Some(GroupRef { id, slug, title }),
        _ => None,
    };

    Post::new(row.id, row.text, author, group, row.created_at)
        .map_err(|err| DomainError::Unexpected(err.to_string()))
}

fn map_post_db_error(err: sqlx::Error) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some("23503")
        && db_err.constraint() == Some("posts_group_id_fkey")
    {
        return DomainError::NotFound("group".to_string());
    }
    DomainError::Unexpected(err.to_string())
}

fn map_insert_error(err: sqlx::Error, author_id: i64) -> DomainError {
    if let sqlx::Error::Database(db_err) = &err
        && db_err.code().as_deref() == Some("23503")
        && db_err.constraint() == Some("posts_author_id_fkey")
    {
        return DomainError::UnknownAuthor(author_id);
    }
    map_post_db_error(err)
}
