//! Aggregate queries backing the admin dashboard

use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::error::ApiError;
use crate::models::post::Post;
use crate::repositories::post::{POST_COLUMNS, POST_FROM, post_from_row};

/// Site-wide totals for the dashboard header cards
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published_posts: i64,
    pub draft_posts: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_users: i64,
    pub total_categories: i64,
    /// Posts created in the last 30 days
    pub recent_posts: i64,
    /// Signups in the last 30 days
    pub recent_users: i64,
}

/// How many posts carry each category
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

/// Signups on one calendar day
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDay {
    pub date: String,
    pub count: i64,
}

/// Read-only repository over the analytics aggregates
#[derive(Clone)]
pub struct StatsRepository {
    pool: PgPool,
}

impl StatsRepository {
    /// Create a new stats repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// One round trip for all the dashboard totals
    ///
    /// SUM over bigint widens to numeric in Postgres, hence the casts.
    pub async fn dashboard(&self) -> Result<DashboardStats, ApiError> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM posts) AS total_posts,
                (SELECT COUNT(*) FROM posts WHERE status = 'Published') AS published_posts,
                (SELECT COUNT(*) FROM posts WHERE status = 'Draft') AS draft_posts,
                (SELECT COALESCE(SUM(views), 0)::BIGINT FROM posts) AS total_views,
                (SELECT COALESCE(SUM(likes), 0)::BIGINT FROM posts) AS total_likes,
                (SELECT COALESCE(SUM(comment_count), 0)::BIGINT FROM posts) AS total_comments,
                (SELECT COUNT(*) FROM users) AS total_users,
                (SELECT COUNT(*) FROM categories) AS total_categories,
                (SELECT COUNT(*) FROM posts
                 WHERE created_at >= NOW() - INTERVAL '30 days') AS recent_posts,
                (SELECT COUNT(*) FROM users
                 WHERE created_at >= NOW() - INTERVAL '30 days') AS recent_users
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DashboardStats {
            total_posts: row.get("total_posts"),
            published_posts: row.get("published_posts"),
            draft_posts: row.get("draft_posts"),
            total_views: row.get("total_views"),
            total_likes: row.get("total_likes"),
            total_comments: row.get("total_comments"),
            total_users: row.get("total_users"),
            total_categories: row.get("total_categories"),
            recent_posts: row.get("recent_posts"),
            recent_users: row.get("recent_users"),
        })
    }

    /// The five most recently created posts, any status
    pub async fn recent_posts(&self) -> Result<Vec<Post>, ApiError> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} {POST_FROM} ORDER BY p.created_at DESC LIMIT 5"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// The five most viewed published posts
    pub async fn top_posts(&self) -> Result<Vec<Post>, ApiError> {
        let rows = sqlx::query(&format!(
            "SELECT {POST_COLUMNS} {POST_FROM} \
             WHERE p.status = 'Published' ORDER BY p.views DESC LIMIT 5"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(post_from_row).collect())
    }

    /// Post counts per category, largest first; uncategorized posts are
    /// grouped under their rendered name
    pub async fn posts_by_category(&self) -> Result<Vec<CategoryCount>, ApiError> {
        let rows = sqlx::query(
            r#"
            SELECT COALESCE(c.name, 'Uncategorized') AS category, COUNT(*) AS count
            FROM posts p
            LEFT JOIN categories c ON c.id = p.category_id
            GROUP BY COALESCE(c.name, 'Uncategorized')
            ORDER BY count DESC, category
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| CategoryCount {
                category: row.get("category"),
                count: row.get("count"),
            })
            .collect())
    }

    /// Daily signup counts over the last 30 days, oldest day first
    pub async fn user_activity(&self) -> Result<Vec<ActivityDay>, ApiError> {
        let rows = sqlx::query(
            r#"
            SELECT to_char(created_at, 'YYYY-MM-DD') AS date, COUNT(*) AS count
            FROM users
            WHERE created_at >= NOW() - INTERVAL '30 days'
            GROUP BY to_char(created_at, 'YYYY-MM-DD')
            ORDER BY date
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| ActivityDay {
                date: row.get("date"),
                count: row.get("count"),
            })
            .collect())
    }
}
