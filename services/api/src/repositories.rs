//! Repositories for database operations

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::error::ApiError;
use crate::models::category::Category;

pub mod post;
pub mod stats;
pub mod user;

/// Category repository for database operations
#[derive(Clone)]
pub struct CategoryRepository {
    pool: PgPool,
}

impl CategoryRepository {
    /// Create a new category repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn from_row(row: &PgRow) -> Category {
        Category {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Get all categories, alphabetically
    pub async fn list(&self) -> Result<Vec<Category>, ApiError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, created_at, updated_at
            FROM categories
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::from_row).collect())
    }

    /// Create a new category
    pub async fn create(&self, name: &str) -> Result<Category, ApiError> {
        let row = sqlx::query(
            r#"
            INSERT INTO categories (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(ApiError::from_unique_violation)?;

        Ok(Self::from_row(&row))
    }

    /// Rename a category
    pub async fn update(&self, id: Uuid, name: &str) -> Result<Category, ApiError> {
        let row = sqlx::query(
            r#"
            UPDATE categories
            SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(ApiError::from_unique_violation)?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

        Ok(Self::from_row(&row))
    }

    /// Delete a category; posts referencing it become uncategorized via the
    /// ON DELETE SET NULL foreign key
    pub async fn delete(&self, id: Uuid) -> Result<Category, ApiError> {
        let row = sqlx::query(
            r#"
            DELETE FROM categories
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("Category not found".to_string()))?;

        Ok(Self::from_row(&row))
    }

    /// Resolve a category name to its id, creating the category when new
    pub async fn find_or_create(&self, name: &str) -> Result<Uuid, ApiError> {
        // The no-op update makes RETURNING yield the id on conflict as well
        let row = sqlx::query(
            r#"
            INSERT INTO categories (name)
            VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("id"))
    }
}
