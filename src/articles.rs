// ABOUTME: Blog article repository: twelve-column schema, CRUD, atomic counters, listing and search
// ABOUTME: Built entirely on the generic data layer; tags are stored as JSON text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Article Repository
//!
//! Provisioning creates the `articles` table and a full-text index over
//! `title` and `excerpt`. A failure to provision the index is logged and
//! does not prevent the repository from opening; search then fails until
//! the index exists.

use crate::database::{
    ColumnSpec, ConnectionHandle, DatabaseResult, FieldValueMap, FromStoreRow, FullTextIndex,
    IndexProvisioning, SqlValue, StoreRow,
};
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Table holding articles
pub const ARTICLES_TABLE: &str = "articles";

/// Columns covered by the full-text index
pub const SEARCHABLE_COLUMNS: [&str; 2] = ["title", "excerpt"];

/// Stored article
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Store-generated identifier
    pub id: i64,
    /// Unique title
    pub title: String,
    /// Short summary
    pub excerpt: String,
    /// Author name
    pub author: String,
    /// Publication time
    pub date: DateTime<Utc>,
    /// Estimated reading time in minutes
    pub read_time: i32,
    /// Like counter
    pub likes: i32,
    /// Comment counter
    pub comments: i32,
    /// View counter
    pub views: i32,
    /// Category name
    pub category: String,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Shown on the front page
    pub featured: bool,
}

/// Article fields supplied by the caller on insert
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewArticle {
    /// Unique, non-empty title
    pub title: String,
    /// Short summary
    pub excerpt: String,
    /// Author name
    pub author: String,
    /// Publication time; defaults to now, truncated to whole seconds
    pub date: Option<DateTime<Utc>>,
    /// Estimated reading time in minutes
    pub read_time: i32,
    /// Category name
    pub category: String,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Shown on the front page
    pub featured: bool,
}

/// Filters and paging for [`ArticleStore::list`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListOptions {
    /// Maximum number of articles
    pub limit: i64,
    /// Articles to skip
    pub offset: i64,
    /// Only this category
    pub category: Option<String>,
    /// Only articles carrying this tag
    pub tag: Option<String>,
    /// Only featured articles
    pub featured_only: bool,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            offset: 0,
            category: None,
            tag: None,
            featured_only: false,
        }
    }
}

impl FromStoreRow for Article {
    fn from_store_row(row: &StoreRow) -> DatabaseResult<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            excerpt: row.get("excerpt")?,
            author: row.get("author")?,
            date: row.get("date")?,
            read_time: row.get("read_time")?,
            likes: row.get("likes")?,
            comments: row.get("comments")?,
            views: row.get("views")?,
            category: row.get("category")?,
            tags: row.get_json("tags")?.unwrap_or_default(),
            featured: row.get("featured")?,
        })
    }
}

/// Twelve-column `articles` schema
#[must_use]
pub fn articles_schema() -> Vec<ColumnSpec> {
    vec![
        ColumnSpec::new("id", "INT").primary_key(),
        ColumnSpec::new("title", "VARCHAR(255)").unique(),
        ColumnSpec::new("excerpt", "TEXT"),
        ColumnSpec::new("author", "VARCHAR(255)"),
        ColumnSpec::new("date", "TIMESTAMP").default_value("CURRENT_TIMESTAMP"),
        ColumnSpec::new("read_time", "INT").default_value("0"),
        ColumnSpec::new("likes", "INT").default_value("0"),
        ColumnSpec::new("comments", "INT").default_value("0"),
        ColumnSpec::new("views", "INT").default_value("0"),
        ColumnSpec::new("category", "VARCHAR(100)"),
        ColumnSpec::new("tags", "JSON"),
        ColumnSpec::new("featured", "BOOLEAN").default_value("false"),
    ]
}

/// Full-text index over the searchable article columns
#[must_use]
pub fn articles_index() -> FullTextIndex {
    FullTextIndex::new(ARTICLES_TABLE, SEARCHABLE_COLUMNS)
}

/// Counter columns that can be bumped atomically
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    /// `views`
    Views,
    /// `likes`
    Likes,
    /// `comments`
    Comments,
}

impl Counter {
    const fn column(self) -> &'static str {
        match self {
            Self::Views => "views",
            Self::Likes => "likes",
            Self::Comments => "comments",
        }
    }
}

/// Article repository borrowing a connection handle
pub struct ArticleStore<'a> {
    handle: &'a ConnectionHandle,
    index: FullTextIndex,
}

impl<'a> ArticleStore<'a> {
    /// Provision the table and full-text index, then return the repository
    ///
    /// # Errors
    ///
    /// Returns an error if the table cannot be created. Index provisioning
    /// failures are logged only.
    pub async fn open(handle: &'a ConnectionHandle) -> AppResult<Self> {
        handle
            .create_table(ARTICLES_TABLE, &articles_schema())
            .await?;
        let store = Self {
            handle,
            index: articles_index(),
        };
        match store.provision_index().await {
            Ok(outcome) => info!(?outcome, "Article search index ready"),
            Err(e) => warn!(error = %e, "Article search index unavailable"),
        }
        Ok(store)
    }

    /// Check for the full-text index and create it if missing
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog check or the creation fails
    pub async fn provision_index(&self) -> AppResult<IndexProvisioning> {
        Ok(self.handle.ensure_fulltext_index(&self.index).await?)
    }

    /// Insert an article and return it with its generated id
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty title, `ResourceAlreadyExists`
    /// for a duplicate title, or a database error
    pub async fn insert(&self, article: &NewArticle) -> AppResult<Article> {
        if article.title.trim().is_empty() {
            return Err(AppError::invalid_input("Article title must not be empty"));
        }
        let date = article.date.unwrap_or_else(now_seconds);
        let fields = FieldValueMap::new()
            .with("title", article.title.as_str())
            .with("excerpt", article.excerpt.as_str())
            .with("author", article.author.as_str())
            .with("date", date)
            .with("read_time", article.read_time)
            .with("likes", 0)
            .with("comments", 0)
            .with("views", 0)
            .with("category", article.category.as_str())
            .with("tags", SqlValue::json(&article.tags)?)
            .with("featured", article.featured);

        let id = self.handle.insert(ARTICLES_TABLE, &fields).await?;
        Ok(Article {
            id,
            title: article.title.clone(),
            excerpt: article.excerpt.clone(),
            author: article.author.clone(),
            date,
            read_time: article.read_time,
            likes: 0,
            comments: 0,
            views: 0,
            category: article.category.clone(),
            tags: article.tags.clone(),
            featured: article.featured,
        })
    }

    /// Fetch one article by id
    ///
    /// # Errors
    ///
    /// Returns a database error if the query or decoding fails
    pub async fn get(&self, id: i64) -> AppResult<Option<Article>> {
        let mut cursor = self
            .handle
            .select(ARTICLES_TABLE, &[], &by_id(id))
            .await?;
        Ok(cursor.next_as::<Article>().await?)
    }

    /// Overwrite every stored field of an article
    ///
    /// Returns whether a row with the article's id existed.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a non-positive id, `ResourceAlreadyExists`
    /// if the new title collides, or a database error
    pub async fn update(&self, article: &Article) -> AppResult<bool> {
        require_id(article.id)?;
        let fields = FieldValueMap::new()
            .with("title", article.title.as_str())
            .with("excerpt", article.excerpt.as_str())
            .with("author", article.author.as_str())
            .with("date", article.date)
            .with("read_time", article.read_time)
            .with("likes", article.likes)
            .with("comments", article.comments)
            .with("views", article.views)
            .with("category", article.category.as_str())
            .with("tags", SqlValue::json(&article.tags)?)
            .with("featured", article.featured);
        let updated = self
            .handle
            .update(ARTICLES_TABLE, &fields, &by_id(article.id))
            .await?;
        Ok(updated > 0)
    }

    /// Delete an article, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a non-positive id or a database error
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        require_id(id)?;
        let deleted = self.handle.delete(ARTICLES_TABLE, &by_id(id)).await?;
        Ok(deleted > 0)
    }

    /// Add one to a counter in a single store-side statement
    ///
    /// Returns whether the article exists.
    ///
    /// # Errors
    ///
    /// Returns a database error if the update fails
    pub async fn increment(&self, id: i64, counter: Counter) -> AppResult<bool> {
        let changed = self
            .handle
            .increment(ARTICLES_TABLE, counter.column(), 1, &by_id(id))
            .await?;
        Ok(changed > 0)
    }

    /// Count one more view
    ///
    /// # Errors
    ///
    /// Returns a database error if the update fails
    pub async fn increment_views(&self, id: i64) -> AppResult<bool> {
        self.increment(id, Counter::Views).await
    }

    /// Count one more like
    ///
    /// # Errors
    ///
    /// Returns a database error if the update fails
    pub async fn increment_likes(&self, id: i64) -> AppResult<bool> {
        self.increment(id, Counter::Likes).await
    }

    /// Count one more comment
    ///
    /// # Errors
    ///
    /// Returns a database error if the update fails
    pub async fn increment_comments(&self, id: i64) -> AppResult<bool> {
        self.increment(id, Counter::Comments).await
    }

    /// Newest articles first, filtered and paged
    ///
    /// # Errors
    ///
    /// Returns a database error if the query or decoding fails
    pub async fn list(&self, options: &ListOptions) -> AppResult<Vec<Article>> {
        let mut predicates = Vec::new();
        let mut params = Vec::new();
        if let Some(category) = &options.category {
            predicates.push("category = ?".to_owned());
            params.push(SqlValue::from(category.as_str()));
        }
        if options.featured_only {
            predicates.push("featured = ?".to_owned());
            params.push(SqlValue::Boolean(true));
        }
        if let Some(tag) = &options.tag {
            predicates.push(self.handle.dialect().json_array_contains("tags"));
            params.push(SqlValue::from(tag.as_str()));
        }
        let filter = if predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", predicates.join(" AND "))
        };
        params.push(SqlValue::Integer(options.limit));
        params.push(SqlValue::Integer(options.offset));

        let sql = format!(
            "SELECT * FROM {ARTICLES_TABLE}{filter} ORDER BY date DESC, id DESC LIMIT ? OFFSET ?"
        );
        Ok(self
            .handle
            .query(&sql, &params)
            .await?
            .collect_as::<Article>()
            .await?)
    }

    /// Relevance-ranked full-text search over title and excerpt
    ///
    /// # Errors
    ///
    /// Returns a database error if the index is missing or the query fails
    pub async fn search(&self, query: &str, limit: i64) -> AppResult<Vec<Article>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .handle
            .search(&self.index, query, limit)
            .await?
            .collect_as::<Article>()
            .await?)
    }

    /// Most recent articles
    ///
    /// # Errors
    ///
    /// Returns a database error if the query or decoding fails
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<Article>> {
        self.list(&ListOptions {
            limit,
            ..ListOptions::default()
        })
        .await
    }

    /// Up to `limit` featured articles in store order
    ///
    /// # Errors
    ///
    /// Returns a database error if the query or decoding fails
    pub async fn featured(&self, limit: usize) -> AppResult<Vec<Article>> {
        let filter = FieldValueMap::new().with("featured", true);
        let cursor = self.handle.select(ARTICLES_TABLE, &[], &filter).await?;
        Ok(cursor.take_as::<Article>(limit).await?)
    }

    /// Up to `limit` articles of one category in store order
    ///
    /// # Errors
    ///
    /// Returns a database error if the query or decoding fails
    pub async fn by_category(&self, category: &str, limit: usize) -> AppResult<Vec<Article>> {
        let filter = FieldValueMap::new().with("category", category);
        let cursor = self.handle.select(ARTICLES_TABLE, &[], &filter).await?;
        Ok(cursor.take_as::<Article>(limit).await?)
    }
}

fn by_id(id: i64) -> FieldValueMap {
    FieldValueMap::new().with("id", id)
}

fn require_id(id: i64) -> AppResult<()> {
    if id > 0 {
        Ok(())
    } else {
        Err(AppError::invalid_input(format!("Invalid article id {id}")))
    }
}

fn now_seconds() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now)
}
