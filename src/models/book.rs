//! Book (catalog title) model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};

/// Shelving categories offered to catalogers
pub const CATEGORIES: [&str; 8] = [
    "Fiction",
    "Non-Fiction",
    "Science",
    "Mathematics",
    "History",
    "Literature",
    "Reference",
    "Comics",
];

/// A catalog title and its copy counts.
///
/// `available_copies` is owned by the store: it only changes inside the
/// atomic issue/return operations or a stock adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    /// ISBN or local catalog code
    pub isbn: Option<String>,
    pub subject: Option<String>,
    pub category: Option<String>,
    pub shelf_row: Option<String>,
    pub shelf: Option<String>,
    pub unit_price: Option<Decimal>,
    pub total_copies: i32,
    pub available_copies: i32,
    pub added_by: String,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Book {
    /// Build a new title with every copy on the shelf
    pub fn new(create: CreateBook, added_by: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: create.title.trim().to_string(),
            author: create.author.trim().to_string(),
            isbn: create.isbn,
            subject: create.subject,
            category: create.category,
            shelf_row: create.shelf_row,
            shelf: create.shelf,
            unit_price: create.unit_price,
            total_copies: create.total_copies,
            available_copies: create.total_copies,
            added_by: added_by.to_string(),
            added_at: now,
            updated_at: now,
        }
    }

    /// Copies currently out on loan
    pub fn on_loan(&self) -> i32 {
        self.total_copies - self.available_copies
    }

    /// Counts after adding (or retiring, when negative) `delta` physical copies.
    pub fn stock_after(&self, delta: i32) -> AppResult<(i32, i32)> {
        let (Some(total), Some(available)) = (
            self.total_copies.checked_add(delta),
            self.available_copies.checked_add(delta),
        ) else {
            return Err(AppError::Validation(format!(
                "Adjusting book {} by {} exceeds the supported copy count",
                self.id, delta
            )));
        };
        if available < 0 || available > total {
            return Err(AppError::invariant(format!(
                "Adjusting book {} by {} would leave {}/{} copies available ({} on loan)",
                self.id,
                delta,
                available,
                total,
                self.on_loan()
            )));
        }
        Ok((total, available))
    }

    /// Case-insensitive substring match on title, author, subject or catalog code.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        let hit = |field: &str| field.to_lowercase().contains(needle);
        hit(&self.title)
            || hit(&self.author)
            || self.subject.as_deref().is_some_and(hit)
            || self.isbn.as_deref().is_some_and(hit)
    }

    pub fn apply_update(&mut self, update: UpdateBook, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title.trim().to_string();
        }
        if let Some(author) = update.author {
            self.author = author.trim().to_string();
        }
        if update.isbn.is_some() {
            self.isbn = update.isbn;
        }
        if update.subject.is_some() {
            self.subject = update.subject;
        }
        if update.category.is_some() {
            self.category = update.category;
        }
        if update.shelf_row.is_some() {
            self.shelf_row = update.shelf_row;
        }
        if update.shelf.is_some() {
            self.shelf = update.shelf;
        }
        if update.unit_price.is_some() {
            self.unit_price = update.unit_price;
        }
        self.updated_at = now;
    }
}

fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut error = validator::ValidationError::new("blank");
        error.message = Some("must not be blank".into());
        return Err(error);
    }
    Ok(())
}

/// Create book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBook {
    #[validate(custom(function = "not_blank", message = "Title is required"))]
    pub title: String,
    #[validate(custom(function = "not_blank", message = "Author is required"))]
    pub author: String,
    #[validate(range(min = 1, message = "A book needs at least one copy"))]
    pub total_copies: i32,
    pub isbn: Option<String>,
    pub subject: Option<String>,
    pub category: Option<String>,
    pub shelf_row: Option<String>,
    pub shelf: Option<String>,
    pub unit_price: Option<Decimal>,
}

/// Metadata edit; copy counts are changed through stock adjustments only
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBook {
    #[validate(custom(function = "not_blank", message = "Title must not be blank"))]
    pub title: Option<String>,
    #[validate(custom(function = "not_blank", message = "Author must not be blank"))]
    pub author: Option<String>,
    pub isbn: Option<String>,
    pub subject: Option<String>,
    pub category: Option<String>,
    pub shelf_row: Option<String>,
    pub shelf: Option<String>,
    pub unit_price: Option<Decimal>,
}

/// Add or retire physical copies
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdjustStock {
    /// Positive to add copies, negative to retire them
    pub delta: i32,
}

/// Catalog search query
#[derive(Debug, Clone, Default, Deserialize, IntoParams, ToSchema)]
pub struct BookQuery {
    /// Matched against title, author, subject and ISBN
    pub q: Option<String>,
    pub category: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl BookQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 200)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    /// Lowercased, trimmed search text
    pub fn needle(&self) -> String {
        self.q.as_deref().unwrap_or("").trim().to_lowercase()
    }
}

/// Aggregate copy counts across the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, FromRow, ToSchema)]
pub struct CatalogTotals {
    pub titles: i64,
    pub total_copies: i64,
    pub available_copies: i64,
}

/// One page of catalog search results, newest titles first
#[derive(Debug, Serialize, ToSchema)]
pub struct BookPage {
    pub books: Vec<Book>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}
