//! Catalog management service

use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        actor::Actor,
        book::{Book, BookPage, BookQuery, CreateBook, UpdateBook, CATEGORIES},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a title with every copy on the shelf
    pub async fn add_book(&self, create: CreateBook, actor: &Actor) -> AppResult<Book> {
        create.validate()?;
        let book = Book::new(create, &actor.id, Utc::now());
        self.repository.insert_book(&book).await?;
        tracing::info!(
            book_id = %book.id,
            copies = book.total_copies,
            actor = %actor.id,
            "Book added to catalog"
        );
        Ok(book)
    }

    pub async fn get_book(&self, id: Uuid) -> AppResult<Book> {
        self.repository.get_book(id).await
    }

    pub async fn update_book(&self, id: Uuid, update: UpdateBook) -> AppResult<Book> {
        update.validate()?;
        self.repository.update_book(id, update, Utc::now()).await
    }

    /// Add (`delta > 0`) or retire (`delta < 0`) physical copies
    pub async fn adjust_stock(&self, id: Uuid, delta: i32, actor: &Actor) -> AppResult<Book> {
        if delta == 0 {
            return Err(AppError::Validation("Stock delta must not be zero".to_string()));
        }
        let book = self.repository.adjust_stock(id, delta, Utc::now()).await?;
        tracing::info!(
            book_id = %id,
            delta,
            total = book.total_copies,
            available = book.available_copies,
            actor = %actor.id,
            "Stock adjusted"
        );
        Ok(book)
    }

    pub async fn remove_book(&self, id: Uuid, actor: &Actor) -> AppResult<()> {
        self.repository.delete_book(id, Utc::now()).await?;
        tracing::info!(book_id = %id, actor = %actor.id, "Book removed from catalog");
        Ok(())
    }

    /// One page of the search sequence. Asking for page 1 again restarts it.
    pub async fn find_by_query(&self, query: &BookQuery) -> AppResult<BookPage> {
        let (books, total) = self.repository.search_books(query).await?;
        Ok(BookPage {
            books,
            total,
            page: query.page(),
            per_page: query.per_page(),
        })
    }

    pub fn categories(&self) -> Vec<&'static str> {
        CATEGORIES.to_vec()
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.repository.ping().await
    }
}
