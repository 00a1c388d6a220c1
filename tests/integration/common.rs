//! Shared fixtures

use librarium_server::{
    config::AppConfig,
    models::{
        actor::{Actor, Role},
        book::{Book, CreateBook},
        loan::{Borrower, IssueLoan},
    },
    repository::Repository,
    services::Services,
    AppState,
};
use uuid::Uuid;

pub fn services() -> (Services, Repository) {
    let repository = Repository::in_memory();
    let services = Services::new(repository.clone(), AppConfig::default().circulation);
    (services, repository)
}

pub fn app_state() -> AppState {
    AppState::new(AppConfig::default(), Repository::in_memory())
}

pub fn librarian() -> Actor {
    Actor::new("librarian-1", Role::Librarian)
}

pub fn borrower(name: &str, roll: &str) -> Borrower {
    Borrower {
        name: name.to_string(),
        roll: roll.to_string(),
        class_name: Some("6".to_string()),
        section: Some("A".to_string()),
    }
}

pub fn issue_to(book_id: Uuid, name: &str, roll: &str) -> IssueLoan {
    IssueLoan {
        book_id,
        borrower: borrower(name, roll),
        due_at: None,
    }
}

pub async fn add_book(services: &Services, title: &str, copies: i32) -> Book {
    services
        .catalog
        .add_book(
            CreateBook {
                title: title.to_string(),
                author: "Ruskin Bond".to_string(),
                total_copies: copies,
                isbn: None,
                subject: Some("Stories".to_string()),
                category: Some("Fiction".to_string()),
                shelf_row: Some("R2".to_string()),
                shelf: Some("S4".to_string()),
                unit_price: None,
            },
            &librarian(),
        )
        .await
        .expect("book should be created")
}

/// Issued loans on the book must account for every copy off the shelf
pub async fn assert_ledger_consistent(services: &Services, book_id: Uuid) {
    let book = services.catalog.get_book(book_id).await.unwrap();
    let issued = services
        .loans
        .list_loans(&librarium_server::models::LoanFilter {
            book_id: Some(book_id),
            ..librarium_server::models::LoanFilter::issued()
        })
        .await
        .unwrap()
        .len() as i32;
    assert!(book.available_copies >= 0);
    assert!(book.available_copies <= book.total_copies);
    assert_eq!(issued, book.total_copies - book.available_copies);
}
