//! Circulation behaviour through the service layer

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use librarium_server::{
    error::AppError,
    models::{
        book::BookQuery,
        issue_request::{ApproveIssueRequest, RequestStatus, SubmitIssueRequest},
        loan::{LoanRecord, LoanStatus},
        report::OverdueQuery,
        reservation::{CreateReservation, ReservationStatus},
    },
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::common::{
    add_book, assert_ledger_consistent, borrower, issue_to, librarian, services,
};

#[tokio::test]
async fn test_issue_until_out_of_stock() {
    let (services, _) = services();
    let book = add_book(&services, "The Blue Umbrella", 3).await;

    for (name, roll, left) in [("Alice", "6A-01", 2), ("Bob", "6A-02", 1), ("Carol", "6A-03", 0)] {
        let loan = services
            .loans
            .issue(issue_to(book.id, name, roll), &librarian())
            .await
            .unwrap();
        assert_eq!(loan.status, LoanStatus::Issued);
        let current = services.catalog.get_book(book.id).await.unwrap();
        assert_eq!(current.available_copies, left);
    }

    let result = services
        .loans
        .issue(issue_to(book.id, "Dan", "6A-04"), &librarian())
        .await;
    assert!(matches!(result, Err(AppError::OutOfStock(_))));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 0);
    assert_ledger_consistent(&services, book.id).await;
}

#[tokio::test]
async fn test_issue_unknown_book() {
    let (services, _) = services();
    let result = services
        .loans
        .issue(issue_to(Uuid::new_v4(), "Alice", "6A-01"), &librarian())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_issue_rejects_past_due_date() {
    let (services, _) = services();
    let book = add_book(&services, "Rusty Runs Away", 1).await;
    let mut request = issue_to(book.id, "Alice", "6A-01");
    request.due_at = Some(Utc::now() - Duration::days(1));

    let result = services.loans.issue(request, &librarian()).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 1);
}

#[tokio::test]
async fn test_return_restores_stock_once() {
    let (services, _) = services();
    let book = add_book(&services, "The Room on the Roof", 2).await;
    let loan = services
        .loans
        .issue(issue_to(book.id, "Alice", "6A-01"), &librarian())
        .await
        .unwrap();

    let receipt = services.loans.return_loan(loan.id, &librarian()).await.unwrap();
    assert_eq!(receipt.loan.status, LoanStatus::Returned);
    assert!(receipt.loan.returned_at.is_some());
    assert_eq!(receipt.fine.amount, Decimal::ZERO);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 2);

    let again = services.loans.return_loan(loan.id, &librarian()).await;
    assert!(matches!(again, Err(AppError::AlreadyReturned(_))));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 2);
    assert_ledger_consistent(&services, book.id).await;
}

#[tokio::test]
async fn test_return_unknown_loan() {
    let (services, _) = services();
    let result = services.loans.return_loan(Uuid::new_v4(), &librarian()).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issues_of_last_copy() {
    let (services, _) = services();
    let services = Arc::new(services);
    let book_id = add_book(&services, "A Flight of Pigeons", 1).await.id;

    let mut handles = Vec::new();
    for i in 0..16 {
        let services = services.clone();
        handles.push(tokio::spawn(async move {
            services
                .loans
                .issue(
                    issue_to(book_id, &format!("Student {}", i), &format!("7B-{:02}", i)),
                    &librarian(),
                )
                .await
        }));
    }

    let mut issued = 0;
    let mut out_of_stock = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => issued += 1,
            Err(AppError::OutOfStock(_)) => out_of_stock += 1,
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
    assert_eq!(issued, 1);
    assert_eq!(out_of_stock, 15);
    assert_eq!(services.catalog.get_book(book_id).await.unwrap().available_copies, 0);
    assert_ledger_consistent(&services, book_id).await;
}

#[tokio::test]
async fn test_stock_adjustments() {
    let (services, _) = services();
    let book = add_book(&services, "The Night Train at Deoli", 2).await;
    services
        .loans
        .issue(issue_to(book.id, "Alice", "6A-01"), &librarian())
        .await
        .unwrap();

    let grown = services.catalog.adjust_stock(book.id, 3, &librarian()).await.unwrap();
    assert_eq!((grown.total_copies, grown.available_copies), (5, 4));

    let shrunk = services.catalog.adjust_stock(book.id, -4, &librarian()).await.unwrap();
    assert_eq!((shrunk.total_copies, shrunk.available_copies), (1, 0));

    let result = services.catalog.adjust_stock(book.id, -1, &librarian()).await;
    assert!(matches!(result, Err(AppError::InvariantViolation(_))));

    let result = services.catalog.adjust_stock(book.id, i32::MAX, &librarian()).await;
    assert!(matches!(result, Err(AppError::Validation(_))));
    let unchanged = services.catalog.get_book(book.id).await.unwrap();
    assert_eq!((unchanged.total_copies, unchanged.available_copies), (1, 0));
    assert_ledger_consistent(&services, book.id).await;
}

#[tokio::test]
async fn test_reservation_duplicates_and_cancel() {
    let (services, _) = services();
    let book = add_book(&services, "Angry River", 4).await;
    let reserve = || CreateReservation {
        book_id: book.id,
        requester_id: "6A-07".to_string(),
        requester_name: "Emma".to_string(),
    };

    let first = services.reservations.reserve(reserve()).await.unwrap();
    assert_eq!(first.status, ReservationStatus::Pending);

    let duplicate = services.reservations.reserve(reserve()).await;
    assert!(matches!(duplicate, Err(AppError::DuplicateReservation(_))));

    let cancelled = services.reservations.cancel(first.id).await.unwrap();
    assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    let again = services.reservations.cancel(first.id).await.unwrap();
    assert_eq!(again.status, ReservationStatus::Cancelled);
    assert_eq!(again.closed_at, cancelled.closed_at);

    // a closed hold does not block a new one
    services.reservations.reserve(reserve()).await.unwrap();
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 4);
}

#[tokio::test]
async fn test_reservation_queue_is_fifo() {
    let (services, _) = services();
    let book = add_book(&services, "Grandfather's Private Zoo", 1).await;
    for (roll, name) in [("6A-01", "Asha"), ("6A-02", "Bilal"), ("6A-03", "Chitra")] {
        services
            .reservations
            .reserve(CreateReservation {
                book_id: book.id,
                requester_id: roll.to_string(),
                requester_name: name.to_string(),
            })
            .await
            .unwrap();
    }

    let queue = services.reservations.list_for(book.id).await.unwrap();
    let names: Vec<_> = queue.iter().map(|r| r.requester_name.as_str()).collect();
    assert_eq!(names, ["Asha", "Bilal", "Chitra"]);
    assert!(queue.windows(2).all(|w| w[0].requested_at <= w[1].requested_at));
}

#[tokio::test]
async fn test_issue_fulfils_borrowers_reservation() {
    let (services, _) = services();
    let book = add_book(&services, "Dust on the Mountain", 1).await;
    let hold = services
        .reservations
        .reserve(CreateReservation {
            book_id: book.id,
            requester_id: "6A-09".to_string(),
            requester_name: "Farah".to_string(),
        })
        .await
        .unwrap();

    services
        .loans
        .issue(issue_to(book.id, "Farah", "6A-09"), &librarian())
        .await
        .unwrap();

    let hold = services.reservations.get(hold.id).await.unwrap();
    assert_eq!(hold.status, ReservationStatus::Fulfilled);
    assert!(services.reservations.list_for(book.id).await.unwrap().is_empty());
    assert_eq!(
        services.reservations.list_by_requester("6A-09").await.unwrap().len(),
        1
    );
}

#[tokio::test]
async fn test_declined_request_is_terminal() {
    let (services, _) = services();
    let book = add_book(&services, "Time Stops at Shamli", 2).await;
    let request = services
        .requests
        .submit(SubmitIssueRequest {
            book_id: Some(book.id),
            book_guess: "time stops shamli".to_string(),
            requester: borrower("Gita", "6A-11"),
        })
        .await
        .unwrap();
    assert_eq!(request.status, RequestStatus::Pending);

    let declined = services.requests.decline(request.id, &librarian()).await.unwrap();
    assert_eq!(declined.status, RequestStatus::Declined);
    assert_eq!(declined.processed_by.as_deref(), Some("librarian-1"));
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 2);

    let approve = services
        .requests
        .approve(request.id, ApproveIssueRequest::default(), &librarian())
        .await;
    assert!(matches!(approve, Err(AppError::InvalidState(_))));
    let decline = services.requests.decline(request.id, &librarian()).await;
    assert!(matches!(decline, Err(AppError::InvalidState(_))));
}

#[tokio::test]
async fn test_approve_after_stock_ran_out_stays_pending() {
    let (services, _) = services();
    let book = add_book(&services, "The Cherry Tree", 1).await;
    let request = services
        .requests
        .submit(SubmitIssueRequest {
            book_id: Some(book.id),
            book_guess: String::new(),
            requester: borrower("Hari", "6A-12"),
        })
        .await
        .unwrap();

    services
        .loans
        .issue(issue_to(book.id, "Isha", "6A-13"), &librarian())
        .await
        .unwrap();

    let result = services
        .requests
        .approve(request.id, ApproveIssueRequest::default(), &librarian())
        .await;
    assert!(matches!(result, Err(AppError::OutOfStock(_))));

    let request = services.requests.get(request.id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
    assert!(request.loan_id.is_none());
    assert_ledger_consistent(&services, book.id).await;
}

#[tokio::test]
async fn test_approve_with_confirmed_book_issues_loan() {
    let (services, _) = services();
    let book = add_book(&services, "The Adventures of Rusty", 2).await;
    let request = services
        .requests
        .submit(SubmitIssueRequest {
            book_id: None,
            book_guess: "rusty adventures".to_string(),
            requester: borrower("Jai", "6A-14"),
        })
        .await
        .unwrap();

    let approved = services
        .requests
        .approve(
            request.id,
            ApproveIssueRequest {
                book_id: Some(book.id),
                requester: None,
            },
            &librarian(),
        )
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.book_id, Some(book.id));

    let loan_id = approved.loan_id.expect("approval records the loan");
    let loan = services.loans.get_loan(loan_id).await.unwrap();
    assert_eq!(loan.borrower.roll, "6A-14");
    assert_eq!(loan.issued_by, "librarian-1");
    assert_eq!((loan.due_at - loan.issued_at).num_days(), 14);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 1);

    let pending = services.requests.list(Some(RequestStatus::Pending)).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_request_for_unknown_book_is_stored_until_approval() {
    let (services, _) = services();
    let missing = Uuid::new_v4();
    let request = services
        .requests
        .submit(SubmitIssueRequest {
            book_id: Some(missing),
            book_guess: "a book nobody catalogued".to_string(),
            requester: borrower("Kavi", "6A-15"),
        })
        .await
        .unwrap();
    assert_eq!(request.book_id, Some(missing));
    assert_eq!(request.status, RequestStatus::Pending);

    let result = services
        .requests
        .approve(request.id, ApproveIssueRequest::default(), &librarian())
        .await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    let request = services.requests.get(request.id).await.unwrap();
    assert_eq!(request.status, RequestStatus::Pending);
}

#[tokio::test]
async fn test_second_approval_issues_nothing() {
    let (services, _) = services();
    let book = add_book(&services, "The Room on the Roof", 3).await;
    let request = services
        .requests
        .submit(SubmitIssueRequest {
            book_id: Some(book.id),
            book_guess: String::new(),
            requester: borrower("Lata", "6A-16"),
        })
        .await
        .unwrap();

    let approved = services
        .requests
        .approve(request.id, ApproveIssueRequest::default(), &librarian())
        .await
        .unwrap();
    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 2);

    let again = services
        .requests
        .approve(request.id, ApproveIssueRequest::default(), &librarian())
        .await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));

    let unchanged = services.requests.get(request.id).await.unwrap();
    assert_eq!(unchanged.loan_id, approved.loan_id);
    assert_eq!(services.catalog.get_book(book.id).await.unwrap().available_copies, 2);
    let loans = services.loans.list_loans(&Default::default()).await.unwrap();
    assert_eq!(loans.len(), 1);
    assert_ledger_consistent(&services, book.id).await;
}

#[tokio::test]
async fn test_remove_book_refused_while_on_loan() {
    let (services, _) = services();
    let book = add_book(&services, "Tigers Forever", 1).await;
    let loan = services
        .loans
        .issue(issue_to(book.id, "Kiran", "6A-15"), &librarian())
        .await
        .unwrap();

    let result = services.catalog.remove_book(book.id, &librarian()).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));

    services.loans.return_loan(loan.id, &librarian()).await.unwrap();
    services.catalog.remove_book(book.id, &librarian()).await.unwrap();
    assert!(matches!(
        services.catalog.get_book(book.id).await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_search_pages_restart() {
    let (services, _) = services();
    for title in ["Snake Trouble", "Cricket for the Crocodile", "Earthquake", "The Eyes of the Eagle"] {
        add_book(&services, title, 1).await;
    }

    let query = |page| BookQuery {
        q: Some("THE".to_string()),
        category: None,
        page: Some(page),
        per_page: Some(1),
    };
    let first = services.catalog.find_by_query(&query(1)).await.unwrap();
    let second = services.catalog.find_by_query(&query(2)).await.unwrap();
    let again = services.catalog.find_by_query(&query(1)).await.unwrap();

    assert_eq!(first.total, 2);
    assert_eq!(first.books[0].title, "The Eyes of the Eagle");
    assert_eq!(second.books[0].title, "Cricket for the Crocodile");
    assert_eq!(again.books[0].id, first.books[0].id);
}

#[tokio::test]
async fn test_overdue_report_and_borrower_stats() {
    let (services, repository) = services();
    let book = add_book(&services, "Hanuman to the Rescue", 3).await;
    let now = Utc::now();

    let long_late = LoanRecord::new(
        &repository.get_book(book.id).await.unwrap(),
        borrower("Leela", "6A-16"),
        now - Duration::days(10),
        "librarian-2",
        now - Duration::days(24),
    );
    let slightly_late = LoanRecord::new(
        &repository.get_book(book.id).await.unwrap(),
        borrower("Manu", "6A-17"),
        now - Duration::hours(30),
        "librarian-1",
        now - Duration::days(15),
    );
    repository.issue(&slightly_late).await.unwrap();
    repository.issue(&long_late).await.unwrap();
    services
        .loans
        .issue(issue_to(book.id, "Leela", "6A-16"), &librarian())
        .await
        .unwrap();

    let overdue = services
        .stats
        .overdue_loans(&OverdueQuery {
            as_of: Some(now),
            class_name: Some("6".to_string()),
            section: Some("A".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(overdue.len(), 2);
    assert_eq!(overdue[0].loan.id, long_late.id);
    assert_eq!(overdue[0].days_overdue, 10);
    assert_eq!(overdue[0].fine, Decimal::new(50, 0));
    assert_eq!(overdue[1].days_overdue, 2);

    let stats = services.stats.borrower_stats("6A-16", Some(now)).await.unwrap();
    assert_eq!(stats.current_loans.len(), 2);
    assert_eq!(stats.overdue_loans, 1);
    assert_eq!(stats.outstanding_fines, Decimal::new(50, 0));

    let actors = services.stats.actor_stats().await.unwrap();
    let first = actors.iter().find(|a| a.actor_id == "librarian-1").unwrap();
    assert_eq!(first.loans_issued, 2);

    let summary = services.stats.summary().await.unwrap();
    assert_eq!(summary.active_loans, 3);
    assert_eq!(summary.overdue_loans, 2);
    assert_eq!(summary.catalog.available_copies, 0);
}

#[tokio::test]
async fn test_fine_frozen_at_return() {
    let (services, repository) = services();
    let book = add_book(&services, "The Kashmiri Storyteller", 1).await;
    let due_at = Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap();
    let loan = LoanRecord::new(
        &book,
        borrower("Nina", "6A-18"),
        due_at,
        "librarian-1",
        due_at - Duration::days(14),
    );
    repository.issue(&loan).await.unwrap();
    repository
        .return_loan(loan.id, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        .await
        .unwrap();

    let later = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
    let fine = services.loans.fine(loan.id, Some(later)).await.unwrap();
    assert_eq!(fine.days_overdue, 5);
    assert_eq!(fine.amount, Decimal::new(25, 0));
    assert_eq!(fine.currency, "INR");
}
