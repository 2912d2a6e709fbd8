use chrono::NaiveDate;
use ilib::application::{ApplicationError, article_service, booking_service, loan_service};
use ilib::domain::commands::*;
use ilib::domain::{ArticleId, ArticleKind, ArticleState, BookingState};
use ilib::ports::ArticleCriteria;

mod common;

use common::{add_book, add_user, at, book_kind, details, in_memory_deps};

fn magazine(issn: &str, issue_number: i32) -> ArticleKind {
    ArticleKind::Magazine {
        issn: issn.to_string(),
        issue_number,
    }
}

// ============================================================================
// AddArticle / UpdateArticle
// ============================================================================

#[tokio::test]
async fn test_add_article_starts_available() {
    let deps = in_memory_deps();
    let article_id = article_service::add_article(
        &deps,
        AddArticle {
            details: details("Nature", 2024),
            kind: magazine("0028-0836", 8000),
        },
    )
    .await
    .unwrap();

    let info = article_service::get_article_info_extended(&deps, article_id, at(2024, 5, 1, 10))
        .await
        .unwrap();
    assert_eq!(info.article.state, ArticleState::Available);
    assert_eq!(info.article.kind, magazine("0028-0836", 8000));
    assert!(info.booking.is_none());
    assert!(info.loan.is_none());
}

#[tokio::test]
async fn test_add_article_requires_identifier_and_author() {
    let deps = in_memory_deps();

    let result = article_service::add_article(
        &deps,
        AddArticle {
            details: details("Kokoro", 1914),
            kind: book_kind("", "Natsume Soseki"),
        },
    )
    .await;
    match result {
        Err(ApplicationError::InvalidArgument(msg)) => {
            assert_eq!(msg, "Article identifier is required");
        }
        other => panic!("expected InvalidArgument, got {:?}", other),
    }

    let result = article_service::add_article(
        &deps,
        AddArticle {
            details: details("Kokoro", 1914),
            kind: book_kind("978-4-00-310111-7", " "),
        },
    )
    .await;
    assert!(matches!(result, Err(ApplicationError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_update_article_fields_and_state() {
    let deps = in_memory_deps();
    let article_id = add_book(&deps, "Kokoro", "978-4-00-310111-7").await;

    article_service::update_article(
        &deps,
        UpdateArticle {
            article_id,
            details: details("Kokoro (revised)", 2021),
            kind: book_kind("978-4-00-310111-7", "Natsume Soseki"),
            state: Some(ArticleState::Unavailable),
        },
    )
    .await
    .unwrap();

    let info = article_service::get_article_info_extended(&deps, article_id, at(2024, 5, 1, 10))
        .await
        .unwrap();
    assert_eq!(info.article.details.title, "Kokoro (revised)");
    assert_eq!(info.article.state, ArticleState::Unavailable);
}

#[tokio::test]
async fn test_update_article_rejected_state_keeps_field_changes() {
    let deps = in_memory_deps();
    let article_id = add_book(&deps, "Kokoro", "978-4-00-310111-7").await;

    let result = article_service::update_article(
        &deps,
        UpdateArticle {
            article_id,
            details: details("Kokoro (revised)", 2021),
            kind: book_kind("978-4-00-310111-7", "Natsume Soseki"),
            state: Some(ArticleState::OnLoan),
        },
    )
    .await;
    match result {
        Err(ApplicationError::InvalidStateTransition(msg)) => {
            assert_eq!(msg, "Cannot change state to inserted value!");
        }
        other => panic!("expected InvalidStateTransition, got {:?}", other),
    }

    let info = article_service::get_article_info_extended(&deps, article_id, at(2024, 5, 1, 10))
        .await
        .unwrap();
    assert_eq!(info.article.details.title, "Kokoro (revised)");
    assert_eq!(info.article.state, ArticleState::Available);
}

#[tokio::test]
async fn test_update_article_cannot_change_type() {
    let deps = in_memory_deps();
    let article_id = add_book(&deps, "Kokoro", "978-4-00-310111-7").await;

    let result = article_service::update_article(
        &deps,
        UpdateArticle {
            article_id,
            details: details("Kokoro", 2020),
            kind: magazine("0028-0836", 1),
            state: None,
        },
    )
    .await;
    match result {
        Err(ApplicationError::InvalidArgument(msg)) => {
            assert_eq!(msg, "Cannot change type of Article");
        }
        other => panic!("expected InvalidArgument, got {:?}", other),
    }

    let result = article_service::update_article(
        &deps,
        UpdateArticle {
            article_id: ArticleId::new(),
            details: details("Kokoro", 2020),
            kind: book_kind("978-4-00-310111-7", "Natsume Soseki"),
            state: None,
        },
    )
    .await;
    assert!(matches!(result, Err(ApplicationError::ArticleNotFound)));
}

// ============================================================================
// RemoveArticle
// ============================================================================

#[tokio::test]
async fn test_remove_booked_article_cancels_booking() {
    let deps = in_memory_deps();
    let user_id = add_user(&deps, "taro@example.com").await;
    let article_id = add_book(&deps, "Kokoro", "978-4-00-310111-7").await;
    let now = at(2024, 5, 1, 10);

    let booking_id = booking_service::register_booking(
        &deps,
        RegisterBooking {
            user_id,
            article_id,
            booked_at: now,
        },
    )
    .await
    .unwrap();

    article_service::remove_article(&deps, RemoveArticle { article_id })
        .await
        .unwrap();

    // 予約の履歴は残る
    let booking = booking_service::get_booking_info(&deps, booking_id, now)
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::Cancelled);

    let result = article_service::get_article_info_extended(&deps, article_id, now).await;
    assert!(matches!(result, Err(ApplicationError::ArticleNotFound)));
}

#[tokio::test]
async fn test_remove_overdue_article_cancels_waiting_booking() {
    let deps = in_memory_deps();
    let borrower_id = add_user(&deps, "taro@example.com").await;
    let waiting_id = add_user(&deps, "jiro@example.com").await;
    let article_id = add_book(&deps, "Kokoro", "978-4-00-310111-7").await;

    let loan_id = loan_service::register_loan(
        &deps,
        RegisterLoan {
            user_id: borrower_id,
            article_id,
            loaned_at: at(2024, 1, 10, 10),
        },
    )
    .await
    .unwrap();
    let booking_id = booking_service::register_booking(
        &deps,
        RegisterBooking {
            user_id: waiting_id,
            article_id,
            booked_at: at(2024, 1, 15, 10),
        },
    )
    .await
    .unwrap();

    // 延滞でUNAVAILABLEになっても予約は待ったまま
    let late = at(2024, 2, 11, 10);
    loan_service::get_loan_info(&deps, loan_id, late).await.unwrap();

    article_service::remove_article(&deps, RemoveArticle { article_id })
        .await
        .unwrap();

    let booking = booking_service::get_booking_info(&deps, booking_id, late)
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::Cancelled);
}

#[tokio::test]
async fn test_remove_loaned_article_fails() {
    let deps = in_memory_deps();
    let user_id = add_user(&deps, "taro@example.com").await;
    let article_id = add_book(&deps, "Kokoro", "978-4-00-310111-7").await;
    let now = at(2024, 5, 1, 10);

    loan_service::register_loan(
        &deps,
        RegisterLoan {
            user_id,
            article_id,
            loaned_at: now,
        },
    )
    .await
    .unwrap();

    let result = article_service::remove_article(&deps, RemoveArticle { article_id }).await;
    match result {
        Err(ApplicationError::InvalidOperation(msg)) => assert!(msg.contains("on loan")),
        other => panic!("expected InvalidOperation, got {:?}", other),
    }

    let result = article_service::remove_article(
        &deps,
        RemoveArticle {
            article_id: ArticleId::new(),
        },
    )
    .await;
    assert!(matches!(result, Err(ApplicationError::ArticleNotFound)));
}

// ============================================================================
// SearchArticles / CountArticles
// ============================================================================

#[tokio::test]
async fn test_search_articles_orders_by_year_then_title() {
    let deps = in_memory_deps();
    for (title, year, isbn) in [
        ("Sanshiro", 1908, "isbn-1"),
        ("Kokoro", 1914, "isbn-2"),
        ("Botchan", 1914, "isbn-3"),
    ] {
        article_service::add_article(
            &deps,
            AddArticle {
                details: details(title, year),
                kind: book_kind(isbn, "Natsume Soseki"),
            },
        )
        .await
        .unwrap();
    }

    let criteria = ArticleCriteria {
        author: Some("Natsume Soseki".to_string()),
        ..Default::default()
    };
    let articles = article_service::search_articles(&deps, &criteria, 0, 10)
        .await
        .unwrap();
    let titles: Vec<_> = articles.iter().map(|a| a.details.title.as_str()).collect();
    assert_eq!(titles, ["Botchan", "Kokoro", "Sanshiro"]);

    assert_eq!(
        article_service::count_articles(&deps, &criteria)
            .await
            .unwrap(),
        3
    );

    // 識別子が指定されると他の条件は無視される
    let criteria = ArticleCriteria {
        isbn: Some("isbn-1".to_string()),
        title: Some("Kokoro".to_string()),
        ..Default::default()
    };
    let articles = article_service::search_articles(&deps, &criteria, 0, 10)
        .await
        .unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].details.title, "Sanshiro");
}

#[tokio::test]
async fn test_search_articles_without_results() {
    let deps = in_memory_deps();
    add_book(&deps, "Kokoro", "978-4-00-310111-7").await;

    let criteria = ArticleCriteria {
        year_edition: NaiveDate::from_ymd_opt(1999, 1, 1),
        ..Default::default()
    };
    let result = article_service::search_articles(&deps, &criteria, 0, 10).await;
    match result {
        Err(ApplicationError::NoResultsFound(msg)) => {
            assert_eq!(msg, "The search has given 0 results!");
        }
        other => panic!("expected NoResultsFound, got {:?}", other),
    }
    assert_eq!(
        article_service::count_articles(&deps, &criteria)
            .await
            .unwrap(),
        0
    );
}

// ============================================================================
// GetArticleInfoExtended
// ============================================================================

#[tokio::test]
async fn test_article_info_reports_overdue_loan() {
    let deps = in_memory_deps();
    let user_id = add_user(&deps, "taro@example.com").await;
    let article_id = add_book(&deps, "Kokoro", "978-4-00-310111-7").await;

    let loan_id = loan_service::register_loan(
        &deps,
        RegisterLoan {
            user_id,
            article_id,
            loaned_at: at(2024, 1, 10, 10),
        },
    )
    .await
    .unwrap();

    let info = article_service::get_article_info_extended(&deps, article_id, at(2024, 3, 1, 10))
        .await
        .unwrap();
    assert_eq!(info.article.state, ArticleState::Unavailable);
    let loan = info.loan.expect("overdue loan is still reported");
    assert_eq!(loan.loan_id, loan_id);
}
