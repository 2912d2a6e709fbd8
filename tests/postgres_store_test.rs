//! PostgreSQLアダプターのテスト
//!
//! 実行にはDATABASE_URLが必要: `cargo test -- --ignored`
//! テストは並行に走るため、データはUUIDで一意にし、テーブルは削除しない。

mod common;

use chrono::{DateTime, Utc};
use ilib::adapters::postgres::PostgresStore;
use ilib::application::{
    ApplicationError, ServiceDependencies, article_service, booking_service, loan_service,
    user_service,
};
use ilib::domain::commands::*;
use ilib::domain::{
    ArticleState, BookingState, LoanState, create_article, register_booking, register_user,
};
use ilib::ports::{
    ArticleCriteria, ArticleRepository, BookingRepository, LibraryStore, UserRepository,
};
use std::sync::Arc;
use uuid::Uuid;

use common::{add_book, add_user, at, book_kind, details, profile};

/// PostgreSQLの時刻精度（マイクロ秒）に合わせて丸める
fn truncate_to_micros(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(dt.timestamp_micros()).expect("Invalid timestamp")
}

async fn postgres_deps() -> (ServiceDependencies, Arc<PostgresStore>) {
    let pool = common::create_test_pool().await;
    let store = Arc::new(PostgresStore::new(pool));
    (ServiceDependencies::new(store.clone()), store)
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

#[tokio::test]
#[ignore]
async fn test_postgres_booking_loan_return_flow() {
    let (deps, _) = postgres_deps().await;
    let user_id = add_user(&deps, &format!("{}@example.com", unique("flow"))).await;
    let article_id = add_book(&deps, "Kokoro", &unique("isbn")).await;
    let now = truncate_to_micros(at(2024, 5, 1, 10));

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

    let loan_id = loan_service::register_loan(
        &deps,
        RegisterLoan {
            user_id,
            article_id,
            loaned_at: now,
        },
    )
    .await
    .unwrap();

    let booking = booking_service::get_booking_info(&deps, booking_id, now)
        .await
        .unwrap();
    assert_eq!(booking.state, BookingState::Completed);
    assert_eq!(booking.booking_date, now);

    loan_service::register_return(
        &deps,
        RegisterReturn {
            loan_id,
            returned_at: now,
        },
    )
    .await
    .unwrap();

    let loan = loan_service::get_loan_info(&deps, loan_id, now).await.unwrap();
    assert_eq!(loan.state, LoanState::Returned);

    let info = article_service::get_article_info_extended(&deps, article_id, now)
        .await
        .unwrap();
    assert_eq!(info.article.state, ArticleState::Available);
}

#[tokio::test]
#[ignore]
async fn test_postgres_uncommitted_unit_of_work_rolls_back() {
    let (_, store) = postgres_deps().await;
    let user = register_user(profile("Taro", "Yamada", &unique("rollback")));

    {
        let mut uow = store.begin().await.unwrap();
        uow.save_user(&user).await.unwrap();
        // commitせずにdrop
    }

    let mut uow = store.begin().await.unwrap();
    assert!(uow.find_user(user.user_id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_postgres_single_active_booking_per_article() {
    let (_, store) = postgres_deps().await;
    let now = at(2024, 5, 1, 10);

    let first = register_user(profile("Taro", "Yamada", &unique("first")));
    let second = register_user(profile("Jiro", "Yamada", &unique("second")));
    let article = create_article(
        details("Kokoro", 1914),
        book_kind(&unique("isbn"), "Natsume Soseki"),
    );
    let (booking, booked) = register_booking(&article, first.user_id, None, now).unwrap();
    let (duplicate, _) = register_booking(&article, second.user_id, None, now).unwrap();

    let mut uow = store.begin().await.unwrap();
    uow.save_user(&first).await.unwrap();
    uow.save_user(&second).await.unwrap();
    uow.save_article(&booked).await.unwrap();
    uow.save_booking(&booking).await.unwrap();

    // 部分ユニークインデックスが2件目のACTIVEな予約を拒否する
    assert!(uow.save_booking(&duplicate).await.is_err());
}

#[tokio::test]
#[ignore]
async fn test_postgres_delete_requires_persisted_entity() {
    let (_, store) = postgres_deps().await;
    let article = create_article(
        details("Kokoro", 1914),
        book_kind(&unique("isbn"), "Natsume Soseki"),
    );

    let mut uow = store.begin().await.unwrap();
    assert!(uow.delete_article(&article).await.is_err());
}

#[tokio::test]
#[ignore]
async fn test_postgres_search_articles_by_identifier_and_filters() {
    let (deps, _) = postgres_deps().await;
    let genre = unique("genre");

    for (title, year) in [("Sanshiro", 1908), ("Kokoro", 1914), ("Botchan", 1914)] {
        let mut article_details = details(title, year);
        article_details.genre = genre.clone();
        article_service::add_article(
            &deps,
            AddArticle {
                details: article_details,
                kind: book_kind(&unique("isbn"), "Natsume Soseki"),
            },
        )
        .await
        .unwrap();
    }

    let criteria = ArticleCriteria {
        genre: Some(genre.clone()),
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

    let criteria = ArticleCriteria {
        isbn: Some(unique("missing")),
        genre: Some(genre),
        ..Default::default()
    };
    let result = article_service::search_articles(&deps, &criteria, 0, 10).await;
    assert!(matches!(result, Err(ApplicationError::NoResultsFound(_))));
}

/// 行ロックにより同じ資料への同時予約は1件だけ成功する
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_postgres_concurrent_bookings() {
    let (deps, _) = postgres_deps().await;
    let article_id = add_book(&deps, "Kokoro", &unique("isbn")).await;
    let now = at(2024, 5, 1, 10);

    let mut handles = Vec::new();
    for _ in 0..5 {
        let user_id = add_user(&deps, &format!("{}@example.com", unique("race"))).await;
        let deps = deps.clone();
        handles.push(tokio::spawn(async move {
            booking_service::register_booking(
                &deps,
                RegisterBooking {
                    user_id,
                    article_id,
                    booked_at: now,
                },
            )
            .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 1);
}

/// 予約の取消と貸出が競合しても、行ロックの順序が揃っているためデッドロックしない
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_postgres_cancel_and_loan_race_without_deadlock() {
    let (deps, _) = postgres_deps().await;
    let now = at(2024, 5, 1, 10);

    for _ in 0..10 {
        let user_id = add_user(&deps, &format!("{}@example.com", unique("lock"))).await;
        let article_id = add_book(&deps, "Kokoro", &unique("isbn")).await;
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

        let cancel = {
            let deps = deps.clone();
            tokio::spawn(async move {
                booking_service::cancel_booking(&deps, CancelBooking { booking_id }).await
            })
        };
        let loan = {
            let deps = deps.clone();
            tokio::spawn(async move {
                loan_service::register_loan(
                    &deps,
                    RegisterLoan {
                        user_id,
                        article_id,
                        loaned_at: now,
                    },
                )
                .await
            })
        };

        // どちらの順でも貸出は成功し、取消は成功するか予約済みで失敗する
        match cancel.await.unwrap() {
            Ok(()) | Err(ApplicationError::InvalidOperation(_)) => {}
            Err(e) => panic!("unexpected cancel error: {:?}", e),
        }
        loan.await.unwrap().unwrap();

        let info = article_service::get_article_info_extended(&deps, article_id, now)
            .await
            .unwrap();
        assert_eq!(info.article.state, ArticleState::OnLoan);
        assert!(info.booking.is_none());
    }
}

/// 同じメールアドレスの同時登録は1件だけ成功する
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_postgres_concurrent_duplicate_email() {
    let (deps, _) = postgres_deps().await;
    let email = format!("{}@example.com", unique("dup"));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let deps = deps.clone();
        let email = email.clone();
        handles.push(tokio::spawn(async move {
            user_service::add_user(
                &deps,
                AddUser {
                    profile: profile("Taro", "Yamada", &email),
                },
            )
            .await
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ApplicationError::InvalidArgument(msg)) => {
                assert_eq!(msg, "Email already registered!");
            }
            Err(e) => panic!("unexpected error: {:?}", e),
        }
    }
    assert_eq!(succeeded, 1);
}
