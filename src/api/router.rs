use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{AppState, articles, bookings, loans, users};

/// APIルーターを作成する
///
/// 資料:
/// - GET /articles, POST /articles
/// - GET / PUT / DELETE /articles/:id
///
/// 予約・貸出:
/// - POST /bookings, GET /bookings/:id, POST /bookings/:id/cancel
/// - POST /loans, GET /loans/:id, POST /loans/:id/return, POST /loans/:id/extend
///
/// 利用者:
/// - GET /users, POST /users, GET / PUT /users/:id
/// - GET /users/:id/bookings, GET /users/:id/loans, GET /users/:id/dashboard
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Articles
        .route(
            "/articles",
            get(articles::search_articles).post(articles::add_article),
        )
        .route(
            "/articles/:id",
            get(articles::get_article)
                .put(articles::update_article)
                .delete(articles::remove_article),
        )
        // Bookings
        .route("/bookings", post(bookings::register_booking))
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        // Loans
        .route("/loans", post(loans::register_loan))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/return", post(loans::register_return))
        .route("/loans/:id/extend", post(loans::extend_loan))
        // Users
        .route("/users", get(users::search_users).post(users::add_user))
        .route("/users/:id", get(users::get_user).put(users::update_user))
        .route("/users/:id/bookings", get(bookings::list_user_bookings))
        .route("/users/:id/loans", get(loans::list_user_loans))
        .route("/users/:id/dashboard", get(users::get_dashboard))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
