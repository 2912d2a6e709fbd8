pub mod article_repository;
pub mod booking_repository;
pub mod loan_repository;
pub mod unit_of_work;
pub mod user_repository;

pub use article_repository::*;
pub use booking_repository::*;
pub use loan_repository::*;
pub use unit_of_work::*;
pub use user_repository::*;

/// ポート層の Result型
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;
