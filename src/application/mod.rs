pub mod article_service;
pub mod booking_service;
pub mod dependencies;
pub mod errors;
pub mod loan_service;
mod refresh;
pub mod user_service;

pub use dependencies::ServiceDependencies;
pub use errors::{ApplicationError, Result};
