pub mod article;
pub mod booking;
pub mod commands;
pub mod errors;
pub mod loan;
pub mod user;
pub mod value_objects;

pub use article::*;
pub use booking::*;
pub use errors::*;
pub use loan::*;
pub use user::*;
pub use value_objects::*;
