mod articles;
mod bookings;
mod loans;
mod store;
mod users;

// パブリックに型を再エクスポート
pub use store::PostgresStore;
