use thiserror::Error;

pub mod database;
mod session_store;
pub mod statistics;

pub use session_store::SessionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
