//! Postgres repositories for the data access layer
//!
//! Each repository is responsible for one domain entity; `transaction` holds the
//! unit of work used for multi-row media removals.

pub mod content;
pub mod media;
pub mod transaction;

pub use content::PgContentRepository;
pub use media::PgMediaRepository;
pub use transaction::{PgMediaTransaction, PgUnitOfWork};
