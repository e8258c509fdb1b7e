//! `daybook-store` — SQLite persistence for every Daybook entity.
//!
//! # Access model
//!
//! Two handles wrap the same schema with different trust levels:
//!
//! | Handle         | Scope                                                  |
//! |----------------|--------------------------------------------------------|
//! | [`Store`]      | Per-user CRUD; every query is filtered by the owning user id |
//! | [`ServiceStore`] | Elevated dispatch surface; its own filter predicates are the only access boundary |
//!
//! Row-level ownership is enforced here, not by callers: a scoped update or
//! delete that matches no row owned by the given user reports `NotFound`
//! rather than touching another user's data.

pub mod db;
pub mod error;
mod service;
mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use service::ServiceStore;
pub use store::Store;
