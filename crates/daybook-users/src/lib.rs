//! `daybook-users` — email resolution for the dispatch jobs.
//!
//! The resolution order is fixed: the profile row's cached email wins; only
//! when it is absent does the resolver fall back to a lookup-by-id call
//! against the authentication service's admin API.

pub mod error;
pub mod provider;
pub mod resolver;

pub use error::{Result, UserError};
pub use provider::{HttpIdentityProvider, IdentityProvider, NoIdentityProvider};
pub use resolver::EmailResolver;
