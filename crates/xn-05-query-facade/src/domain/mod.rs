//! Domain layer for the query facade.

pub mod errors;
pub mod views;

pub use errors::QueryError;
pub use views::IdentityView;
