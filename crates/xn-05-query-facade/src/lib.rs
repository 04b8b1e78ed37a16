//! # Query Facade (XN-05)
//!
//! Point reads of DID documents over the shared connection, plus the
//! read-models the presentation layer renders (chain list, key list,
//! identity view).
//!
//! A missing document is a valid answer (`Ok(None)`), distinct from a
//! `QueryError` (node unreachable, undecodable document).

pub mod domain;
pub mod service;

pub use domain::{IdentityView, QueryError};
pub use service::QueryFacade;
