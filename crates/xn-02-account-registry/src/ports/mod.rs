pub mod outbound;

pub use outbound::{AccountProvider, Extension, Signer};
