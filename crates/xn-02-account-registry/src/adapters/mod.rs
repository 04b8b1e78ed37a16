pub mod keystore;

pub use keystore::{KeystoreSigner, LocalKeystore, KEYSTORE_NAME};
