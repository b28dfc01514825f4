pub mod key_store;
pub mod record;

pub use key_store::{InMemoryKeyStore, KeyStore, KeyStoreError};
pub use record::{KeyListing, KeyRecord, KeyRing};
