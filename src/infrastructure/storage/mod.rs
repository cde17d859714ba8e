pub mod keyring_token_store;
pub mod session_file_store;

pub use keyring_token_store::KeyringTokenStore;
pub use session_file_store::SessionFileStore;
