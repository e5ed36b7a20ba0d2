/// Session management module - Gateway

mod provider;
mod state;
mod store;

pub use provider::SessionProvider;
pub use state::Session;
pub use store::{CredentialStore, StoredCredentials};
