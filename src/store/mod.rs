// Ephemeral keyed stores
pub mod presence;
pub mod requests;

pub use presence::{PresenceRegistry, DEFAULT_PRESENCE_TTL};
pub use requests::{RequestStore, DEFAULT_REQUEST_TTL};
