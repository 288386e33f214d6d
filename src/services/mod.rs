// Service exports
pub mod profiles;
pub mod push;

pub use profiles::{ProfileClient, ProfileCollections, ProfileError};
pub use push::{PushClient, PushError};
