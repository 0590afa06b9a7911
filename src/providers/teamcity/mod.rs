mod client;
mod types;

pub use client::TeamCityClient;
pub use types::{join_identifiers, IdsPage, Identifier};
