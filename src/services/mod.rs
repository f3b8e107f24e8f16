pub mod account_service;
pub mod form;
pub mod metadata_store;
pub mod painting_service;
pub mod pipeline;
pub mod session_store;

pub use metadata_store::{InMemoryMetadataStore, MetadataStore, SqliteMetadataStore};
pub use pipeline::Gallery;
pub use session_store::{InMemorySessionStore, SessionStore, SqliteSessionStore};
