pub mod analyzer;
pub mod events;
pub mod timeline;
pub mod tracker;
pub mod types;
