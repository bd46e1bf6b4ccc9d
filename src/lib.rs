pub mod config;
pub mod enrich;
pub mod error;
pub mod filter;
pub mod location;
pub mod logging;
pub mod maps;
pub mod merge;
pub mod resolve;
pub mod sources;
pub mod storage;
pub mod summary;
pub mod types;
