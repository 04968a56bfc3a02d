pub mod config;
pub mod consensus;
pub mod core;
pub mod engine;
pub mod errors;
pub mod feed;
pub mod indicators;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod storage;

#[cfg(test)]
pub mod test_helpers;
