pub mod cache;
pub mod config;
pub mod error;
pub mod listing;
pub mod ops;
pub mod providers;
pub mod s3;
pub mod shell;
pub mod tree;
pub mod ui;
pub mod vfs;
