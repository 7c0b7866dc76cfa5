#![forbid(unsafe_code)]

pub mod app;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod error;
pub mod formats;
pub mod ingest;
pub mod library;
pub mod logging;
pub mod navigator;
pub mod store;
