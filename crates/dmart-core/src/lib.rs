//! Core types, cleaning rules and the load pipeline for the disaster data
//! mart.
//!
//! This crate is free of database and file-format dependencies. Storage
//! backends implement [`store::WarehouseStore`]; the binary supplies the CSV
//! source, the rejection sinks and the holiday calendar.

pub mod cache;
pub mod calendar;
pub mod classify;
pub mod dimension;
pub mod error;
pub mod link;
pub mod normalize;
pub mod pipeline;
pub mod place;
pub mod row;
pub mod sink;
pub mod store;

pub use error::{Error, PipelineError, Result};
