//! Remote data sources tiles fetch from

mod client;
pub mod testing;

pub use client::{DataSource, HttpDataSource};
