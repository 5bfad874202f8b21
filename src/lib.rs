//! Regional electricity load explorer.
//!
//! Reshapes the wide hourly load export into a long table, derives daily
//! per-region statistics, and reduces map clicks and date-range changes
//! into the tables a linked map / time series / daily band view draws.

pub mod compute;
pub mod convert;
pub mod error;
pub mod geo;
pub mod graph;
pub mod region;
pub mod selection;

pub use error::{Error, Result};
