//!
//! # Calma Internal Utilities Crate
//!

pub mod dep_order;
pub use dep_order::*;

pub mod error;
pub use error::*;
