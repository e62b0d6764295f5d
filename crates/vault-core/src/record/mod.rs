//! Master and credential record types

mod types;

pub use types::*;
