//! Criteria module.
//!
//! This module provides:
//! - Criteria: The append-only predicate builder
//! - Types: Criterion, FilterValue, Operator, Connector

mod builder;
pub mod types;

pub use builder::Criteria;
pub use types::{Connector, Criterion, FilterValue, Operator, WILDCARD};
