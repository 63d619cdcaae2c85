//! Query engine over the clean dataset.
//!
//! - [`filter`]: composes set, range and date predicates into one pass
//! - [`aggregate`]: grouped means and summary statistics
//!
//! Both take the clean dataset by reference and return new tables.

pub mod aggregate;
pub mod filter;

pub use aggregate::{AggregationKind, AggregationSpec, GroupMean, GroupSummary};
pub use filter::{FilterSpec, Predicate};
