//! Lookups, conditions, and the operations drivers execute.

mod filter;
mod lookup;
mod operation;

pub use filter::{matches_all, scalar_from_json, Condition};
pub use lookup::{Lookup, LookupOp, LOOKUP_SEP};
pub use operation::{Operation, OrderBy, Outcome, Select};
