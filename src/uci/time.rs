//! UCI time management.
//!
//! Re-exports the unified time management from the engine module so callers
//! in the UCI layer don't need to know the split between the two modules.

pub use crate::engine::time::{build_search_request, SearchRequest, TimeControl, DEFAULT_MOVES_TO_GO};
