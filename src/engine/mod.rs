//! Engine controller for managing search and game state.
//!
//! This module abstracts the common UCI-facing logic of search management,
//! pondering, and time control away from the session loop.

mod controller;
mod protocol;
pub mod time;

pub use controller::{EngineController, PonderHandle, SearchJob, SearchParams};
pub use protocol::{CommandResult, Protocol};
pub use time::{build_search_request, SearchRequest, TimeControl, DEFAULT_MOVES_TO_GO};
