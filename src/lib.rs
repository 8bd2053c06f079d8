//! Dialogue Engine — a branching dialogue ("visual novel") player core.
//!
//! Plays a static story graph: typewriter text reveal, condition-gated
//! choices, auto-advance and skip pacing, durable saves, and a resume policy
//! that lands a returning player on their first unexplored branch.
//!
//! The engine owns no I/O. Hosts feed it clock readings, player input, and
//! timer callbacks, and execute the command stream it returns.

pub mod core;
pub mod schema;
