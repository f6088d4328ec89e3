//! geoveil: polygon coordinate encryption
//!
//! Facade over the workspace crates; the integration tests in `tests/`
//! exercise them together.

pub use geoveil_core;
pub use geoveil_server;
