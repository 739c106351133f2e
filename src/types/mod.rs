// Shared domain types — used by the engine, the controller and the surface.
// None of those layers depends on another for these; all import from here.

pub mod panel;
pub mod response;

pub use panel::*;
pub use response::*;
