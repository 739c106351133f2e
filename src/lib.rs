// Pedantic: suppress noise for internal crate code.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod events;
pub mod script;
pub mod surface;
pub mod types;
pub mod url;
