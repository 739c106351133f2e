// engine module — network gateway between the panel controller and the CMS host

mod interface;
mod manual;
pub mod remote;
pub mod stub;

pub use interface::{Engine, EngineHandle, Event, Request};
pub use manual::ManualEngine;
pub use remote::HttpEngine;
pub use stub::{FixtureRow, StubEngine};
