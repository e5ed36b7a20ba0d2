/// Access gate module - Gateway

mod route;
mod router;

pub use route::{AccessState, MainTab, Screen};
pub use router::{GateError, GateRouter};
