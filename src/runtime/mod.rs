/// Request lifecycle module - Gateway

mod poller;
mod submit;

pub use poller::Poller;
pub use submit::{InFlight, SubmitGuard};
