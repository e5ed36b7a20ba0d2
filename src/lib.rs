pub mod api;
pub mod app;
pub mod cli;
pub mod constants;
pub mod forms;
pub mod gate;
pub mod runtime;
pub mod session;
pub mod utils;
pub mod views;

pub use api::{CannonApi, HttpApiClient};
pub use app::{load_config, AppState, Config};
pub use gate::{AccessState, GateRouter, MainTab, Screen};
pub use session::{Session, SessionProvider};
pub use utils::CannonError;
