pub mod config;
pub mod event_router;
pub mod server;
pub mod state;

pub use config::Config;
pub use event_router::EventRouter;
pub use server::Server;
pub use state::RelayState;
