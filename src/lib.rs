pub mod config;
pub mod error;
pub mod keys;
pub mod logging;
pub mod media;
pub mod models;
pub mod proxy;
pub mod server;
pub mod translate;

pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use logging::SharedExchangeLog;
pub use media::MediaResolver;
pub use proxy::RouteKind;
pub use server::{build_router, AppState};
