pub mod downstream;
pub mod platform;

pub use downstream::{ConnectorError, ConnectorResult, Downstream, HttpDownstream};
pub use platform::{HttpPlatformClient, PlatformApi};
