pub mod cli;
pub mod cloud_providers;
pub mod config;
pub mod constants;
pub mod layer;
pub mod logging;
pub mod shipper;

pub use config::{ConfigLoader, ConfigParams, ShipperConfig};
pub use layer::ShipperLayer;
pub use shipper::{Destination, FlushReport, LogEvent, LogShipper, ShipperHandle, ShipperOptions};
