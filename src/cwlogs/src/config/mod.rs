mod config_loader;

pub use config_loader::{default_stream_name, ConfigLoader, ConfigParams, ShipperConfig};
