pub mod aws_metadata;
pub mod aws_region;
pub mod config;

pub use aws_region::AwsRegion;
pub use config::{get_aws_default_profile, resolve_available_aws_config, AwsConfig};
