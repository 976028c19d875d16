pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::RunConfig, AreaConfig};
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use app::pipelines::{AreaResult, AreaSequence, DemandPipeline, FailurePolicy};
pub use core::etl::{EtlEngine, EtlOutcome};
pub use domain::model::{AreaStats, DemandModel};
pub use domain::params::ModelParams;
pub use utils::error::{DemandError, Result};
