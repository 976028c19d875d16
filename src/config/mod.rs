pub mod cli;
pub mod toml_config;

pub use crate::domain::params::{ModelOverrides, ModelParams};

use crate::core::ConfigProvider;
use crate::utils::error::{DemandError, Result};
use crate::utils::validation::{
    validate_file_extensions, validate_non_empty_string, validate_path, Validate,
};
#[cfg(feature = "cli")]
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_OUTPUT_FILE: &str = "demand_data.json";

const INPUT_EXTENSIONS: &[&str] = &["csv", "json"];

/// 單一區域的完整設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaConfig {
    pub name: String,
    pub blocks: String,
    pub employment: Option<String>,
    pub buildings: Option<String>,
    pub output_path: String,
    pub output_file: String,
    pub field_mapping: Option<HashMap<String, String>>,
    pub params: ModelParams,
    pub pretty: bool,
}

impl ConfigProvider for AreaConfig {
    fn area_name(&self) -> &str {
        &self.name
    }

    fn blocks_path(&self) -> &str {
        &self.blocks
    }

    fn employment_path(&self) -> Option<&str> {
        self.employment.as_deref()
    }

    fn buildings_path(&self) -> Option<&str> {
        self.buildings.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output_path
    }

    fn output_file(&self) -> &str {
        &self.output_file
    }

    fn field_mapping(&self) -> Option<&HashMap<String, String>> {
        self.field_mapping.as_ref()
    }

    fn model_params(&self) -> &ModelParams {
        &self.params
    }

    fn pretty_output(&self) -> bool {
        self.pretty
    }
}

impl Validate for AreaConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("area.name", &self.name)?;
        validate_path("area.blocks", &self.blocks)?;
        validate_path("area.output_path", &self.output_path)?;
        validate_path("area.output_file", &self.output_file)?;

        let mut inputs = vec![self.blocks.as_str()];
        inputs.extend(self.employment.as_deref());
        inputs.extend(self.buildings.as_deref());
        validate_file_extensions("area inputs", &inputs, INPUT_EXTENSIONS)?;
        validate_file_extensions("area.output_file", &[self.output_file.as_str()], &["json"])?;

        self.params.validate()
    }
}

/// 將 `SOURCE=TARGET` 轉為欄位對映
pub fn parse_field_mapping(pairs: &[String]) -> Result<Option<HashMap<String, String>>> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut mapping = HashMap::with_capacity(pairs.len());
    for pair in pairs {
        let (source, target) = pair.split_once('=').ok_or_else(|| {
            DemandError::InvalidConfigValueError {
                field: "field_map".to_string(),
                value: pair.clone(),
                reason: "Expected SOURCE=TARGET".to_string(),
            }
        })?;
        mapping.insert(source.trim().to_string(), target.trim().to_string());
    }
    Ok(Some(mapping))
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "commute-demand")]
#[command(about = "Build a commuter demand model (nodes + flows) for one area")]
pub struct CliConfig {
    /// Area name, used in logs and reports
    #[arg(long, default_value = "area")]
    pub area: String,

    /// Block records (.csv or .json) with id, lon, lat, population
    #[arg(long)]
    pub blocks: String,

    /// Exact employment data (.csv or .json) with id, jobs
    #[arg(long)]
    pub employment: Option<String>,

    /// Building footprints (.csv or .json) for the capacity heuristic
    #[arg(long)]
    pub buildings: Option<String>,

    #[arg(long, default_value = "./output")]
    pub output_path: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    pub output_file: String,

    /// Column renames applied before ingestion, e.g. GEOID=id
    #[arg(long = "field-map", value_delimiter = ',')]
    pub field_map: Vec<String>,

    #[arg(long)]
    pub job_ratio: Option<f64>,

    #[arg(long)]
    pub cluster_threshold_meters: Option<f64>,

    #[arg(long)]
    pub gravity_exponent: Option<f64>,

    #[arg(long)]
    pub gravity_min_distance: Option<f64>,

    #[arg(long)]
    pub local_job_bonus: Option<f64>,

    #[arg(long)]
    pub min_flow_size: Option<u64>,

    #[arg(long)]
    pub min_jobs_per_block: Option<u64>,

    #[arg(long)]
    pub min_pop_per_block: Option<u64>,

    #[arg(long)]
    pub split_cap: Option<u64>,

    #[arg(long)]
    pub travel_seconds_per_meter: Option<f64>,

    /// Prefix for generated flow ids
    #[arg(long, default_value = "")]
    pub flow_id_prefix: String,

    #[arg(long, help = "Pretty-print the output document")]
    pub pretty: bool,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per stage")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub json_logs: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    pub fn model_overrides(&self) -> ModelOverrides {
        ModelOverrides {
            job_ratio: self.job_ratio,
            cluster_threshold_meters: self.cluster_threshold_meters,
            gravity_exponent: self.gravity_exponent,
            gravity_min_distance: self.gravity_min_distance,
            local_job_bonus: self.local_job_bonus,
            min_flow_size: self.min_flow_size,
            min_jobs_per_block: self.min_jobs_per_block,
            min_pop_per_block: self.min_pop_per_block,
            split_cap: self.split_cap,
            travel_seconds_per_meter: self.travel_seconds_per_meter,
        }
    }

    pub fn area_config(&self) -> Result<AreaConfig> {
        Ok(AreaConfig {
            name: self.area.clone(),
            blocks: self.blocks.clone(),
            employment: self.employment.clone(),
            buildings: self.buildings.clone(),
            output_path: self.output_path.clone(),
            output_file: self.output_file.clone(),
            field_mapping: parse_field_mapping(&self.field_map)?,
            params: self.model_overrides().apply(&ModelParams::default()),
            pretty: self.pretty,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area() -> AreaConfig {
        AreaConfig {
            name: "seattle".to_string(),
            blocks: "data/blocks.csv".to_string(),
            employment: None,
            buildings: Some("data/buildings.json".to_string()),
            output_path: "./output".to_string(),
            output_file: DEFAULT_OUTPUT_FILE.to_string(),
            field_mapping: None,
            params: ModelParams::default(),
            pretty: false,
        }
    }

    #[test]
    fn test_area_config_validation() {
        assert!(area().validate().is_ok());

        let mut bad = area();
        bad.buildings = Some("buildings.shp".to_string());
        assert!(bad.validate().is_err());

        let mut bad = area();
        bad.name = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = area();
        bad.params.split_cap = 0;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_parse_field_mapping() {
        let pairs = vec!["GEOID=id".to_string(), " P1_001N = population".to_string()];
        let mapping = parse_field_mapping(&pairs).unwrap().unwrap();
        assert_eq!(mapping["GEOID"], "id");
        assert_eq!(mapping["P1_001N"], "population");

        assert!(parse_field_mapping(&[]).unwrap().is_none());
        assert!(parse_field_mapping(&["GEOID".to_string()]).is_err());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_flags_override_defaults() {
        let cli = CliConfig::parse_from([
            "commute-demand",
            "--blocks",
            "blocks.csv",
            "--cluster-threshold-meters",
            "0",
            "--field-map",
            "GEOID=id,POP=population",
        ]);
        let area = cli.area_config().unwrap();
        assert_eq!(area.params.cluster_threshold_meters, 0.0);
        assert_eq!(area.params.gravity_exponent, 0.5);
        assert_eq!(area.field_mapping.unwrap().len(), 2);
        assert_eq!(area.output_file, DEFAULT_OUTPUT_FILE);
    }
}
