use crate::app::pipelines::FailurePolicy;
use crate::config::{AreaConfig, ModelOverrides, ModelParams, DEFAULT_OUTPUT_FILE};
use crate::utils::error::{DemandError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_path, Validate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// 從 TOML 載入的多區域執行配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub run: RunInfo,
    #[serde(default)]
    pub model: ModelParams,
    pub load: LoadConfig,
    pub areas: Vec<AreaDefinition>,
    pub monitoring: Option<MonitoringConfig>,
    pub error_handling: Option<ErrorHandlingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub name: String,
    pub description: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub pretty: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AreaDefinition {
    pub name: String,
    pub enabled: Option<bool>,
    pub blocks: String,
    pub employment: Option<String>,
    pub buildings: Option<String>,
    /// 預設為 `<name>/demand_data.json`
    pub output_file: Option<String>,
    pub field_mapping: Option<HashMap<String, String>>,
    pub model: Option<ModelOverrides>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
    pub export_summary: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    pub on_area_failure: Option<String>,
}

impl AreaDefinition {
    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

impl RunConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(DemandError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${DATA_DIR})，未定義的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| DemandError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validate_non_empty_string("run.name", &self.run.name)?;
        validate_path("load.output_path", &self.load.output_path)?;
        self.model.validate()?;

        if self.areas.is_empty() {
            return Err(DemandError::MissingConfigError {
                field: "areas".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for area in &self.areas {
            if !seen.insert(area.name.as_str()) {
                return Err(DemandError::InvalidConfigValueError {
                    field: "areas.name".to_string(),
                    value: area.name.clone(),
                    reason: "Area names must be unique".to_string(),
                });
            }
        }

        for area in self.area_configs() {
            area.validate()?;
        }

        if let Some(policy) = self
            .error_handling
            .as_ref()
            .and_then(|e| e.on_area_failure.as_deref())
        {
            if !matches!(policy, "continue" | "stop") {
                return Err(DemandError::InvalidConfigValueError {
                    field: "error_handling.on_area_failure".to_string(),
                    value: policy.to_string(),
                    reason: "Valid values: continue, stop".to_string(),
                });
            }
        }

        Ok(())
    }

    /// 所有啟用區域的完整設定，依檔案中的順序
    pub fn area_configs(&self) -> Vec<AreaConfig> {
        let pretty = self.load.pretty.unwrap_or(false);
        self.areas
            .iter()
            .filter(|a| a.is_enabled())
            .map(|a| AreaConfig {
                name: a.name.clone(),
                blocks: a.blocks.clone(),
                employment: a.employment.clone(),
                buildings: a.buildings.clone(),
                output_path: self.load.output_path.clone(),
                output_file: a
                    .output_file
                    .clone()
                    .unwrap_or_else(|| format!("{}/{}", a.name, DEFAULT_OUTPUT_FILE)),
                field_mapping: a.field_mapping.clone(),
                params: a
                    .model
                    .as_ref()
                    .map(|o| o.apply(&self.model))
                    .unwrap_or_else(|| self.model.clone()),
                pretty,
            })
            .collect()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        match self
            .error_handling
            .as_ref()
            .and_then(|e| e.on_area_failure.as_deref())
        {
            Some("stop") => FailurePolicy::Stop,
            _ => FailurePolicy::Continue,
        }
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }

    pub fn export_summary(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.export_summary)
            .unwrap_or(false)
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
