use crate::utils::error::{DemandError, Result};
use crate::utils::validation::{
    validate_non_negative, validate_positive_number, validate_range, Validate,
};
use serde::{Deserialize, Serialize};

/// 需求模型參數，鍵名為 snake_case，也接受下游工具使用的 camelCase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// 推估就業時每位居民對應的工作數
    #[serde(alias = "jobRatio")]
    pub job_ratio: f64,
    #[serde(alias = "clusterThresholdMeters")]
    pub cluster_threshold_meters: f64,
    /// 距離衰減指數，越小越偏好遠處的工作
    #[serde(alias = "gravityExponent")]
    pub gravity_exponent: f64,
    /// 重力模型中小於此值的距離以此值計算
    #[serde(alias = "gravityMinDistance")]
    pub gravity_min_distance: f64,
    #[serde(alias = "localJobBonus")]
    pub local_job_bonus: f64,
    #[serde(alias = "minFlowSize")]
    pub min_flow_size: u64,
    #[serde(alias = "minJobsPerBlock")]
    pub min_jobs_per_block: u64,
    #[serde(alias = "minPopPerBlock")]
    pub min_pop_per_block: u64,
    #[serde(alias = "splitCap")]
    pub split_cap: u64,
    #[serde(alias = "travelSecondsPerMeter")]
    pub travel_seconds_per_meter: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            job_ratio: 0.95,
            cluster_threshold_meters: 300.0,
            gravity_exponent: 0.5,
            gravity_min_distance: 2500.0,
            local_job_bonus: 0.001,
            min_flow_size: 5,
            min_jobs_per_block: 5,
            min_pop_per_block: 10,
            split_cap: 400,
            travel_seconds_per_meter: 0.12,
        }
    }
}

impl Validate for ModelParams {
    fn validate(&self) -> Result<()> {
        validate_range("job_ratio", self.job_ratio, 0.0, 100.0)?;
        validate_non_negative("cluster_threshold_meters", self.cluster_threshold_meters)?;
        validate_non_negative("gravity_exponent", self.gravity_exponent)?;
        validate_non_negative("gravity_min_distance", self.gravity_min_distance)?;
        validate_non_negative("local_job_bonus", self.local_job_bonus)?;
        validate_non_negative("travel_seconds_per_meter", self.travel_seconds_per_meter)?;
        validate_positive_number("split_cap", self.split_cap, 1)?;
        validate_positive_number("min_flow_size", self.min_flow_size, 1)?;

        // 拆分後每段約為 split_cap 的一半以上，必須仍不小於 min_flow_size
        if self.min_flow_size > self.split_cap / 2 {
            return Err(DemandError::InvalidConfigValueError {
                field: "min_flow_size".to_string(),
                value: self.min_flow_size.to_string(),
                reason: format!(
                    "Value must not exceed half of split_cap ({})",
                    self.split_cap
                ),
            });
        }

        Ok(())
    }
}

/// 疊加在基礎 `ModelParams` 上的區域參數覆蓋
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOverrides {
    #[serde(alias = "jobRatio")]
    pub job_ratio: Option<f64>,
    #[serde(alias = "clusterThresholdMeters")]
    pub cluster_threshold_meters: Option<f64>,
    #[serde(alias = "gravityExponent")]
    pub gravity_exponent: Option<f64>,
    #[serde(alias = "gravityMinDistance")]
    pub gravity_min_distance: Option<f64>,
    #[serde(alias = "localJobBonus")]
    pub local_job_bonus: Option<f64>,
    #[serde(alias = "minFlowSize")]
    pub min_flow_size: Option<u64>,
    #[serde(alias = "minJobsPerBlock")]
    pub min_jobs_per_block: Option<u64>,
    #[serde(alias = "minPopPerBlock")]
    pub min_pop_per_block: Option<u64>,
    #[serde(alias = "splitCap")]
    pub split_cap: Option<u64>,
    #[serde(alias = "travelSecondsPerMeter")]
    pub travel_seconds_per_meter: Option<f64>,
}

impl ModelOverrides {
    pub fn apply(&self, base: &ModelParams) -> ModelParams {
        ModelParams {
            job_ratio: self.job_ratio.unwrap_or(base.job_ratio),
            cluster_threshold_meters: self
                .cluster_threshold_meters
                .unwrap_or(base.cluster_threshold_meters),
            gravity_exponent: self.gravity_exponent.unwrap_or(base.gravity_exponent),
            gravity_min_distance: self.gravity_min_distance.unwrap_or(base.gravity_min_distance),
            local_job_bonus: self.local_job_bonus.unwrap_or(base.local_job_bonus),
            min_flow_size: self.min_flow_size.unwrap_or(base.min_flow_size),
            min_jobs_per_block: self.min_jobs_per_block.unwrap_or(base.min_jobs_per_block),
            min_pop_per_block: self.min_pop_per_block.unwrap_or(base.min_pop_per_block),
            split_cap: self.split_cap.unwrap_or(base.split_cap),
            travel_seconds_per_meter: self
                .travel_seconds_per_meter
                .unwrap_or(base.travel_seconds_per_meter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let params = ModelParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.split_cap, 400);
        assert_eq!(params.min_pop_per_block, 10);
    }

    #[test]
    fn test_camel_case_aliases() {
        let params: ModelParams =
            serde_json::from_str(r#"{"gravityExponent": 1.5, "minFlowSize": 8}"#).unwrap();
        assert_eq!(params.gravity_exponent, 1.5);
        assert_eq!(params.min_flow_size, 8);
        assert_eq!(params.job_ratio, 0.95);
    }

    #[test]
    fn test_min_flow_size_bounded_by_split_cap() {
        let params = ModelParams {
            min_flow_size: 300,
            ..ModelParams::default()
        };
        assert!(params.validate().is_err());

        let params = ModelParams {
            gravity_exponent: -1.0,
            ..ModelParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_overrides_apply_only_set_fields() {
        let base = ModelParams::default();
        let overrides = ModelOverrides {
            cluster_threshold_meters: Some(0.0),
            ..ModelOverrides::default()
        };
        let merged = overrides.apply(&base);
        assert_eq!(merged.cluster_threshold_meters, 0.0);
        assert_eq!(merged.gravity_min_distance, base.gravity_min_distance);
    }
}
