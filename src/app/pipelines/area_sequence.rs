use crate::core::Pipeline;
use crate::domain::model::AreaStats;
use crate::utils::error::{DemandError, Result};
use crate::utils::monitor::SystemMonitor;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// 單一區域的執行結果（成功或失敗）
#[derive(Debug, Clone)]
pub struct AreaResult {
    pub area: String,
    pub output_path: Option<String>,
    pub stats: Option<AreaStats>,
    pub error: Option<String>,
    pub duration: Duration,
}

impl AreaResult {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// 區域失敗後，其餘區域的處理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    #[default]
    Continue,
    Stop,
}

/// 依序執行各區域，單一區域失敗不影響其他區域
pub struct AreaSequence {
    pipelines: Vec<Box<dyn Pipeline>>,
    monitor: SystemMonitor,
    execution_id: String,
    policy: FailurePolicy,
}

impl AreaSequence {
    pub fn new(execution_id: String) -> Self {
        Self {
            pipelines: Vec::new(),
            monitor: SystemMonitor::new(false),
            execution_id,
            policy: FailurePolicy::default(),
        }
    }

    /// 啟用或禁用系統監控
    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = SystemMonitor::new(enabled);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn add_pipeline(&mut self, pipeline: Box<dyn Pipeline>) {
        self.pipelines.push(pipeline);
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// 執行所有區域並回報每個區域的結果
    pub async fn execute_all(&self) -> Vec<AreaResult> {
        let mut results = Vec::with_capacity(self.pipelines.len());
        self.monitor.log_stats("Sequence started");

        for pipeline in &self.pipelines {
            let start_time = Instant::now();
            let area = pipeline.name().to_string();
            tracing::info!("🏙️ Processing area: {}", area);

            let result = match Self::execute_pipeline(pipeline.as_ref()).await {
                Ok((output_path, stats)) => {
                    tracing::info!(
                        "✅ Area completed: {} (nodes: {}, flows: {}, duration: {:?})",
                        area,
                        stats.clusters,
                        stats.flows,
                        start_time.elapsed()
                    );
                    AreaResult {
                        area,
                        output_path: Some(output_path),
                        stats: Some(stats),
                        error: None,
                        duration: start_time.elapsed(),
                    }
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Area failed: {}: {} (Category: {:?}, Severity: {:?})",
                        area,
                        e,
                        e.category(),
                        e.severity()
                    );
                    AreaResult {
                        area,
                        output_path: None,
                        stats: None,
                        error: Some(e.to_string()),
                        duration: start_time.elapsed(),
                    }
                }
            };

            let failed = !result.succeeded();
            results.push(result);
            self.monitor.log_stats("Area finished");

            if failed && self.policy == FailurePolicy::Stop {
                tracing::warn!("⏹️ Stopping sequence after failure (on_area_failure = stop)");
                break;
            }
        }

        self.monitor.log_final_stats();
        results
    }

    async fn execute_pipeline(pipeline: &dyn Pipeline) -> Result<(String, AreaStats)> {
        let inputs = pipeline.extract().await?;
        tracing::debug!("📥 Extracted {} block records", inputs.block_records.len());

        let result = pipeline.transform(inputs).await?;
        tracing::debug!("🔄 Built {} flows", result.model.flows.len());

        let stats = result.stats.clone();
        let output_path = pipeline.load(result).await?;
        tracing::debug!("💾 Loaded data to: {}", output_path);

        Ok((output_path, stats))
    }

    /// 執行摘要：總計與各區域結果，鍵值順序固定
    pub fn get_execution_summary(results: &[AreaResult], execution_id: &str) -> Map<String, Value> {
        let mut summary = Map::new();

        let succeeded: Vec<Value> = results
            .iter()
            .filter(|r| r.succeeded())
            .map(|r| Value::String(r.area.clone()))
            .collect();
        let failed: Vec<Value> = results
            .iter()
            .filter(|r| !r.succeeded())
            .map(|r| {
                serde_json::json!({
                    "area": r.area,
                    "error": r.error.clone().unwrap_or_default(),
                })
            })
            .collect();

        let stats = results.iter().filter_map(|r| r.stats.as_ref());
        let (total_nodes, total_flows, total_population) =
            stats.fold((0usize, 0usize, 0u64), |(n, f, p), s| {
                (n + s.clusters, f + s.flows, p + s.total_population)
            });
        let total_duration: Duration = results.iter().map(|r| r.duration).sum();

        summary.insert("execution_id".to_string(), Value::String(execution_id.to_string()));
        summary.insert(
            "finished_at".to_string(),
            Value::String(chrono::Utc::now().to_rfc3339()),
        );
        summary.insert("total_areas".to_string(), Value::Number(results.len().into()));
        summary.insert("total_nodes".to_string(), Value::Number(total_nodes.into()));
        summary.insert("total_flows".to_string(), Value::Number(total_flows.into()));
        summary.insert("total_population".to_string(), Value::Number(total_population.into()));
        summary.insert(
            "total_duration_ms".to_string(),
            Value::Number((total_duration.as_millis() as u64).into()),
        );
        summary.insert("succeeded_areas".to_string(), Value::Array(succeeded));
        summary.insert("failed_areas".to_string(), Value::Array(failed));

        summary
    }

    /// 所有區域皆失敗時回傳錯誤
    pub fn ensure_any_succeeded(results: &[AreaResult]) -> Result<()> {
        if !results.is_empty() && results.iter().all(|r| !r.succeeded()) {
            return Err(DemandError::ProcessingError {
                stage: "sequence".to_string(),
                message: format!("all {} areas failed", results.len()),
            });
        }
        Ok(())
    }
}
