use crate::core::Pipeline;
use crate::domain::model::AreaStats;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Outcome of one successful extract → transform → load run.
#[derive(Debug, Clone)]
pub struct EtlOutcome {
    pub output_path: String,
    pub stats: AreaStats,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<EtlOutcome> {
        tracing::info!("🚀 Starting demand model for area '{}'", self.pipeline.name());

        // Extract
        let inputs = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} block records for '{}'",
            inputs.block_records.len(),
            inputs.area
        );
        self.monitor.log_stats("Extract");

        // Transform
        let result = self.pipeline.transform(inputs).await?;
        tracing::info!(
            "🔄 Built {} nodes and {} flows",
            result.model.points.len(),
            result.model.flows.len()
        );
        self.monitor.log_stats("Transform");
        let stats = result.stats.clone();

        // Load
        let output_path = self.pipeline.load(result).await?;
        tracing::info!("💾 Output saved to: {}", output_path);
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(EtlOutcome { output_path, stats })
    }
}
