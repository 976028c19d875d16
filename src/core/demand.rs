use crate::domain::model::{AreaInputs, AreaStats, DemandModel, Record};
use crate::domain::params::ModelParams;
use crate::domain::services::ingest::{self, BlockIngestor};
use crate::domain::services::{
    BlockAggregator, EmploymentEstimator, FlowSynthesizer, IdSequence, LowPopulationMerger,
};
use crate::domain::services::serialize::build_model;
use crate::utils::error::{DemandError, Result};
use crate::utils::validation::Validate;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct AreaOutput {
    pub model: DemandModel,
    pub stats: AreaStats,
}

/// 執行單一區域的所有階段：讀入、就業推估、篩選、聚合、
/// 低人口合併、流量合成與節點組裝
///
/// 不使用共享狀態，流量 ID 由 `ids` 產生。
pub fn synthesize_area(
    inputs: &AreaInputs,
    params: &ModelParams,
    field_mapping: Option<&HashMap<String, String>>,
    ids: &mut IdSequence,
) -> Result<AreaOutput> {
    // 參數不合法時拆分後的流量可能小於 min_flow_size
    params.validate()?;

    let ingestor = BlockIngestor::new().with_field_mapping(field_mapping.cloned());
    let report = ingestor.ingest(&inputs.block_records);
    tracing::info!(
        "📥 [{}] Ingested {} blocks ({} records dropped)",
        inputs.area,
        report.blocks.len(),
        report.dropped_records
    );

    let mut stats = AreaStats {
        raw_records: report.raw_records,
        dropped_records: report.dropped_records,
        blocks: report.blocks.len(),
        ..AreaStats::default()
    };

    let exact_jobs = match &inputs.employment_records {
        Some(records) => Some(ingest::ingest_employment(&map_all(&ingestor, records))),
        None if !report.inline_jobs.is_empty() => Some(report.inline_jobs.clone()),
        None => None,
    };
    let buildings = inputs
        .building_records
        .as_ref()
        .map(|records| ingest::ingest_buildings(&map_all(&ingestor, records)));

    let mut blocks = report.blocks;
    let estimator = EmploymentEstimator::for_available_data(exact_jobs, buildings);
    stats.employment_strategy = estimator.estimate(&mut blocks, params)?.to_string();

    let active = ingest::filter_active(blocks);
    if active.is_empty() {
        return Err(DemandError::NoActiveData {
            area: inputs.area.clone(),
        });
    }
    stats.active_blocks = active.len();
    stats.total_population = active.iter().map(|b| b.population).sum();
    stats.total_jobs = active.iter().map(|b| b.jobs).sum();

    let clusters = BlockAggregator::new(params.cluster_threshold_meters).aggregate(&active);
    stats.clusters = clusters.len();
    tracing::info!(
        "🧩 [{}] {} active blocks aggregated into {} clusters",
        inputs.area,
        active.len(),
        clusters.len()
    );

    let merge = LowPopulationMerger::new(params.min_pop_per_block).merge(&clusters);
    stats.low_population_merged = merge.merged;

    let synthesis =
        FlowSynthesizer::new(params).synthesize(&clusters, &merge.adjusted_population, ids);
    stats.origins_without_destinations = synthesis.origins_skipped;
    stats.flows = synthesis.flows.len();
    tracing::info!(
        "🚌 [{}] Synthesized {} flows ({} origins skipped)",
        inputs.area,
        synthesis.flows.len(),
        synthesis.origins_skipped
    );

    Ok(AreaOutput {
        model: build_model(&clusters, synthesis.flows),
        stats,
    })
}

fn map_all(ingestor: &BlockIngestor, records: &[Record]) -> Vec<Record> {
    records.iter().map(|r| ingestor.map_fields(r)).collect()
}
