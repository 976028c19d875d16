use crate::domain::model::{Block, Building};
use crate::domain::params::ModelParams;
use crate::domain::ports::EmploymentStrategy;
use crate::domain::services::spatial_index::{GridIndex, DEFAULT_CELL_DEGREES};
use crate::utils::error::{DemandError, Result};
use std::collections::HashMap;

/// 單一建築類型的就業密度
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingJobProfile {
    /// 作為工作場所的樓地板比例
    pub multiplier: f64,
    /// 每個工作所需樓地板面積（平方公尺）
    pub area_per_job_m2: f64,
}

// (類型, 工作用途比例, 每份工作面積 m²)
const BUILDING_JOB_PROFILES: &[(&str, f64, f64)] = &[
    ("office", 1.0, 25.0),
    ("commercial", 1.0, 30.0),
    ("retail", 1.0, 40.0),
    ("supermarket", 1.0, 45.0),
    ("kiosk", 1.0, 15.0),
    ("industrial", 1.0, 90.0),
    ("factory", 1.0, 80.0),
    ("manufacture", 1.0, 80.0),
    ("warehouse", 1.0, 150.0),
    ("hangar", 1.0, 200.0),
    ("hospital", 1.0, 35.0),
    ("clinic", 1.0, 30.0),
    ("school", 1.0, 60.0),
    ("kindergarten", 1.0, 50.0),
    ("college", 1.0, 50.0),
    ("university", 1.0, 50.0),
    ("government", 1.0, 30.0),
    ("civic", 1.0, 40.0),
    ("public", 1.0, 40.0),
    ("hotel", 1.0, 60.0),
    ("train_station", 1.0, 80.0),
    ("transportation", 1.0, 80.0),
    ("fire_station", 1.0, 60.0),
    ("sports_hall", 0.8, 150.0),
    ("stadium", 0.5, 300.0),
    ("church", 0.5, 200.0),
    ("cathedral", 0.5, 200.0),
    ("chapel", 0.5, 200.0),
    ("mosque", 0.5, 200.0),
    ("synagogue", 0.5, 200.0),
    ("temple", 0.5, 200.0),
    ("parking", 0.2, 500.0),
    ("garage", 0.2, 200.0),
    ("garages", 0.2, 250.0),
    ("farm", 0.3, 250.0),
    ("barn", 0.3, 400.0),
    ("greenhouse", 0.5, 300.0),
    ("construction", 0.1, 200.0),
    ("apartments", 0.05, 60.0),
    ("residential", 0.05, 60.0),
    ("dormitory", 0.05, 60.0),
    ("house", 0.02, 80.0),
    ("detached", 0.02, 80.0),
    ("terrace", 0.03, 80.0),
];

// 未知類型（含 OSM 的 building=yes）
const FALLBACK_PROFILE: BuildingJobProfile = BuildingJobProfile {
    multiplier: 0.3,
    area_per_job_m2: 50.0,
};

pub fn job_profile(building_type: &str) -> BuildingJobProfile {
    BUILDING_JOB_PROFILES
        .iter()
        .find(|(name, _, _)| *name == building_type)
        .map(|&(_, multiplier, area_per_job_m2)| BuildingJobProfile {
            multiplier,
            area_per_job_m2,
        })
        .unwrap_or(FALLBACK_PROFILE)
}

/// 建築的估計工作容量（未四捨五入）
pub fn building_capacity(building: &Building) -> f64 {
    let profile = job_profile(&building.building_type);
    (building.floor_area_m2 * profile.multiplier / profile.area_per_job_m2).max(0.0)
}

/// 依街區 ID 從外部就業資料複製工作數
#[derive(Debug, Clone, Default)]
pub struct ExactDataStrategy {
    jobs_by_block: Option<HashMap<String, u64>>,
}

impl ExactDataStrategy {
    pub fn new(jobs_by_block: Option<HashMap<String, u64>>) -> Self {
        Self { jobs_by_block }
    }
}

impl EmploymentStrategy for ExactDataStrategy {
    fn name(&self) -> &'static str {
        "exact"
    }

    fn assign_jobs(&self, blocks: &mut [Block], _params: &ModelParams) -> Result<()> {
        let mapping = match &self.jobs_by_block {
            Some(mapping) if !mapping.is_empty() => mapping,
            _ => {
                return Err(DemandError::DataUnavailable {
                    source_name: "Exact employment".to_string(),
                    reason: "no employment mapping for this region".to_string(),
                })
            }
        };

        let covered = blocks.iter().filter(|b| mapping.contains_key(&b.id)).count();
        if covered == 0 {
            return Err(DemandError::DataUnavailable {
                source_name: "Exact employment".to_string(),
                reason: "mapping has no coverage for the blocks in this region".to_string(),
            });
        }

        tracing::debug!("Exact employment covers {} of {} blocks", covered, blocks.len());
        for block in blocks.iter_mut() {
            block.jobs = mapping.get(&block.id).copied().unwrap_or(0);
        }
        Ok(())
    }
}

/// 將 `total_population * job_ratio` 個工作依容量分配給建築，
/// 再計入各建築最近的街區
#[derive(Debug, Clone, Default)]
pub struct CapacityHeuristicStrategy {
    buildings: Vec<Building>,
}

impl CapacityHeuristicStrategy {
    pub fn new(buildings: Vec<Building>) -> Self {
        Self { buildings }
    }
}

impl EmploymentStrategy for CapacityHeuristicStrategy {
    fn name(&self) -> &'static str {
        "capacity_heuristic"
    }

    fn assign_jobs(&self, blocks: &mut [Block], params: &ModelParams) -> Result<()> {
        if self.buildings.is_empty() {
            return Err(DemandError::DataUnavailable {
                source_name: "Building capacity".to_string(),
                reason: "no building footprints for this region".to_string(),
            });
        }

        let capacities: Vec<f64> = self.buildings.iter().map(building_capacity).collect();
        let total_capacity: f64 = capacities.iter().sum();
        if total_capacity <= 0.0 || blocks.is_empty() {
            return Err(DemandError::DataUnavailable {
                source_name: "Building capacity".to_string(),
                reason: "buildings carry no job capacity".to_string(),
            });
        }

        let total_population: u64 = blocks.iter().map(|b| b.population).sum();
        let target_jobs = total_population as f64 * params.job_ratio;

        let index = GridIndex::from_points(blocks.iter().map(|b| b.centroid), DEFAULT_CELL_DEGREES);
        let mut allocated = vec![0.0_f64; blocks.len()];

        for (building, capacity) in self.buildings.iter().zip(&capacities) {
            if *capacity <= 0.0 {
                continue;
            }
            if let Some((nearest, _)) = index.nearest(building.centroid) {
                allocated[nearest] += target_jobs * capacity / total_capacity;
            }
        }

        // 全部比例分配完成後才四捨五入
        for (block, jobs) in blocks.iter_mut().zip(allocated) {
            block.jobs = jobs.round() as u64;
        }

        tracing::debug!(
            "Capacity heuristic spread {:.1} jobs over {} buildings",
            target_jobs,
            self.buildings.len()
        );
        Ok(())
    }
}

/// 每個街區 `jobs = round(population * job_ratio)`
#[derive(Debug, Clone, Copy, Default)]
pub struct UniformHeuristicStrategy;

impl EmploymentStrategy for UniformHeuristicStrategy {
    fn name(&self) -> &'static str {
        "uniform_heuristic"
    }

    fn assign_jobs(&self, blocks: &mut [Block], params: &ModelParams) -> Result<()> {
        for block in blocks.iter_mut() {
            block.jobs = (block.population as f64 * params.job_ratio).round() as u64;
        }
        Ok(())
    }
}

/// 依序嘗試各策略，資料不足時改用下一個
pub struct EmploymentEstimator {
    strategies: Vec<Box<dyn EmploymentStrategy>>,
}

impl EmploymentEstimator {
    pub fn new(strategies: Vec<Box<dyn EmploymentStrategy>>) -> Self {
        Self { strategies }
    }

    /// 先用確切資料，其次建築容量，最後是固定比例
    pub fn for_available_data(
        jobs_by_block: Option<HashMap<String, u64>>,
        buildings: Option<Vec<Building>>,
    ) -> Self {
        let mut strategies: Vec<Box<dyn EmploymentStrategy>> = Vec::new();
        if jobs_by_block.is_some() {
            strategies.push(Box::new(ExactDataStrategy::new(jobs_by_block)));
        }
        if let Some(buildings) = buildings {
            strategies.push(Box::new(CapacityHeuristicStrategy::new(buildings)));
        }
        strategies.push(Box::new(UniformHeuristicStrategy));
        Self::new(strategies)
    }

    pub fn strategy_names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// 為每個街區指定工作數，回傳所用策略名稱
    pub fn estimate(&self, blocks: &mut [Block], params: &ModelParams) -> Result<&'static str> {
        let mut last_error = None;

        for strategy in &self.strategies {
            match strategy.assign_jobs(blocks, params) {
                Ok(()) => {
                    let total_jobs: u64 = blocks.iter().map(|b| b.jobs).sum();
                    if total_jobs == 0 {
                        tracing::warn!(
                            "⚠️ Employment strategy '{}' produced zero jobs, continuing without employment",
                            strategy.name()
                        );
                    } else {
                        tracing::info!(
                            "💼 Employment strategy '{}' assigned {} jobs",
                            strategy.name(),
                            total_jobs
                        );
                    }
                    return Ok(strategy.name());
                }
                Err(e @ DemandError::DataUnavailable { .. }) => {
                    tracing::info!("↪️ {}, falling back", e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| DemandError::ProcessingError {
            stage: "employment".to_string(),
            message: "no employment strategy configured".to_string(),
        }))
    }
}
