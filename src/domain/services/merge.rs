use crate::domain::model::Cluster;
use crate::domain::services::spatial_index::{GridIndex, DEFAULT_CELL_DEGREES};

#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// 每個群集的調整後人口（與輸入順序相同），只用於流量合成
    pub adjusted_population: Vec<u64>,
    /// 併入鄰近群集的低人口群集數
    pub merged: usize,
}

/// 將 `0 < population < min_pop` 的群集併入最近的正常群集
#[derive(Debug, Clone, Copy)]
pub struct LowPopulationMerger {
    min_pop: u64,
}

impl LowPopulationMerger {
    pub fn new(min_pop: u64) -> Self {
        Self { min_pop }
    }

    pub fn merge(&self, clusters: &[Cluster]) -> MergeOutcome {
        let mut adjusted: Vec<u64> = clusters.iter().map(|c| c.population).collect();

        let normal: Vec<usize> = (0..clusters.len())
            .filter(|&i| clusters[i].population >= self.min_pop)
            .collect();
        let low: Vec<usize> = (0..clusters.len())
            .filter(|&i| clusters[i].population > 0 && clusters[i].population < self.min_pop)
            .collect();

        if normal.is_empty() {
            if !low.is_empty() {
                tracing::debug!(
                    "No normal clusters, {} low-population clusters excluded as origins",
                    low.len()
                );
            }
            for &i in &low {
                adjusted[i] = 0;
            }
            return MergeOutcome {
                adjusted_population: adjusted,
                merged: 0,
            };
        }

        let index = GridIndex::from_points(
            normal.iter().map(|&i| clusters[i].centroid),
            DEFAULT_CELL_DEGREES,
        );

        let mut merged = 0;
        for &i in &low {
            if let Some((nearest, _)) = index.nearest(clusters[i].centroid) {
                let target = normal[nearest];
                adjusted[target] += clusters[i].population;
                adjusted[i] = 0;
                merged += 1;
            }
        }

        tracing::debug!(
            "Merged {} low-population clusters into normal neighbors",
            merged
        );
        MergeOutcome {
            adjusted_population: adjusted,
            merged,
        }
    }
}
