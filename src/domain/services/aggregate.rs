use crate::domain::model::{Block, Cluster};
use crate::domain::services::spatial_index::{GridIndex, DEFAULT_CELL_DEGREES};

/// 以種子街區為中心的貪婪聚合
///
/// 依人口由多到少處理街區（同人口時依讀入順序），每個街區加入第一個
/// 種子中心距離小於 `threshold_meters` 的群集，否則成為新的種子。
/// 群集中心建立後不再移動。
#[derive(Debug, Clone, Copy)]
pub struct BlockAggregator {
    threshold_meters: f64,
}

impl BlockAggregator {
    pub fn new(threshold_meters: f64) -> Self {
        Self { threshold_meters }
    }

    pub fn aggregate(&self, blocks: &[Block]) -> Vec<Cluster> {
        let mut order: Vec<usize> = (0..blocks.len()).collect();
        // stable sort 保留原始順序作為同人口時的決勝條件
        order.sort_by(|&a, &b| blocks[b].population.cmp(&blocks[a].population));

        let mut clusters: Vec<Cluster> = Vec::new();
        let mut seeds = GridIndex::new(DEFAULT_CELL_DEGREES);

        for idx in order {
            let block = &blocks[idx];
            match seeds.first_within(block.centroid, self.threshold_meters) {
                Some(cluster_idx) => clusters[cluster_idx].absorb(block),
                None => {
                    seeds.insert(block.centroid);
                    clusters.push(Cluster::seeded(block));
                }
            }
        }

        tracing::debug!(
            "Aggregated {} blocks into {} clusters (threshold {} m)",
            blocks.len(),
            clusters.len(),
            self.threshold_meters
        );
        clusters
    }
}
