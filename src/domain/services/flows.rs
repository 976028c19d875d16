use crate::domain::model::{Cluster, Flow};
use crate::domain::params::ModelParams;
use crate::domain::services::geo::haversine_meters;

/// 由呼叫端持有的流水號產生器
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdSequence {
    prefix: String,
    next: u64,
}

impl IdSequence {
    pub fn new(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: start,
        }
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("{}{}", self.prefix, self.next);
        self.next += 1;
        id
    }

    pub fn peek(&self) -> u64 {
        self.next
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new("", 1)
    }
}

/// 重力模型中，距離 `distance_meters` 的目的地吸引力
pub fn attractiveness(jobs: u64, distance_meters: f64, params: &ModelParams) -> f64 {
    // 至少 1 m，避免 0 的負指數次方
    let effective = distance_meters.max(params.gravity_min_distance).max(1.0);
    jobs as f64 / effective.powf(params.gravity_exponent)
}

/// 超過 `cap` 的流量拆成 `ceil(size / cap)` 等份
pub fn split_sizes(size: u64, cap: u64) -> Vec<u64> {
    if cap == 0 || size <= cap {
        return vec![size];
    }
    let splits = size.div_ceil(cap);
    let piece = (size as f64 / splits as f64).round() as u64;
    vec![piece; splits as usize]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSynthesis {
    pub flows: Vec<Flow>,
    /// 沒有任何有吸引力目的地而略過的起點數
    pub origins_skipped: usize,
}

struct Candidate {
    dest: usize,
    distance: f64,
    attractiveness: f64,
}

pub struct FlowSynthesizer<'a> {
    params: &'a ModelParams,
}

impl<'a> FlowSynthesizer<'a> {
    pub fn new(params: &'a ModelParams) -> Self {
        Self { params }
    }

    /// `adjusted_population[i]` 對應 `clusters[i]`
    pub fn synthesize(
        &self,
        clusters: &[Cluster],
        adjusted_population: &[u64],
        ids: &mut IdSequence,
    ) -> FlowSynthesis {
        let mut result = FlowSynthesis::default();

        for (origin_idx, origin) in clusters.iter().enumerate() {
            let population = adjusted_population.get(origin_idx).copied().unwrap_or(0);
            if population < self.params.min_pop_per_block || population == 0 {
                continue;
            }

            let candidates = self.candidates(origin_idx, clusters);
            let total: f64 = candidates.iter().map(|c| c.attractiveness).sum();
            if total <= 0.0 {
                tracing::debug!("Origin {} has no attractive destinations, skipped", origin.id);
                result.origins_skipped += 1;
                continue;
            }

            for candidate in candidates.iter().filter(|c| c.attractiveness > 0.0) {
                let size = (population as f64 * candidate.attractiveness / total).round() as u64;
                if size < self.params.min_flow_size {
                    continue;
                }

                let dest = &clusters[candidate.dest];
                for piece in split_sizes(size, self.params.split_cap) {
                    result.flows.push(Flow {
                        id: ids.next_id(),
                        origin_id: origin.id.clone(),
                        dest_id: dest.id.clone(),
                        size: piece,
                        distance_meters: candidate.distance,
                        travel_seconds: candidate.distance * self.params.travel_seconds_per_meter,
                    });
                }
            }
        }

        tracing::debug!(
            "Synthesized {} flows ({} origins without destinations)",
            result.flows.len(),
            result.origins_skipped
        );
        result
    }

    fn candidates(&self, origin_idx: usize, clusters: &[Cluster]) -> Vec<Candidate> {
        let origin = &clusters[origin_idx];
        let mut candidates = Vec::new();

        for (dest_idx, dest) in clusters.iter().enumerate() {
            if dest_idx == origin_idx {
                if dest.jobs > 0 {
                    candidates.push(Candidate {
                        dest: dest_idx,
                        distance: 0.0,
                        attractiveness: dest.jobs as f64 * self.params.local_job_bonus,
                    });
                }
                continue;
            }

            if dest.jobs < self.params.min_jobs_per_block {
                continue;
            }
            let distance = haversine_meters(origin.centroid, dest.centroid);
            candidates.push(Candidate {
                dest: dest_idx,
                distance,
                attractiveness: attractiveness(dest.jobs, distance, self.params),
            });
        }

        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::LonLat;
    use crate::domain::services::geo::EARTH_RADIUS_METERS;

    fn cluster(id: &str, lon: f64, lat: f64, population: u64, jobs: u64) -> Cluster {
        Cluster {
            id: id.to_string(),
            centroid: LonLat::new(lon, lat),
            population,
            jobs,
            member_ids: vec![id.to_string()],
        }
    }

    // 赤道上往東 meters 公尺的經度
    fn lon_for_meters(meters: f64) -> f64 {
        (meters / EARTH_RADIUS_METERS).to_degrees()
    }

    #[test]
    fn test_id_sequence() {
        let mut ids = IdSequence::new("f", 7);
        assert_eq!(ids.next_id(), "f7");
        assert_eq!(ids.next_id(), "f8");
        assert_eq!(ids.peek(), 9);
        assert_eq!(IdSequence::default().next_id(), "1");
    }

    #[test]
    fn test_attractiveness_floor_and_decay() {
        let params = ModelParams::default();
        assert_eq!(
            attractiveness(100, 10.0, &params),
            attractiveness(100, 2500.0, &params)
        );
        assert!((attractiveness(100, 1000.0, &params) - 2.0).abs() < 1e-12);

        let mut previous = f64::INFINITY;
        for d in [2_600.0, 3_000.0, 5_000.0, 10_000.0, 50_000.0] {
            let a = attractiveness(100, d, &params);
            assert!(a < previous);
            previous = a;
        }
    }

    #[test]
    fn test_split_sizes() {
        assert_eq!(split_sizes(850, 400), vec![283, 283, 283]);
        assert_eq!(split_sizes(400, 400), vec![400]);
        assert_eq!(split_sizes(401, 400), vec![201, 201]);
        assert_eq!(split_sizes(12, 400), vec![12]);
    }

    #[test]
    fn test_gravity_scenario_four_to_one() {
        let params = ModelParams::default();
        // 兩個目的地都在 gravity_min_distance 之內
        let clusters = vec![
            cluster("origin", 0.0, 0.0, 1000, 0),
            cluster("a", lon_for_meters(1000.0), 0.0, 0, 100),
            cluster("b", -lon_for_meters(2000.0), 0.0, 0, 400),
        ];
        let mut ids = IdSequence::default();
        let result = FlowSynthesizer::new(&params).synthesize(&clusters, &[1000, 0, 0], &mut ids);

        let size_to = |dest: &str| -> u64 {
            result
                .flows
                .iter()
                .filter(|f| f.dest_id == dest)
                .map(|f| f.size)
                .sum()
        };
        assert_eq!(size_to("a"), 200);
        assert_eq!(size_to("b"), 800);
        assert_eq!(result.flows.iter().filter(|f| f.dest_id == "b").count(), 2);
        assert!(result.flows.iter().all(|f| f.origin_id == "origin"));
    }

    #[test]
    fn test_distance_beyond_floor_decays() {
        let params = ModelParams::default();
        let clusters = vec![
            cluster("origin", 0.0, 0.0, 1000, 0),
            cluster("a", lon_for_meters(1000.0), 0.0, 0, 100),
            cluster("b", -lon_for_meters(4000.0), 0.0, 0, 400),
        ];
        let mut ids = IdSequence::default();
        let result = FlowSynthesizer::new(&params).synthesize(&clusters, &[1000, 0, 0], &mut ids);

        let sizes: Vec<(&str, u64)> = result
            .flows
            .iter()
            .map(|f| (f.dest_id.as_str(), f.size))
            .collect();
        // 2 / (2 + 400 / sqrt(4000)) ≈ 0.24
        assert_eq!(sizes, vec![("a", 240), ("b", 380), ("b", 380)]);
    }

    #[test]
    fn test_local_jobs_are_heavily_discounted() {
        let params = ModelParams::default();
        let clusters = vec![
            cluster("home", 0.0, 0.0, 1000, 1000),
            cluster("work", lon_for_meters(3000.0), 0.0, 0, 100),
        ];
        let mut ids = IdSequence::default();
        let result = FlowSynthesizer::new(&params).synthesize(&clusters, &[1000, 0], &mut ids);

        // 本地吸引力 1000 * 0.001 = 1，遠處約 1.826
        let local: u64 = result.flows.iter().filter(|f| f.dest_id == "home").map(|f| f.size).sum();
        let remote: u64 = result.flows.iter().filter(|f| f.dest_id == "work").map(|f| f.size).sum();
        assert!(remote > local);
        let local_flow = result.flows.iter().find(|f| f.dest_id == "home").unwrap();
        assert_eq!(local_flow.distance_meters, 0.0);
        assert_eq!(local_flow.travel_seconds, 0.0);
    }

    #[test]
    fn test_origin_without_attractiveness_is_skipped() {
        let params = ModelParams::default();
        let clusters = vec![
            cluster("lonely", 0.0, 0.0, 500, 0),
            cluster("tiny_jobs", 0.01, 0.0, 0, 3),
        ];
        let mut ids = IdSequence::default();
        let result = FlowSynthesizer::new(&params).synthesize(&clusters, &[500, 0], &mut ids);
        assert!(result.flows.is_empty());
        assert_eq!(result.origins_skipped, 1);
        assert_eq!(ids.peek(), 1);
    }

    #[test]
    fn test_small_allocations_are_discarded() {
        let params = ModelParams::default();
        let clusters = vec![
            cluster("origin", 0.0, 0.0, 100, 0),
            cluster("big", 0.01, 0.0, 0, 1000),
            cluster("small", 0.011, 0.0, 0, 10),
        ];
        let mut ids = IdSequence::default();
        let result = FlowSynthesizer::new(&params).synthesize(&clusters, &[100, 0, 0], &mut ids);
        assert_eq!(result.flows.len(), 1);
        assert_eq!(result.flows[0].dest_id, "big");
        assert!(result.flows.iter().all(|f| f.size >= params.min_flow_size));
    }

    #[test]
    fn test_adjusted_population_controls_origins() {
        let params = ModelParams::default();
        let clusters = vec![
            cluster("merged_away", 0.0, 0.0, 8, 0),
            cluster("work", 0.02, 0.0, 0, 100),
        ];
        let mut ids = IdSequence::default();
        let result = FlowSynthesizer::new(&params).synthesize(&clusters, &[0, 0], &mut ids);
        assert!(result.flows.is_empty());
        assert_eq!(result.origins_skipped, 0);
    }

    #[test]
    fn test_travel_time_is_linear_in_distance() {
        let params = ModelParams::default();
        let clusters = vec![
            cluster("origin", 0.0, 0.0, 100, 0),
            cluster("work", lon_for_meters(5000.0), 0.0, 0, 50),
        ];
        let mut ids = IdSequence::default();
        let result = FlowSynthesizer::new(&params).synthesize(&clusters, &[100, 0], &mut ids);
        let flow = &result.flows[0];
        assert_eq!(flow.size, 100);
        assert!((flow.distance_meters - 5000.0).abs() < 1e-6);
        assert!((flow.travel_seconds - 600.0).abs() < 1e-6);
    }
}
