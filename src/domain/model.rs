use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 原始輸入記錄（CSV 列或 JSON 物件），欄位尚未正規化
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    pub data: HashMap<String, serde_json::Value>,
}

impl Record {
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, serde_json::Value)>) -> Self {
        Self {
            data: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// 最小空間單位：帶有中心點的普查街區
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: String,
    pub centroid: LonLat,
    pub population: u64,
    pub jobs: u64,
}

/// 容量推估使用的建築資料
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    pub id: String,
    pub centroid: LonLat,
    pub building_type: String,
    pub floor_area_m2: f64,
}

/// 以種子街區為中心合併的街區群集，中心點固定在種子上
#[derive(Debug, Clone, PartialEq)]
pub struct Cluster {
    pub id: String,
    pub centroid: LonLat,
    pub population: u64,
    pub jobs: u64,
    pub member_ids: Vec<String>,
}

impl Cluster {
    pub fn seeded(block: &Block) -> Self {
        Self {
            id: block.id.clone(),
            centroid: block.centroid,
            population: block.population,
            jobs: block.jobs,
            member_ids: vec![block.id.clone()],
        }
    }

    pub fn absorb(&mut self, block: &Block) {
        self.population += block.population;
        self.jobs += block.jobs;
        self.member_ids.push(block.id.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Flow {
    pub id: String,
    pub origin_id: String,
    pub dest_id: String,
    pub size: u64,
    pub distance_meters: f64,
    pub travel_seconds: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub location: LonLat,
    pub jobs: u64,
    pub residents: u64,
    pub flow_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DemandModel {
    pub points: Vec<Node>,
    pub flows: Vec<Flow>,
}

/// 單一區域的全部輸入（已讀入記憶體）
#[derive(Debug, Clone, Default)]
pub struct AreaInputs {
    pub area: String,
    pub block_records: Vec<Record>,
    pub employment_records: Option<Vec<Record>>,
    pub building_records: Option<Vec<Record>>,
}

/// 每個區域處理後的統計資訊
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaStats {
    pub raw_records: usize,
    pub dropped_records: usize,
    pub blocks: usize,
    pub active_blocks: usize,
    pub clusters: usize,
    pub low_population_merged: usize,
    pub origins_without_destinations: usize,
    pub flows: usize,
    pub total_population: u64,
    pub total_jobs: u64,
    pub employment_strategy: String,
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub area: String,
    pub model: DemandModel,
    pub document: String,
    pub stats: AreaStats,
}
