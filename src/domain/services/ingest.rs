use crate::domain::model::{Block, Building, LonLat, Record};
use crate::domain::services::geo::is_valid_coordinate;
use serde_json::Value;
use std::collections::HashMap;

pub const FIELD_ID: &str = "id";
pub const FIELD_LON: &str = "lon";
pub const FIELD_LAT: &str = "lat";
pub const FIELD_POPULATION: &str = "population";
pub const FIELD_JOBS: &str = "jobs";
pub const FIELD_BUILDING_TYPE: &str = "building_type";
pub const FIELD_FOOTPRINT: &str = "footprint_m2";
pub const FIELD_LEVELS: &str = "levels";

#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub blocks: Vec<Block>,
    /// 街區記錄本身附帶的工作數
    pub inline_jobs: HashMap<String, u64>,
    pub raw_records: usize,
    pub dropped_records: usize,
}

/// 將原始記錄正規化為街區
#[derive(Debug, Clone, Default)]
pub struct BlockIngestor {
    field_mapping: Option<HashMap<String, String>>,
}

impl BlockIngestor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 來源欄位名稱 -> 標準欄位名稱
    pub fn with_field_mapping(mut self, mapping: Option<HashMap<String, String>>) -> Self {
        self.field_mapping = mapping;
        self
    }

    pub fn ingest(&self, records: &[Record]) -> IngestReport {
        let mut blocks: Vec<Block> = Vec::with_capacity(records.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut inline_jobs = HashMap::new();
        let mut dropped = 0;

        for (row, record) in records.iter().enumerate() {
            let record = self.map_fields(record);
            match parse_block(&record) {
                Ok((block, jobs)) => {
                    match jobs {
                        Some(jobs) => {
                            inline_jobs.insert(block.id.clone(), jobs);
                        }
                        None => {
                            inline_jobs.remove(&block.id);
                        }
                    }
                    match positions.get(&block.id) {
                        Some(&pos) => {
                            tracing::debug!(
                                "Block id {} repeated at row {}, later record wins",
                                block.id,
                                row
                            );
                            blocks[pos] = block;
                        }
                        None => {
                            positions.insert(block.id.clone(), blocks.len());
                            blocks.push(block);
                        }
                    }
                }
                Err(reason) => {
                    tracing::warn!("⚠️ Dropping block record at row {}: {}", row, reason);
                    dropped += 1;
                }
            }
        }

        tracing::debug!(
            "Ingested {} blocks from {} records ({} dropped)",
            blocks.len(),
            records.len(),
            dropped
        );

        IngestReport {
            blocks,
            inline_jobs,
            raw_records: records.len(),
            dropped_records: dropped,
        }
    }

    pub fn map_fields(&self, record: &Record) -> Record {
        match &self.field_mapping {
            Some(mapping) => apply_field_mapping(record, mapping),
            None => record.clone(),
        }
    }
}

pub fn apply_field_mapping(record: &Record, mapping: &HashMap<String, String>) -> Record {
    let mut data = HashMap::with_capacity(record.data.len());
    for (key, value) in &record.data {
        let target = mapping.get(key).cloned().unwrap_or_else(|| key.clone());
        // 已對映的欄位優先於同名原始欄位
        if mapping.contains_key(key) || !data.contains_key(&target) {
            data.insert(target, value.clone());
        }
    }
    Record { data }
}

/// 只保留有人口或工作的街區
pub fn filter_active(blocks: Vec<Block>) -> Vec<Block> {
    let before = blocks.len();
    let active: Vec<Block> = blocks
        .into_iter()
        .filter(|b| b.population > 0 || b.jobs > 0)
        .collect();
    tracing::debug!("Active set: {} of {} blocks", active.len(), before);
    active
}

/// 就業資料：街區 ID -> 工作數
pub fn ingest_employment(records: &[Record]) -> HashMap<String, u64> {
    let mut jobs_by_block = HashMap::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        let id = record.data.get(FIELD_ID).and_then(value_as_id);
        let jobs = record.data.get(FIELD_JOBS).and_then(value_as_count);
        match (id, jobs) {
            (Some(id), Some(jobs)) => {
                jobs_by_block.insert(id, jobs);
            }
            _ => tracing::warn!("⚠️ Dropping employment record at row {}: missing id or jobs", row),
        }
    }
    jobs_by_block
}

pub fn ingest_buildings(records: &[Record]) -> Vec<Building> {
    let mut buildings = Vec::with_capacity(records.len());
    for (row, record) in records.iter().enumerate() {
        match parse_building(record) {
            Ok(building) => buildings.push(building),
            Err(reason) => tracing::warn!("⚠️ Dropping building record at row {}: {}", row, reason),
        }
    }
    buildings
}

fn parse_block(record: &Record) -> Result<(Block, Option<u64>), String> {
    let id = record
        .data
        .get(FIELD_ID)
        .and_then(value_as_id)
        .ok_or_else(|| "missing id".to_string())?;
    let centroid = parse_centroid(record).map_err(|e| format!("block {}: {}", id, e))?;

    let population = match record.data.get(FIELD_POPULATION) {
        None | Some(Value::Null) => 0,
        Some(Value::String(s)) if s.trim().is_empty() => 0,
        Some(v) => value_as_count(v)
            .ok_or_else(|| format!("block {}: invalid population {}", id, v))?,
    };
    let jobs = record.data.get(FIELD_JOBS).and_then(value_as_count);

    Ok((
        Block {
            id,
            centroid,
            population,
            jobs: 0,
        },
        jobs,
    ))
}

fn parse_building(record: &Record) -> Result<Building, String> {
    let id = record
        .data
        .get(FIELD_ID)
        .and_then(value_as_id)
        .ok_or_else(|| "missing id".to_string())?;
    let centroid = parse_centroid(record).map_err(|e| format!("building {}: {}", id, e))?;
    let building_type = record
        .data
        .get(FIELD_BUILDING_TYPE)
        .and_then(value_as_id)
        .unwrap_or_else(|| "yes".to_string());
    let footprint = record
        .data
        .get(FIELD_FOOTPRINT)
        .and_then(value_as_f64)
        .filter(|a| *a >= 0.0)
        .ok_or_else(|| format!("building {}: invalid footprint", id))?;
    let levels = record
        .data
        .get(FIELD_LEVELS)
        .and_then(value_as_f64)
        .filter(|l| *l >= 1.0)
        .unwrap_or(1.0);

    Ok(Building {
        id,
        centroid,
        building_type: building_type.to_ascii_lowercase(),
        floor_area_m2: footprint * levels,
    })
}

fn parse_centroid(record: &Record) -> Result<LonLat, String> {
    let lon = record.data.get(FIELD_LON).and_then(value_as_f64);
    let lat = record.data.get(FIELD_LAT).and_then(value_as_f64);
    match (lon, lat) {
        (Some(lon), Some(lat)) if is_valid_coordinate(lon, lat) => Ok(LonLat::new(lon, lat)),
        (Some(lon), Some(lat)) => Err(format!("coordinates out of range ({}, {})", lon, lat)),
        _ => Err("missing or non-numeric coordinates".to_string()),
    }
}

fn value_as_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

/// 非負整數，小數四捨五入
pub(crate) fn value_as_count(value: &Value) -> Option<u64> {
    let v = value_as_f64(value)?;
    (v >= 0.0).then(|| v.round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, lon: Value, lat: Value, population: Value) -> Record {
        Record::from_pairs([
            ("id", json!(id)),
            ("lon", lon),
            ("lat", lat),
            ("population", population),
        ])
    }

    #[test]
    fn test_ingest_valid_records() {
        let records = vec![
            record("a", json!(-122.3), json!(47.6), json!(120)),
            record("b", json!("-122.31"), json!("47.61"), json!("45")),
        ];
        let report = BlockIngestor::new().ingest(&records);
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.dropped_records, 0);
        assert_eq!(report.blocks[1].population, 45);
        assert_eq!(report.blocks[1].centroid, LonLat::new(-122.31, 47.61));
        assert!(report.inline_jobs.is_empty());
    }

    #[test]
    fn test_inline_jobs_are_collected() {
        let mut with_jobs = record("a", json!(1.0), json!(1.0), json!(10));
        with_jobs.data.insert("jobs".to_string(), json!("25"));
        let mut bad_jobs = record("b", json!(1.0), json!(1.0), json!(10));
        bad_jobs.data.insert("jobs".to_string(), json!("n/a"));

        let report = BlockIngestor::new().ingest(&[with_jobs, bad_jobs]);
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.blocks[0].jobs, 0);
        assert_eq!(report.inline_jobs.get("a"), Some(&25));
        assert!(!report.inline_jobs.contains_key("b"));
    }

    #[test]
    fn test_invalid_coordinates_are_dropped() {
        let records = vec![
            record("a", json!("abc"), json!(47.6), json!(10)),
            record("b", json!(200.0), json!(47.6), json!(10)),
            record("c", Value::Null, json!(47.6), json!(10)),
            record("d", json!(-122.3), json!(47.6), json!(10)),
        ];
        let report = BlockIngestor::new().ingest(&records);
        assert_eq!(report.raw_records, 4);
        assert_eq!(report.dropped_records, 3);
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.blocks[0].id, "d");
    }

    #[test]
    fn test_repeated_id_later_wins_in_first_position() {
        let records = vec![
            record("a", json!(1.0), json!(1.0), json!(10)),
            record("b", json!(2.0), json!(2.0), json!(20)),
            record("a", json!(3.0), json!(3.0), json!(30)),
        ];
        let report = BlockIngestor::new().ingest(&records);
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(report.blocks[0].id, "a");
        assert_eq!(report.blocks[0].population, 30);
        assert_eq!(report.blocks[0].centroid, LonLat::new(3.0, 3.0));
    }

    #[test]
    fn test_population_rules() {
        let records = vec![
            record("empty", json!(1.0), json!(1.0), json!("")),
            record("negative", json!(1.0), json!(1.0), json!(-4)),
            record("fraction", json!(1.0), json!(1.0), json!(12.6)),
        ];
        let report = BlockIngestor::new().ingest(&records);
        assert_eq!(report.dropped_records, 1);
        assert_eq!(report.blocks[0].population, 0);
        assert_eq!(report.blocks[1].population, 13);
    }

    #[test]
    fn test_field_mapping() {
        let raw = Record::from_pairs([
            ("GEOID", json!("530330001001")),
            ("INTPTLON", json!("-122.3")),
            ("INTPTLAT", json!("47.6")),
            ("P1_001N", json!("88")),
        ]);
        let mapping: HashMap<String, String> = [
            ("GEOID", "id"),
            ("INTPTLON", "lon"),
            ("INTPTLAT", "lat"),
            ("P1_001N", "population"),
        ]
        .into_iter()
        .map(|(a, b)| (a.to_string(), b.to_string()))
        .collect();

        let report = BlockIngestor::new()
            .with_field_mapping(Some(mapping))
            .ingest(&[raw]);
        assert_eq!(report.blocks.len(), 1);
        assert_eq!(report.blocks[0].id, "530330001001");
        assert_eq!(report.blocks[0].population, 88);
    }

    #[test]
    fn test_filter_active() {
        let blocks = vec![
            Block { id: "a".into(), centroid: LonLat::new(0.0, 0.0), population: 0, jobs: 0 },
            Block { id: "b".into(), centroid: LonLat::new(0.0, 0.0), population: 0, jobs: 3 },
            Block { id: "c".into(), centroid: LonLat::new(0.0, 0.0), population: 5, jobs: 0 },
        ];
        let active = filter_active(blocks);
        let ids: Vec<&str> = active.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_ingest_employment_and_buildings() {
        let employment = vec![
            Record::from_pairs([("id", json!("a")), ("jobs", json!("40"))]),
            Record::from_pairs([("id", json!("b"))]),
        ];
        let jobs = ingest_employment(&employment);
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs["a"], 40);

        let buildings = vec![
            Record::from_pairs([
                ("id", json!("w1")),
                ("lon", json!(0.0)),
                ("lat", json!(0.0)),
                ("building_type", json!("Office")),
                ("footprint_m2", json!(500.0)),
                ("levels", json!(4)),
            ]),
            Record::from_pairs([("id", json!("w2")), ("lon", json!(0.0)), ("lat", json!(0.0))]),
        ];
        let parsed = ingest_buildings(&buildings);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].building_type, "office");
        assert_eq!(parsed[0].floor_area_m2, 2000.0);
    }
}
