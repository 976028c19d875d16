use anyhow::Result;
use commute_demand::utils::validation::Validate;
use commute_demand::{AreaSequence, DemandPipeline, FailurePolicy, LocalStorage, RunConfig};
use std::path::Path;
use tempfile::TempDir;

const NORTH_BLOCKS: &str = "id,lon,lat,population,jobs\n\
                            n1,-122.340,47.650,800,\n\
                            n2,-122.300,47.660,120,40\n\
                            n3,-122.320,47.700,0,650\n";

const SOUTH_BLOCKS: &str = "GEOID,x,y,pop\n\
                            s1,-122.440,47.250,420\n\
                            s2,-122.400,47.230,90\n";

const SOUTH_JOBS: &str = "GEOID,jobs\n\
                          s1,30\n\
                          s2,500\n";

// 全部為 0 人口、0 工作，會得到 NoActiveData
const EMPTY_BLOCKS: &str = "id,lon,lat,population\n\
                            e1,-121.000,47.000,0\n\
                            e2,-121.010,47.000,\n";

fn write_fixture(dir: &Path, policy: &str) -> Result<String> {
    std::fs::create_dir_all(dir.join("data"))?;
    std::fs::write(dir.join("data/north.csv"), NORTH_BLOCKS)?;
    std::fs::write(dir.join("data/south.csv"), SOUTH_BLOCKS)?;
    std::fs::write(dir.join("data/south_jobs.csv"), SOUTH_JOBS)?;
    std::fs::write(dir.join("data/empty.csv"), EMPTY_BLOCKS)?;

    let config = format!(
        r#"
[run]
name = "test-run"
version = "1.0.0"

[model]
cluster_threshold_meters = 300.0

[load]
output_path = "out"

[monitoring]
enabled = false

[error_handling]
on_area_failure = "{}"

[[areas]]
name = "north"
blocks = "data/north.csv"

[[areas]]
name = "empty"
blocks = "data/empty.csv"

[[areas]]
name = "south"
blocks = "data/south.csv"
employment = "data/south_jobs.csv"
output_file = "south.json"

[areas.field_mapping]
GEOID = "id"
x = "lon"
y = "lat"
pop = "population"

[areas.model]
min_flow_size = 10
"#,
        policy
    );
    let path = dir.join("run.toml");
    std::fs::write(&path, config)?;
    Ok(path.to_string_lossy().into_owned())
}

fn build_sequence(dir: &Path, config: &RunConfig) -> AreaSequence {
    let storage = LocalStorage::new(dir);
    let mut sequence =
        AreaSequence::new("test_execution".to_string()).with_failure_policy(config.failure_policy());
    for area in config.area_configs() {
        let prefix = format!("{}-", area.name);
        sequence.add_pipeline(Box::new(
            DemandPipeline::new(storage.clone(), area).with_flow_id_prefix(prefix),
        ));
    }
    sequence
}

#[tokio::test]
async fn test_failed_area_does_not_stop_the_others() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = write_fixture(temp_dir.path(), "continue")?;

    let config = RunConfig::from_file(&config_path)?;
    config.validate()?;
    assert_eq!(config.failure_policy(), FailurePolicy::Continue);

    let sequence = build_sequence(temp_dir.path(), &config);
    assert_eq!(sequence.len(), 3);

    let results = sequence.execute_all().await;
    assert_eq!(results.len(), 3);
    assert!(results[0].succeeded());
    assert!(!results[1].succeeded());
    assert!(results[1].error.as_deref().unwrap_or_default().contains("empty"));
    assert!(results[2].succeeded());
    AreaSequence::ensure_any_succeeded(&results)?;

    // 每個成功的區域各自寫出文件
    let north = temp_dir.path().join("out/north/demand_data.json");
    let south = temp_dir.path().join("out/south.json");
    assert!(north.exists());
    assert!(south.exists());
    assert!(!temp_dir.path().join("out/empty").exists());

    let north_doc: serde_json::Value = serde_json::from_slice(&std::fs::read(north)?)?;
    let south_doc: serde_json::Value = serde_json::from_slice(&std::fs::read(south)?)?;

    // 每個區域的 ID 序列獨立
    assert!(north_doc["pops"]
        .as_array()
        .unwrap()
        .iter()
        .all(|p| p["id"].as_str().unwrap().starts_with("north-")));
    let south_pops = south_doc["pops"].as_array().unwrap();
    assert_eq!(south_pops[0]["id"], "south-1");
    assert!(south_pops.iter().all(|p| p["size"].as_u64().unwrap() >= 10));

    let south_ids: Vec<&str> = south_doc["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(south_ids, vec!["s1", "s2"]);

    let summary = AreaSequence::get_execution_summary(&results, sequence.execution_id());
    assert_eq!(summary["total_areas"], 3);
    assert_eq!(summary["succeeded_areas"], serde_json::json!(["north", "south"]));
    assert_eq!(summary["failed_areas"][0]["area"], "empty");
    assert_eq!(summary["total_population"], 920 + 510);

    Ok(())
}

#[tokio::test]
async fn test_stop_policy_skips_remaining_areas() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = write_fixture(temp_dir.path(), "stop")?;

    let config = RunConfig::from_file(&config_path)?;
    assert_eq!(config.failure_policy(), FailurePolicy::Stop);

    let results = build_sequence(temp_dir.path(), &config).execute_all().await;
    assert_eq!(results.len(), 2);
    assert!(results[0].succeeded());
    assert!(!results[1].succeeded());
    assert!(!temp_dir.path().join("out/south.json").exists());

    Ok(())
}

#[tokio::test]
async fn test_disabled_areas_are_not_run() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config_path = write_fixture(temp_dir.path(), "continue")?;
    let content = std::fs::read_to_string(&config_path)?.replace(
        "name = \"empty\"\n",
        "name = \"empty\"\nenabled = false\n",
    );

    let config = RunConfig::from_toml_str(&content)?;
    let results = build_sequence(temp_dir.path(), &config).execute_all().await;
    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.succeeded()));

    Ok(())
}
