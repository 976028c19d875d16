use clap::Parser;
use commute_demand::core::Storage;
use commute_demand::utils::{logger, validation::Validate};
use commute_demand::{AreaConfig, AreaResult, AreaSequence, DemandPipeline, LocalStorage, RunConfig};
use std::collections::HashSet;
use std::path::Path;

const SUMMARY_FILE: &str = "sequence_summary.json";

#[derive(Parser)]
#[command(name = "demand-sequence")]
#[command(about = "Build commuter demand models for every area in a TOML run file")]
struct Args {
    /// Path to the run configuration file
    #[arg(short, long, default_value = "demand-run.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Dry run - show the areas and parameters without processing
    #[arg(long)]
    dry_run: bool,

    /// Execution ID for this run
    #[arg(long)]
    execution_id: Option<String>,

    /// Process only specific areas (comma-separated)
    #[arg(long)]
    only: Option<String>,

    /// Skip specific areas (comma-separated)
    #[arg(long)]
    skip: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // 先載入配置，才能決定日誌格式
    let config = RunConfig::from_file(&args.config);
    let json_logs = args.json_logs
        || config.as_ref().map(|c| c.json_logs()).unwrap_or(false);
    logger::init_logger(args.verbose, json_logs);

    tracing::info!("🚀 Starting demand-sequence");
    tracing::info!("📁 Loading run configuration from: {}", args.config);

    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");

    let execution_id = args
        .execution_id
        .clone()
        .unwrap_or_else(|| format!("run_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S")));

    let areas = determine_areas(&config, &args);
    display_run_summary(&config, &areas, &args, &execution_id);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No actual processing will occur");
        perform_dry_run(&areas);
        return Ok(());
    }

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 配置檔中的相對路徑以配置檔所在目錄為基準
    let base_dir = Path::new(&args.config)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();
    let storage = LocalStorage::new(base_dir);

    let mut sequence = AreaSequence::new(execution_id.clone())
        .with_monitoring(monitor_enabled)
        .with_failure_policy(config.failure_policy());

    for area in areas {
        tracing::info!("📦 Setting up area: {}", area.name);
        let prefix = format!("{}-", area.name);
        let pipeline = DemandPipeline::new(storage.clone(), area).with_flow_id_prefix(prefix);
        sequence.add_pipeline(Box::new(pipeline));
    }

    tracing::info!("🎬 Starting area sequence execution");
    let results = sequence.execute_all().await;
    display_execution_results(&results, &execution_id);

    if config.export_summary() {
        let summary = AreaSequence::get_execution_summary(&results, &execution_id);
        let summary_path = Path::new(&config.load.output_path)
            .join(SUMMARY_FILE)
            .to_string_lossy()
            .into_owned();
        let json = serde_json::to_string_pretty(&summary)?;
        storage.write_file(&summary_path, json.as_bytes()).await?;
        tracing::info!("📊 Execution summary exported to: {}", summary_path);
        println!("📊 Summary exported to: {}", summary_path);
    }

    if let Err(e) = AreaSequence::ensure_any_succeeded(&results) {
        tracing::error!("❌ {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(e.exit_code());
    }

    let failed = results.iter().filter(|r| !r.succeeded()).count();
    if failed > 0 {
        println!("⚠️ Run finished with {} failed area(s)", failed);
        std::process::exit(2);
    }

    println!("✅ All areas completed successfully!");
    println!("🆔 Execution ID: {}", execution_id);
    Ok(())
}

fn determine_areas(config: &RunConfig, args: &Args) -> Vec<AreaConfig> {
    let mut areas = config.area_configs();

    // 處理 --only 參數
    if let Some(only_list) = &args.only {
        let only_names: HashSet<&str> = only_list.split(',').map(|s| s.trim()).collect();
        areas.retain(|a| only_names.contains(a.name.as_str()));
    }

    // 處理 --skip 參數
    if let Some(skip_list) = &args.skip {
        let skip_names: HashSet<&str> = skip_list.split(',').map(|s| s.trim()).collect();
        areas.retain(|a| !skip_names.contains(a.name.as_str()));
    }

    areas
}

fn display_run_summary(config: &RunConfig, areas: &[AreaConfig], args: &Args, execution_id: &str) {
    println!("📋 Run Summary:");
    println!(
        "  Name: {} v{}",
        config.run.name,
        config.run.version.as_deref().unwrap_or("-")
    );
    if let Some(description) = &config.run.description {
        println!("  Description: {}", description);
    }
    println!("  Execution ID: {}", execution_id);
    println!("  Output: {}", config.load.output_path);
    println!("  Areas: {} of {}", areas.len(), config.areas.len());
    println!("  On failure: {:?}", config.failure_policy());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}

fn perform_dry_run(areas: &[AreaConfig]) {
    println!("🔍 Dry Run Analysis:");
    println!();

    for (index, area) in areas.iter().enumerate() {
        let params = &area.params;
        println!("📦 Area {}: {}", index + 1, area.name);
        println!("  🧱 Blocks: {}", area.blocks);
        match (&area.employment, &area.buildings) {
            (Some(jobs), _) => println!("  💼 Employment: exact data from {}", jobs),
            (None, Some(buildings)) => {
                println!("  🏢 Employment: building capacity from {}", buildings)
            }
            (None, None) => println!("  📐 Employment: inline jobs or uniform job ratio"),
        }
        if let Some(mapping) = &area.field_mapping {
            let mut pairs: Vec<_> = mapping.iter().collect();
            pairs.sort();
            for (from, to) in pairs {
                println!("  🔄 {} -> {}", from, to);
            }
        }
        println!(
            "  ⚙️ threshold {} m, exponent {}, min flow {}, split cap {}",
            params.cluster_threshold_meters,
            params.gravity_exponent,
            params.min_flow_size,
            params.split_cap
        );
        println!(
            "  💾 Output: {}",
            Path::new(&area.output_path).join(&area.output_file).display()
        );
        println!();
    }

    println!("✅ Dry run analysis complete.");
}

fn display_execution_results(results: &[AreaResult], execution_id: &str) {
    println!();
    println!("📊 Execution Results Summary:");
    println!("  Execution ID: {}", execution_id);

    let total_duration: std::time::Duration = results.iter().map(|r| r.duration).sum();
    println!("  Areas processed: {}", results.len());
    println!("  Total Execution Time: {:?}", total_duration);
    println!();

    println!("📝 Area Details:");
    for (index, result) in results.iter().enumerate() {
        match (&result.stats, &result.error) {
            (Some(stats), None) => {
                println!(
                    "  {}. ✅ {} - {} nodes, {} flows in {:?}",
                    index + 1,
                    result.area,
                    stats.clusters,
                    stats.flows,
                    result.duration
                );
                if let Some(path) = &result.output_path {
                    println!("     Output: {}", path);
                }
            }
            (_, Some(error)) => {
                println!("  {}. ❌ {} - {}", index + 1, result.area, error);
            }
            (None, None) => {}
        }
    }
    println!();
}
