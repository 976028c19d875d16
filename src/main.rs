use clap::Parser;
use commute_demand::utils::{logger, validation::Validate};
use commute_demand::{CliConfig, DemandPipeline, EtlEngine, LocalStorage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting commute-demand CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    let area = match config.area_config().and_then(|area| area.validate().map(|_| area)) {
        Ok(area) => area,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 輸入路徑以目前目錄為基準
    let storage = LocalStorage::new(".");
    let pipeline = DemandPipeline::new(storage, area).with_flow_id_prefix(config.flow_id_prefix.clone());

    let engine = EtlEngine::new_with_monitoring(pipeline, config.monitor);

    match engine.run().await {
        Ok(outcome) => {
            let stats = &outcome.stats;
            tracing::info!(
                "✅ Demand model completed: {} nodes, {} flows, employment strategy '{}'",
                stats.clusters,
                stats.flows,
                stats.employment_strategy
            );
            println!("✅ Demand model completed successfully!");
            println!(
                "📊 Blocks: {} active of {} ({} dropped), nodes: {}, flows: {}",
                stats.active_blocks, stats.blocks, stats.dropped_records, stats.clusters, stats.flows
            );
            println!("📁 Output saved to: {}", outcome.output_path);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Demand model failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            std::process::exit(e.exit_code());
        }
    }

    Ok(())
}
