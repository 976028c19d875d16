use crate::app::pipelines::decode::decode_records;
use crate::core::demand::synthesize_area;
use crate::core::{AreaInputs, ConfigProvider, Pipeline, Record, Storage, TransformResult};
use crate::domain::services::serialize::to_json;
use crate::domain::services::IdSequence;
use crate::utils::error::Result;
use std::path::Path;

/// 單一區域管道：透過 `Storage` 讀取輸入、建立需求模型並寫出文件
pub struct DemandPipeline<S: Storage, C: ConfigProvider> {
    pub(crate) storage: S,
    pub(crate) config: C,
    flow_id_prefix: String,
}

impl<S: Storage, C: ConfigProvider> DemandPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self {
            storage,
            config,
            flow_id_prefix: String::new(),
        }
    }

    pub fn with_flow_id_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.flow_id_prefix = prefix.into();
        self
    }

    pub fn output_location(&self) -> String {
        Path::new(self.config.output_path())
            .join(self.config.output_file())
            .to_string_lossy()
            .into_owned()
    }

    async fn read_records(&self, path: &str) -> Result<Vec<Record>> {
        tracing::debug!("Reading records from: {}", path);
        let bytes = self.storage.read_file(path).await?;
        let records = decode_records(path, &bytes)?;
        tracing::debug!("Read {} records from {}", records.len(), path);
        Ok(records)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for DemandPipeline<S, C> {
    async fn extract(&self) -> Result<AreaInputs> {
        let block_records = self.read_records(self.config.blocks_path()).await?;

        let employment_records = match self.config.employment_path() {
            Some(path) => Some(self.read_records(path).await?),
            None => None,
        };
        let building_records = match self.config.buildings_path() {
            Some(path) => Some(self.read_records(path).await?),
            None => None,
        };

        Ok(AreaInputs {
            area: self.config.area_name().to_string(),
            block_records,
            employment_records,
            building_records,
        })
    }

    async fn transform(&self, data: AreaInputs) -> Result<TransformResult> {
        // 每個區域使用自己的 ID 序列
        let mut ids = IdSequence::new(self.flow_id_prefix.clone(), 1);
        let output = synthesize_area(
            &data,
            self.config.model_params(),
            self.config.field_mapping(),
            &mut ids,
        )?;
        let document = to_json(&output.model, self.config.pretty_output())?;

        Ok(TransformResult {
            area: data.area,
            model: output.model,
            document,
            stats: output.stats,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        let location = self.output_location();
        tracing::debug!(
            "Writing demand document for '{}' ({} bytes)",
            result.area,
            result.document.len()
        );
        self.storage
            .write_file(&location, result.document.as_bytes())
            .await?;
        Ok(location)
    }

    fn name(&self) -> &str {
        self.config.area_name()
    }
}
