use crate::domain::model::{AreaInputs, Block, TransformResult};
use crate::domain::params::ModelParams;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 區域的輸入來源、輸出位置與模型參數
pub trait ConfigProvider: Send + Sync {
    fn area_name(&self) -> &str;
    fn blocks_path(&self) -> &str;
    fn employment_path(&self) -> Option<&str>;
    fn buildings_path(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    fn output_file(&self) -> &str;
    fn field_mapping(&self) -> Option<&HashMap<String, String>>;
    fn model_params(&self) -> &ModelParams;

    fn pretty_output(&self) -> bool {
        false
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<AreaInputs>;
    async fn transform(&self, data: AreaInputs) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<String>;

    /// 用於標識區域名稱
    fn name(&self) -> &str;
}

/// 為每個街區指定工作數的策略
///
/// 缺少所需資料時回傳
/// [`DemandError::DataUnavailable`](crate::utils::error::DemandError::DataUnavailable)，
/// 由估算器改用下一個策略。
pub trait EmploymentStrategy {
    fn name(&self) -> &'static str;
    fn assign_jobs(&self, blocks: &mut [Block], params: &ModelParams) -> Result<()>;
}
