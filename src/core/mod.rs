pub mod demand;
pub mod etl;

pub use crate::domain::model::{AreaInputs, Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
