pub mod area_sequence;
pub mod decode;
pub mod demand_pipeline;

pub use area_sequence::{AreaResult, AreaSequence, FailurePolicy};
pub use demand_pipeline::DemandPipeline;
