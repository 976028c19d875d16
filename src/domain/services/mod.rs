// Demand-modeling services, in pipeline order.

pub mod geo;
pub mod spatial_index;

pub mod ingest;
pub mod employment;
pub mod aggregate;
pub mod merge;
pub mod flows;
pub mod serialize;

pub use aggregate::BlockAggregator;
pub use employment::{
    CapacityHeuristicStrategy, EmploymentEstimator, ExactDataStrategy, UniformHeuristicStrategy,
};
pub use flows::{FlowSynthesizer, IdSequence};
pub use ingest::BlockIngestor;
pub use merge::LowPopulationMerger;
pub use serialize::DemandDocument;
