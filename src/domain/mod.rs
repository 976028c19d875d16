// Domain layer: data model, model parameters, ports (interfaces) and the demand-modeling services.

pub mod model;
pub mod params;
pub mod ports;

pub mod services;
