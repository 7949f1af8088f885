pub mod health;
pub mod probe;

pub use health::{respond, HealthCheckResponse};
pub use probe::{ConnectivityReport, ProbeEngine, ServiceAdapter, ServiceDescriptor};
