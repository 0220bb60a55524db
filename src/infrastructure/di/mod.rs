//! Dependency injection: wiring real implementations into services

mod service_container;

pub use service_container::ServiceContainer;
