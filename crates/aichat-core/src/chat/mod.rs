pub mod frame;
pub mod orchestrator;
pub mod relay;
pub mod repository;
