/// Application layer - Use cases, orchestration and DTOs
///
/// This layer contains the application logic that coordinates domain
/// services with infrastructure through ports.
pub mod dto;
pub mod orchestrator;
pub mod services;
pub mod use_cases;
