/// Adapters layer - Infrastructure implementations
///
/// This layer contains concrete implementations of the outbound ports,
/// providing the actual integration with registries, vulnerability
/// databases, cache storage, the file system and the console.
pub mod outbound;
