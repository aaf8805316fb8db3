pub mod adapter;
pub mod registry;

pub use registry::{resolve, ProviderConfig, ProviderId, ProviderTable};
