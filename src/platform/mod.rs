mod api;
mod client;
pub mod resources;

pub use api::{CustomApi, PodApi, PodExecApi, PodLogApi};
pub use client::PlatformClient;

/// Parameters to push down to the Kubernetes API
#[derive(Debug, Clone, Default)]
pub struct ApiFilters {
    /// Label selector string (e.g., "serving.svctl.dev/service=hello")
    pub label_selector: Option<String>,
    /// Field selector string (e.g., "metadata.name=hello-00002")
    pub field_selector: Option<String>,
}

impl ApiFilters {
    pub fn labels(selector: impl Into<String>) -> Self {
        Self {
            label_selector: Some(selector.into()),
            field_selector: None,
        }
    }

    pub fn fields(selector: impl Into<String>) -> Self {
        Self {
            label_selector: None,
            field_selector: Some(selector.into()),
        }
    }

    /// Field selector matching a single object by name.
    pub fn by_name(name: &str) -> Self {
        Self::fields(format!("metadata.name={name}"))
    }
}
