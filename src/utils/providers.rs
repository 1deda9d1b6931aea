//! Execution provider parsing and availability reporting

use crate::{
    config::ExecutionProvider,
    error::{FilterError, Result},
    inference::BackendType,
};

/// Information about an execution provider
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub backend_type: BackendType,
    pub execution_provider: ExecutionProvider,
    pub available: bool,
    pub description: String,
}

/// Utility for parsing and managing execution providers
pub struct ExecutionProviderManager;

impl ExecutionProviderManager {
    /// Parse an ordered, comma-separated candidate list such as `"cuda,coreml,cpu"`
    ///
    /// Duplicates keep their first position.
    ///
    /// # Examples
    /// ```rust
    /// use bgremove_filter::config::ExecutionProvider;
    /// use bgremove_filter::utils::ExecutionProviderManager;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let providers = ExecutionProviderManager::parse_provider_list("cuda, cpu")?;
    /// assert_eq!(providers, vec![ExecutionProvider::Cuda, ExecutionProvider::Cpu]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn parse_provider_list(list: &str) -> Result<Vec<ExecutionProvider>> {
        let mut providers = Vec::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let provider: ExecutionProvider = name.parse()?;
            if !providers.contains(&provider) {
                providers.push(provider);
            }
        }

        if providers.is_empty() {
            return Err(FilterError::config_validation(
                "Execution provider list is empty. Use e.g. cuda,coreml,cpu",
            ));
        }
        Ok(providers)
    }

    /// Every backend/provider combination with its availability on this machine
    pub fn list_all_providers() -> Vec<ProviderInfo> {
        let mut providers = Vec::new();

        #[cfg(feature = "onnx")]
        {
            use crate::backends::OnnxBackend;
            for (provider, available, description) in OnnxBackend::list_providers() {
                providers.push(ProviderInfo {
                    name: Self::provider_to_string(BackendType::Onnx, provider),
                    backend_type: BackendType::Onnx,
                    execution_provider: provider,
                    available,
                    description,
                });
            }
        }

        #[cfg(not(feature = "onnx"))]
        for provider in ExecutionProvider::default_candidates() {
            providers.push(ProviderInfo {
                name: Self::provider_to_string(BackendType::Onnx, provider),
                backend_type: BackendType::Onnx,
                execution_provider: provider,
                available: false,
                description: "ONNX Runtime (feature disabled)".to_string(),
            });
        }

        #[cfg(feature = "tract")]
        {
            use crate::backends::TractBackend;
            for (provider, available, description) in TractBackend::list_providers() {
                providers.push(ProviderInfo {
                    name: Self::provider_to_string(BackendType::Tract, provider),
                    backend_type: BackendType::Tract,
                    execution_provider: provider,
                    available,
                    description,
                });
            }
        }

        #[cfg(not(feature = "tract"))]
        providers.push(ProviderInfo {
            name: Self::provider_to_string(BackendType::Tract, ExecutionProvider::Cpu),
            backend_type: BackendType::Tract,
            execution_provider: ExecutionProvider::Cpu,
            available: false,
            description: "Pure Rust CPU inference via Tract (feature disabled)".to_string(),
        });

        providers
    }

    /// Whether any compiled-in engine can use a hardware accelerator
    pub fn has_accelerator() -> bool {
        Self::list_all_providers()
            .iter()
            .any(|p| p.available && p.execution_provider.is_accelerated())
    }

    /// `backend:provider` label, e.g. `onnx:cuda`
    pub fn provider_to_string(backend_type: BackendType, provider: ExecutionProvider) -> String {
        format!("{}:{}", backend_type, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_provider_list_keeps_order() {
        let providers = ExecutionProviderManager::parse_provider_list("coreml,cuda,cpu").unwrap();
        assert_eq!(
            providers,
            vec![
                ExecutionProvider::CoreMl,
                ExecutionProvider::Cuda,
                ExecutionProvider::Cpu
            ]
        );
    }

    #[test]
    fn test_parse_provider_list_dedups() {
        let providers = ExecutionProviderManager::parse_provider_list("cpu, CPU ,cuda").unwrap();
        assert_eq!(providers, vec![ExecutionProvider::Cpu, ExecutionProvider::Cuda]);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ExecutionProviderManager::parse_provider_list("").is_err());
        assert!(ExecutionProviderManager::parse_provider_list(" , ").is_err());
        assert!(ExecutionProviderManager::parse_provider_list("cuda,tpu").is_err());
    }

    #[test]
    fn test_provider_to_string() {
        assert_eq!(
            ExecutionProviderManager::provider_to_string(BackendType::Onnx, ExecutionProvider::Cuda),
            "onnx:cuda"
        );
        assert_eq!(
            ExecutionProviderManager::provider_to_string(BackendType::Tract, ExecutionProvider::Cpu),
            "tract:cpu"
        );
    }

    #[test]
    fn test_list_all_providers() {
        let providers = ExecutionProviderManager::list_all_providers();
        let names: Vec<&str> = providers.iter().map(|p| p.name.as_str()).collect();
        assert!(names.contains(&"onnx:cpu"));
        assert!(names.contains(&"tract:cpu"));
    }
}
