//! Sequencing providers into a full crypto response.

use tracing::{debug, info, info_span, Instrument, Span};

use nodeprep_core::{Category, CryptoBundle, CryptoBundleSet};

use crate::error::CryptoError;
use crate::provider::CryptoProvider;

/// Run ping -> validate -> fetch against one provider.
///
/// Ping and validate failures are tagged with their stage; fetch errors are
/// returned as-is.
pub async fn get_crypto(provider: &dyn CryptoProvider) -> Result<CryptoBundle, CryptoError> {
    provider.ping().await.map_err(CryptoError::Unreachable)?;
    provider.validate().map_err(CryptoError::Invalid)?;
    provider.fetch().await.map_err(CryptoError::Fetch)
}

/// Collects the enrollment, TLS and client-auth bundles of a node.
pub struct CryptoOrchestrator {
    enrollment: Option<Box<dyn CryptoProvider>>,
    tls: Option<Box<dyn CryptoProvider>>,
    client_auth: Option<Box<dyn CryptoProvider>>,
    span: Span,
}

impl Default for CryptoOrchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoOrchestrator {
    /// Create an orchestrator with no providers.
    pub fn new() -> Self {
        Self {
            enrollment: None,
            tls: None,
            client_auth: None,
            span: info_span!("crypto"),
        }
    }

    /// Builder method to set the provider of a category.
    pub fn with_provider(
        mut self,
        category: Category,
        provider: impl CryptoProvider + 'static,
    ) -> Self {
        let provider: Box<dyn CryptoProvider> = Box::new(provider);
        match category {
            Category::Enrollment => self.enrollment = Some(provider),
            Category::Tls => self.tls = Some(provider),
            Category::ClientAuth => self.client_auth = Some(provider),
        }
        self
    }

    /// Builder method to set the logging context.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    fn provider(&self, category: Category) -> Option<&dyn CryptoProvider> {
        match category {
            Category::Enrollment => self.enrollment.as_deref(),
            Category::Tls => self.tls.as_deref(),
            Category::ClientAuth => self.client_auth.as_deref(),
        }
    }

    /// Fetch every configured bundle in category order.
    ///
    /// Unset providers are skipped. The first failing bundle aborts the
    /// whole response.
    pub async fn generate_crypto_response(&self) -> Result<CryptoBundleSet, CryptoError> {
        async {
            let mut response = CryptoBundleSet::new();
            for category in Category::ALL {
                let Some(provider) = self.provider(category) else {
                    debug!(category = %category, "No provider configured, skipping");
                    continue;
                };

                let bundle = get_crypto(provider)
                    .await
                    .map_err(|e| CryptoError::Bundle {
                        category,
                        source: Box::new(e),
                    })?;
                info!(category = %category, "Crypto bundle obtained");
                response.set(category, Some(bundle));
            }
            Ok(response)
        }
        .instrument(self.span.clone())
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Copy)]
    enum Fail {
        None,
        Ping,
        Validate,
        Fetch,
    }

    struct FakeProvider {
        fail: Fail,
        cert: &'static [u8],
        calls: Arc<AtomicUsize>,
    }

    impl FakeProvider {
        fn new(cert: &'static [u8], fail: Fail, calls: Arc<AtomicUsize>) -> Self {
            Self { fail, cert, calls }
        }
    }

    #[async_trait]
    impl CryptoProvider for FakeProvider {
        async fn ping(&self) -> Result<(), ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail {
                Fail::Ping => Err(ProviderError::Request {
                    url: "https://ca:7054/cainfo".to_string(),
                    message: "connection refused".to_string(),
                }),
                _ => Ok(()),
            }
        }

        fn validate(&self) -> Result<(), ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail {
                Fail::Validate => Err(ProviderError::MissingField("enroll id")),
                _ => Ok(()),
            }
        }

        async fn fetch(&self) -> Result<CryptoBundle, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail {
                Fail::Fetch => Err(ProviderError::Enroll("boom".to_string())),
                _ => Ok(CryptoBundle::default().with_sign_cert(self.cert.to_vec())),
            }
        }
    }

    #[tokio::test]
    async fn test_all_providers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = CryptoOrchestrator::new()
            .with_provider(Category::Enrollment, FakeProvider::new(b"ecert", Fail::None, calls.clone()))
            .with_provider(Category::Tls, FakeProvider::new(b"tls", Fail::None, calls.clone()))
            .with_provider(Category::ClientAuth, FakeProvider::new(b"ca", Fail::None, calls.clone()));

        let response = orchestrator.generate_crypto_response().await.unwrap();
        assert_eq!(response.enrollment.unwrap().sign_cert, b"ecert".to_vec());
        assert_eq!(response.tls.unwrap().sign_cert, b"tls".to_vec());
        assert_eq!(response.client_auth.unwrap().sign_cert, b"ca".to_vec());
        assert_eq!(calls.load(Ordering::SeqCst), 9);
    }

    #[tokio::test]
    async fn test_unset_providers_are_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = CryptoOrchestrator::new()
            .with_provider(Category::Tls, FakeProvider::new(b"tls", Fail::None, calls.clone()));

        let response = orchestrator.generate_crypto_response().await.unwrap();
        assert!(response.enrollment.is_none());
        assert!(response.tls.is_some());
        assert!(response.client_auth.is_none());
    }

    #[tokio::test]
    async fn test_ping_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let orchestrator = CryptoOrchestrator::new().with_provider(
            Category::Enrollment,
            FakeProvider::new(b"ecert", Fail::Ping, calls.clone()),
        );

        let err = orchestrator.generate_crypto_response().await.unwrap_err();
        assert_eq!(err.category(), Some(Category::Enrollment));
        assert!(err
            .to_string()
            .starts_with("could not enrollment get crypto: ca is not reachable"));
        // validate and fetch never ran
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validate_failure() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FakeProvider::new(b"tls", Fail::Validate, calls.clone());

        let err = get_crypto(&provider).await.unwrap_err();
        assert!(matches!(err, CryptoError::Invalid(_)));
        assert_eq!(err.to_string(), "invalid crypto: enroll id not specified");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_untagged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = FakeProvider::new(b"tls", Fail::Fetch, calls);

        let err = get_crypto(&provider).await.unwrap_err();
        assert_eq!(err.to_string(), "enrollment failed: boom");
    }

    #[tokio::test]
    async fn test_first_failure_short_circuits() {
        let calls = Arc::new(AtomicUsize::new(0));
        let later = Arc::new(AtomicUsize::new(0));
        let orchestrator = CryptoOrchestrator::new()
            .with_provider(Category::Enrollment, FakeProvider::new(b"ecert", Fail::None, calls.clone()))
            .with_provider(Category::Tls, FakeProvider::new(b"tls", Fail::Fetch, calls.clone()))
            .with_provider(Category::ClientAuth, FakeProvider::new(b"ca", Fail::None, later.clone()));

        let err = orchestrator.generate_crypto_response().await.unwrap_err();
        assert_eq!(err.category(), Some(Category::Tls));
        assert_eq!(err.to_string(), "could not tls get crypto: enrollment failed: boom");
        assert_eq!(later.load(Ordering::SeqCst), 0);
    }
}
