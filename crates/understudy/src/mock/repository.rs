//! MockRepository - creates mocks and verifies them together.
//!
//! Mocks created by a repository can stub call chains: a setup call whose
//! return type was registered as mockable hands back a nested mock already
//! waiting for the next link of the chain.

use super::core::Mock;
use super::types::{Mockable, Target};
use crate::config::MockConfig;
use crate::value::TypeDescriptor;
use crate::verify::{VerificationError, VerificationReport};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::{Arc, Weak};
use tracing::{debug, info};

struct RepositoryInner {
    config: MockConfig,
    /// Top-level mocks, in creation order
    mocks: RwLock<Vec<Mock>>,
    /// Types nested mocks may be created for
    mockable: RwLock<HashSet<TypeDescriptor>>,
    this: Weak<RepositoryInner>,
}

impl RepositoryInner {
    fn factory(&self) -> Weak<dyn Mockable> {
        self.this.clone()
    }

    fn nested_config(&self) -> MockConfig {
        MockConfig {
            name: None,
            ..self.config.clone()
        }
    }
}

impl Mockable for RepositoryInner {
    fn create_mock(&self, ty: &TypeDescriptor) -> Option<Mock> {
        if !self.mockable.read().contains(ty) {
            return None;
        }
        debug!("Creating nested mock for {}", ty);
        Some(Mock::build(
            ty.clone(),
            self.nested_config(),
            None,
            Some(self.factory()),
        ))
    }
}

/// Factory for mocks that share a configuration and are verified together.
#[derive(Clone)]
pub struct MockRepository {
    inner: Arc<RepositoryInner>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::with_config(MockConfig::default())
    }

    /// `config` applies to every mock the repository creates.
    pub fn with_config(config: MockConfig) -> Self {
        Self {
            inner: Arc::new_cyclic(|this| RepositoryInner {
                config,
                mocks: RwLock::new(Vec::new()),
                mockable: RwLock::new(HashSet::new()),
                this: this.clone(),
            }),
        }
    }

    /// Allow nested mocks of `ty` to be handed out by setup calls.
    pub fn register_mockable(&self, ty: TypeDescriptor) {
        self.inner.mockable.write().insert(ty);
    }

    pub fn is_mockable(&self, ty: &TypeDescriptor) -> bool {
        self.inner.mockable.read().contains(ty)
    }

    pub fn mock(&self, ty: TypeDescriptor) -> Mock {
        self.register(Mock::build(
            ty,
            self.inner.config.clone(),
            None,
            Some(self.inner.factory()),
        ))
    }

    /// A mock that can forward calls to `target`.
    pub fn partial_mock(&self, ty: TypeDescriptor, target: impl Target + 'static) -> Mock {
        let target: Arc<dyn Target> = Arc::new(target);
        self.register(Mock::build(
            ty,
            self.inner.config.clone(),
            Some(target),
            Some(self.inner.factory()),
        ))
    }

    fn register(&self, mock: Mock) -> Mock {
        debug!("Created mock {} ({})", mock.name(), mock.id());
        self.inner.mocks.write().push(mock.clone());
        mock
    }

    pub fn mocks(&self) -> Vec<Mock> {
        self.inner.mocks.read().clone()
    }

    pub fn count(&self) -> usize {
        self.inner.mocks.read().len()
    }

    /// Verify every mock the repository created, collecting all violations
    /// into one report.
    pub fn verify_all(&self) -> Result<(), VerificationError> {
        let mut report = VerificationReport::new();
        for mock in self.mocks() {
            report.merge(mock.verification_report());
        }
        info!(
            "Verified {} mocks ({} expectations): {} violations",
            report.mocks_checked,
            report.expectations_checked,
            report.violations.len()
        );
        report.into_result()
    }
}

impl Default for MockRepository {
    fn default() -> Self {
        Self::new()
    }
}
