use super::injected::{ProviderEnvironment, resolve};
use super::types::{ProviderAvailability, ProviderKind};

use std::sync::Arc;
use tracing::debug;

/// Reports which wallet extensions are installed in the current page.
///
/// Every call inspects the environment afresh; nothing is cached.
#[derive(Clone)]
pub struct ProviderDetector {
	environment: Arc<dyn ProviderEnvironment>,
}

impl ProviderDetector {
	pub fn new(environment: Arc<dyn ProviderEnvironment>) -> Self {
		Self { environment }
	}

	/// Whether the genuine extension for `kind` is present.
	///
	/// An object under the right namespace that lacks the provider's marker
	/// flag (another extension squatting on the global) counts as absent.
	pub fn is_installed(&self, kind: ProviderKind) -> bool {
		let installed = resolve(self.environment.as_ref(), kind).is_some();
		debug!("Provider {} installed: {}", kind, installed);
		installed
	}

	/// Install status for every provider.
	pub fn availability(&self) -> Vec<ProviderAvailability> {
		ProviderKind::ALL
			.iter()
			.map(|&kind| ProviderAvailability {
				kind,
				installed: self.is_installed(kind),
			})
			.collect()
	}
}
