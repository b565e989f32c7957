use crate::wallet::adapters::Subscription;

/// The listener registrations owned by one connected session.
///
/// Torn down as a unit when the session ends. Teardown is idempotent and
/// also runs on drop, so a set can never outlive its session with live
/// listeners.
#[derive(Debug, Default)]
pub struct SubscriptionSet {
	subscriptions: Vec<Subscription>,
}

impl SubscriptionSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, subscription: Subscription) {
		self.subscriptions.push(subscription);
	}

	/// Number of registrations still attached.
	pub fn active(&self) -> usize {
		self.subscriptions.iter().filter(|s| s.is_active()).count()
	}

	pub fn len(&self) -> usize {
		self.subscriptions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.subscriptions.is_empty()
	}

	/// Remove every listener. Returns how many were removed by this call.
	pub fn teardown(&mut self) -> usize {
		self.subscriptions
			.drain(..)
			.filter(|subscription| subscription.unsubscribe())
			.count()
	}
}

impl Drop for SubscriptionSet {
	fn drop(&mut self) {
		self.teardown();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::sync::atomic::{AtomicUsize, Ordering};

	fn counting(counter: &Arc<AtomicUsize>) -> Subscription {
		let counter = counter.clone();
		Subscription::new(move || {
			counter.fetch_add(1, Ordering::SeqCst);
		})
	}

	#[test]
	fn teardown_unsubscribes_each_once() {
		let removed = Arc::new(AtomicUsize::new(0));
		let mut set = SubscriptionSet::new();
		set.push(counting(&removed));
		set.push(counting(&removed));
		set.push(Subscription::noop());
		assert_eq!(set.active(), 2);

		assert_eq!(set.teardown(), 2);
		assert_eq!(set.teardown(), 0);
		assert!(set.is_empty());
		assert_eq!(removed.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn drop_tears_down() {
		let removed = Arc::new(AtomicUsize::new(0));
		{
			let mut set = SubscriptionSet::new();
			set.push(counting(&removed));
		}
		assert_eq!(removed.load(Ordering::SeqCst), 1);
	}
}
