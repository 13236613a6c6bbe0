//! Caller-owned cache of display payment methods.

use std::sync::{Mutex, PoisonError};

use super::models::PaymentMethods;

/// Holds the last computed [`PaymentMethods`] grouping.
///
/// The cache never expires on its own; call [`invalidate`](Self::invalidate)
/// when the cart amount, currency or account settings change.
#[derive(Debug, Default)]
pub struct PaymentMethodsCache {
    methods: Mutex<Option<PaymentMethods>>,
}

impl PaymentMethodsCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the cached grouping, if any.
    #[must_use]
    pub fn get(&self) -> Option<PaymentMethods> {
        self.methods.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replaces the cached grouping.
    pub fn store(&self, methods: PaymentMethods) {
        *self.methods.lock().unwrap_or_else(PoisonError::into_inner) = Some(methods);
    }

    /// Empties the cache.
    pub fn invalidate(&self) {
        self.methods.lock().unwrap_or_else(PoisonError::into_inner).take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_get_invalidate() {
        let cache = PaymentMethodsCache::new();
        assert!(cache.get().is_none());

        cache.store(PaymentMethods::default());
        assert_eq!(cache.get(), Some(PaymentMethods::default()));

        cache.invalidate();
        assert!(cache.get().is_none());
    }
}
