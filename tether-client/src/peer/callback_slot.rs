use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Holds at most one callback; registering again replaces the previous one.
pub(crate) struct CallbackSlot<F: ?Sized> {
    inner: Mutex<Option<Arc<F>>>,
}

impl<F: ?Sized> Default for CallbackSlot<F> {
    fn default() -> Self {
        Self {
            inner: Mutex::new(None),
        }
    }
}

impl<F: ?Sized> CallbackSlot<F> {
    fn lock(&self) -> MutexGuard<'_, Option<Arc<F>>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, callback: Arc<F>) {
        *self.lock() = Some(callback);
    }

    pub(crate) fn get(&self) -> Option<Arc<F>> {
        self.lock().clone()
    }

    pub(crate) fn clear(&self) {
        self.lock().take();
    }
}
