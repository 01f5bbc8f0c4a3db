use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Tracks how many operations run at the same time and the highest value ever reached.
#[derive(Debug, Clone, Default)]
pub struct ConcurrencyGauge {
    inner: Arc<GaugeInner>,
}

#[derive(Debug, Default)]
struct GaugeInner {
    current: AtomicUsize,
    high_water_mark: AtomicUsize,
}

impl ConcurrencyGauge {
    /// Marks an operation as started until the returned guard is dropped.
    pub fn enter(&self) -> GaugeGuard {
        let current = self.inner.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .high_water_mark
            .fetch_max(current, Ordering::SeqCst);

        GaugeGuard {
            inner: self.inner.clone(),
        }
    }

    pub fn high_water_mark(&self) -> usize {
        self.inner.high_water_mark.load(Ordering::SeqCst)
    }
}

pub struct GaugeGuard {
    inner: Arc<GaugeInner>,
}

impl Drop for GaugeGuard {
    fn drop(&mut self) {
        self.inner.current.fetch_sub(1, Ordering::SeqCst);
    }
}
