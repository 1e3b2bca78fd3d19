//! Correlation id generation.

use arc_swap::ArcSwap;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

/// Produces a unique token per call.
pub trait CorrelationIdSource: Send + Sync {
    fn next_id(&self) -> String;
}

/// Random UUID v4 ids.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Source;

impl CorrelationIdSource for UuidV4Source {
    fn next_id(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

struct ActiveSource(Arc<dyn CorrelationIdSource>);

static ACTIVE: LazyLock<ArcSwap<ActiveSource>> =
    LazyLock::new(|| ArcSwap::from_pointee(ActiveSource(Arc::new(UuidV4Source))));

/// Replace the process-wide id source.
pub fn set_correlation_id_source<S: CorrelationIdSource + 'static>(source: S) {
    ACTIVE.store(Arc::new(ActiveSource(Arc::new(source))));
}

/// The process-wide id source.
pub fn current() -> Arc<dyn CorrelationIdSource> {
    ACTIVE.load().0.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_ids_are_unique() {
        let source = UuidV4Source;
        let a = source.next_id();
        let b = source.next_id();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }
}
