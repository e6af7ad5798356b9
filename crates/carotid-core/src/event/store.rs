use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use super::{LifecycleEvent, LifecycleEventKind};

/// Almacenamiento de eventos append-only.
pub trait LifecycleEventStore: Send + Sync {
    /// Agrega un evento a partir de su kind y devuelve el evento completo (con seq y ts).
    fn append_kind(&self, artifact_id: Uuid, kind: LifecycleEventKind) -> LifecycleEvent;
    /// Eventos del artifact en orden ascendente de seq.
    fn list(&self, artifact_id: Uuid) -> Vec<LifecycleEvent>;
}

#[derive(Debug, Default)]
pub struct InMemoryLifecycleEventStore {
    inner: DashMap<Uuid, Vec<LifecycleEvent>>,
}

impl LifecycleEventStore for InMemoryLifecycleEventStore {
    fn append_kind(&self, artifact_id: Uuid, kind: LifecycleEventKind) -> LifecycleEvent {
        let mut events = self.inner.entry(artifact_id).or_default();
        let ev = LifecycleEvent { seq: events.len() as u64, artifact_id, kind, ts: Utc::now() };
        events.push(ev.clone());
        ev
    }

    fn list(&self, artifact_id: Uuid) -> Vec<LifecycleEvent> {
        self.inner.get(&artifact_id).map(|e| e.value().clone()).unwrap_or_default()
    }
}
