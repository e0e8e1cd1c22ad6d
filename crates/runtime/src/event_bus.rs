use foundation::time::Time;

/// Signals the controller publishes to the host surface.
///
/// The host has no reactive view of the grid; every redraw it must perform is
/// announced here.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// Every rendered temperature tile is stale.
    TilesInvalidated { generation: u64 },
    LabelsPlaced { count: usize },
    OverlaysCulled { coastline: usize, borders: usize },
    SelectionChanged { count: usize, summary: String },
    SelectionCleared,
    /// In-progress selection ring in geographic coordinates; empty clears it.
    PreviewUpdated { points: usize },
    DraggingEnabled(bool),
}

impl MapEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            MapEvent::TilesInvalidated { .. } => "tiles_invalidated",
            MapEvent::LabelsPlaced { .. } => "labels_placed",
            MapEvent::OverlaysCulled { .. } => "overlays_culled",
            MapEvent::SelectionChanged { .. } => "selection_changed",
            MapEvent::SelectionCleared => "selection_cleared",
            MapEvent::PreviewUpdated { .. } => "preview_updated",
            MapEvent::DraggingEnabled(_) => "dragging_enabled",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub time: Time,
    pub event: MapEvent,
}

#[derive(Debug, Default)]
pub struct EventBus {
    events: Vec<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, time: Time, event: MapEvent) {
        tracing::trace!(kind = event.kind(), at_ms = time.as_millis(), "event");
        self.events.push(Event { time, event });
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::{EventBus, MapEvent};
    use foundation::time::Time;

    #[test]
    fn records_events_with_time() {
        let mut bus = EventBus::new();
        bus.emit(Time(2.0), MapEvent::TilesInvalidated { generation: 1 });
        assert_eq!(bus.events().len(), 1);
        assert_eq!(bus.events()[0].time, Time(2.0));
        assert_eq!(bus.events()[0].event.kind(), "tiles_invalidated");
    }

    #[test]
    fn drain_clears_events() {
        let mut bus = EventBus::new();
        bus.emit(Time(0.0), MapEvent::SelectionCleared);
        let drained = bus.drain();
        assert_eq!(drained.len(), 1);
        assert!(bus.events().is_empty());
    }
}
