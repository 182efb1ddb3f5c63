use serde::{Deserialize, Serialize};

/// Categorized gesture notification from the recognizer.
///
/// Long-press begin and end bracket precision mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GestureEvent {
    Tap,
    Drag,
    LongPressBegan,
    LongPressEnded,
}

/// Running gesture tallies for one attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureTally {
    pub taps: u32,
    pub long_presses: u32,
    pub drags: u32,
}

impl GestureTally {
    /// Count one gesture. Only the start of a long-press is tallied.
    pub fn record(&mut self, gesture: GestureEvent) {
        match gesture {
            GestureEvent::Tap => self.taps += 1,
            GestureEvent::Drag => self.drags += 1,
            GestureEvent::LongPressBegan => self.long_presses += 1,
            GestureEvent::LongPressEnded => {}
        }
    }

    pub fn total(&self) -> u32 {
        self.taps + self.long_presses + self.drags
    }
}

/// Opaque magnified-view image. Forwarded for display, never inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Supplies magnifier snapshots while precision mode is on.
pub trait SnapshotProvider: Send + Sync {
    fn capture(&self) -> Option<Snapshot>;
}
