//! Low-level point editor: splice-based mutation of the coordinate arrays
//! with an undo stack.
//!
//! Sits below [`crate::updater::TraceUpdater`]: where the updater replaces
//! whole attributes, this editor performs targeted splices on the `lat`/
//! `lng` arrays for interactive point dragging and drawing. Each edit is
//! applied in place and the spliced-out values become the inverse action
//! on the undo stack; subscribers receive a fresh copy of both arrays
//! after every edit, which costs O(N) per edit and bounds this editor's
//! comfort zone to traces of a few tens of thousands of points.

/// An in-place splice of the coordinate arrays: at `start`, remove
/// `delete_count` points and insert the given ones. Out-of-range values
/// clamp to the array bounds rather than erroring.
#[derive(Debug, Clone, PartialEq)]
pub struct Splice {
    pub start: usize,
    pub delete_count: usize,
    pub lat: Vec<f64>,
    pub lng: Vec<f64>,
}

/// Copy-on-write snapshot published to subscribers after each edit.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSnapshot {
    pub lat: Vec<f64>,
    pub lng: Vec<f64>,
}

type Subscriber = Box<dyn FnMut(&PointSnapshot)>;

/// Splice-based editor over a pair of parallel coordinate arrays.
pub struct PointEditor {
    lat: Vec<f64>,
    lng: Vec<f64>,
    undo_stack: Vec<Splice>,
    subscribers: Vec<Subscriber>,
}

impl PointEditor {
    pub fn new(lat: Vec<f64>, lng: Vec<f64>) -> Self {
        Self {
            lat,
            lng,
            undo_stack: Vec::new(),
            subscribers: Vec::new(),
        }
    }

    pub fn lat(&self) -> &[f64] {
        &self.lat
    }

    pub fn lng(&self) -> &[f64] {
        &self.lng
    }

    pub fn len(&self) -> usize {
        self.lat.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lat.is_empty()
    }

    /// Apply a splice, push its inverse onto the undo stack, and publish
    /// the new state.
    pub fn exec(&mut self, splice: Splice) {
        let inverse = self.apply(splice);
        self.undo_stack.push(inverse);
        self.publish();
    }

    /// Revert the most recent edit. Returns whether one was available.
    pub fn undo(&mut self) -> bool {
        let Some(inverse) = self.undo_stack.pop() else {
            return false;
        };
        self.apply(inverse);
        self.publish();
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Splice both arrays and return the inverse action: the removed
    /// values, re-inserted at the same start over the inserted span.
    fn apply(&mut self, splice: Splice) -> Splice {
        debug_assert_eq!(
            splice.lat.len(),
            splice.lng.len(),
            "splice payloads must stay parallel"
        );
        let start = splice.start.min(self.lat.len());
        let end = (start + splice.delete_count).min(self.lat.len());
        let inserted = splice.lat.len();

        let removed_lat: Vec<f64> = self.lat.splice(start..end, splice.lat).collect();
        let removed_lng: Vec<f64> = self.lng.splice(start..end, splice.lng).collect();

        Splice {
            start,
            delete_count: inserted,
            lat: removed_lat,
            lng: removed_lng,
        }
    }

    fn publish(&mut self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = PointSnapshot {
            lat: self.lat.clone(),
            lng: self.lng.clone(),
        };
        let mut subscribers = std::mem::take(&mut self.subscribers);
        for subscriber in subscribers.iter_mut() {
            subscriber(&snapshot);
        }
        let mut added = std::mem::replace(&mut self.subscribers, subscribers);
        self.subscribers.append(&mut added);
    }

    /// Receive a snapshot of both arrays after every edit and undo.
    pub fn subscribe(&mut self, subscriber: impl FnMut(&PointSnapshot) + 'static) {
        self.subscribers.push(Box::new(subscriber));
    }

    // ========================================================================
    // Convenience edits
    // ========================================================================

    /// Append a point at the end.
    pub fn append(&mut self, lat: f64, lng: f64) {
        self.exec(Splice {
            start: self.lat.len(),
            delete_count: 0,
            lat: vec![lat],
            lng: vec![lng],
        });
    }

    /// Insert a point directly after `index`.
    pub fn insert_after(&mut self, index: usize, lat: f64, lng: f64) {
        self.exec(Splice {
            start: index + 1,
            delete_count: 0,
            lat: vec![lat],
            lng: vec![lng],
        });
    }

    /// Move the point at `index` to new coordinates.
    pub fn move_point(&mut self, index: usize, lat: f64, lng: f64) {
        self.exec(Splice {
            start: index,
            delete_count: 1,
            lat: vec![lat],
            lng: vec![lng],
        });
    }

    /// Reverse the direction of the whole trace.
    pub fn invert(&mut self) {
        let mut lat = self.lat.clone();
        let mut lng = self.lng.clone();
        lat.reverse();
        lng.reverse();
        self.replace(lat, lng);
    }

    /// Replace the whole trace.
    pub fn replace(&mut self, lat: Vec<f64>, lng: Vec<f64>) {
        self.exec(Splice {
            start: 0,
            delete_count: self.lat.len(),
            lat,
            lng,
        });
    }
}
