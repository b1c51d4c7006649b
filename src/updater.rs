//! Mutable trace state container with undo/redo and change notification.
//!
//! [`TraceUpdater`] owns a [`Trace`] and funnels every mutation through
//! [`TraceUpdater::update`]: attributes whose incoming value differs from
//! the current one are replaced whole, the prior values are recorded as an
//! undo patch, and subscribers are notified synchronously with a patch
//! carrying only the attributes that actually changed. The undo history is
//! linear: recording a new mutation after an undo discards the redo tail.
//!
//! Exactly one updater must own a given trace. External code must not
//! mutate the trace's arrays directly, since that would bypass both the
//! undo history and the spatial-index invalidation performed here.

use crate::error::{Result, TraceError};
use crate::proximum::Proximum;
use crate::trace::{ChildRef, Marker, Trace, TracePatch};

/// A recorded mutation: the patch that reverts it and the patch that
/// re-applies it. Arrays are stored whole, never diffed.
#[derive(Debug, Clone)]
struct UndoRecord {
    undo: TracePatch,
    redo: TracePatch,
}

/// Handle returned by [`TraceUpdater::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&TracePatch)>;

/// Owns a trace and applies validated, undoable, observable mutations.
pub struct TraceUpdater {
    trace: Trace,
    undo_stack: Vec<UndoRecord>,
    redo_stack: Vec<UndoRecord>,
    listeners: Vec<(u64, Listener)>,
    next_listener_id: u64,
    /// Lazily rebuilt after any lat/lng change
    index: Option<Proximum>,
    current_marker: Option<u32>,
}

impl TraceUpdater {
    /// Take ownership of a trace.
    pub fn new(trace: Trace) -> Self {
        Self {
            trace,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            listeners: Vec::new(),
            next_listener_id: 0,
            index: None,
            current_marker: None,
        }
    }

    /// The current trace state.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Consume the updater and return the trace.
    pub fn into_trace(self) -> Trace {
        self.trace
    }

    // ========================================================================
    // Update / undo / redo
    // ========================================================================

    /// Apply a sparse patch to the trace.
    ///
    /// Every attribute present in `patch` whose value differs from the
    /// current one is replaced. When anything changed, an undo record is
    /// pushed (if `record_undo`), the redo tail is discarded, and
    /// subscribers are notified with a patch containing exactly the
    /// attributes that changed. Returns whether anything changed; an
    /// unchanged patch is a complete no-op.
    pub fn update(&mut self, patch: TracePatch, record_undo: bool) -> bool {
        let mut undo = TracePatch::default();
        let mut redo = TracePatch::default();

        let trace = &mut self.trace;
        let mut changed = false;
        changed |= apply_field(&mut trace.lat, patch.lat, &mut undo.lat, &mut redo.lat);
        changed |= apply_field(&mut trace.lng, patch.lng, &mut undo.lng, &mut redo.lng);
        changed |= apply_field(&mut trace.alt, patch.alt, &mut undo.alt, &mut redo.alt);
        changed |= apply_field(&mut trace.dis, patch.dis, &mut undo.dis, &mut redo.dis);
        changed |= apply_field(&mut trace.tim, patch.tim, &mut undo.tim, &mut redo.tim);
        changed |= apply_field(&mut trace.acc, patch.acc, &mut undo.acc, &mut redo.acc);
        changed |= apply_field(&mut trace.hrt, patch.hrt, &mut undo.hrt, &mut redo.hrt);
        changed |= apply_field(
            &mut trace.markers,
            patch.markers,
            &mut undo.markers,
            &mut redo.markers,
        );
        changed |= apply_field(
            &mut trace.children,
            patch.children,
            &mut undo.children,
            &mut redo.children,
        );
        changed |= apply_field(
            &mut trace.icon_urls,
            patch.icon_urls,
            &mut undo.icon_urls,
            &mut redo.icon_urls,
        );
        changed |= apply_field(
            &mut trace.distance,
            patch.distance,
            &mut undo.distance,
            &mut redo.distance,
        );
        changed |= apply_field(
            &mut trace.ascent,
            patch.ascent,
            &mut undo.ascent,
            &mut redo.ascent,
        );
        changed |= apply_field(
            &mut trace.descent,
            patch.descent,
            &mut undo.descent,
            &mut redo.descent,
        );
        changed |= apply_field(
            &mut trace.show_profile,
            patch.show_profile,
            &mut undo.show_profile,
            &mut redo.show_profile,
        );

        if !changed {
            return false;
        }

        if redo.touches_coordinates() {
            self.index = None;
        }

        if record_undo {
            self.undo_stack.push(UndoRecord {
                undo,
                redo: redo.clone(),
            });
            self.redo_stack.clear();
        }

        self.notify(&redo);
        true
    }

    /// Revert the most recent recorded mutation. Returns whether one was
    /// available.
    pub fn undo(&mut self) -> bool {
        let Some(record) = self.undo_stack.pop() else {
            return false;
        };
        self.update(record.undo.clone(), false);
        self.redo_stack.push(record);
        true
    }

    /// Re-apply the most recently undone mutation. Returns whether one was
    /// available.
    pub fn redo(&mut self) -> bool {
        let Some(record) = self.redo_stack.pop() else {
            return false;
        };
        self.update(record.redo.clone(), false);
        self.undo_stack.push(record);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    // ========================================================================
    // Markers
    // ========================================================================

    /// Add a marker, assigning it the next free id (`max existing + 1`)
    /// and snapping its `index` to the trace. Returns the assigned id.
    pub fn add_marker(&mut self, mut marker: Marker) -> u32 {
        let id = self
            .trace
            .markers
            .iter()
            .map(|m| m.id)
            .max()
            .unwrap_or(0)
            + 1;
        marker.id = id;
        marker.index = self.snap_index(marker.lat, marker.lng);

        let mut markers = self.trace.markers.clone();
        markers.push(marker);
        self.update(
            TracePatch {
                markers: Some(markers),
                ..Default::default()
            },
            true,
        );
        id
    }

    /// Replace a marker by id, re-snapping its `index`.
    pub fn update_marker(&mut self, mut marker: Marker) -> Result<()> {
        let pos = self
            .trace
            .markers
            .iter()
            .position(|m| m.id == marker.id)
            .ok_or(TraceError::MarkerNotFound { id: marker.id })?;

        marker.index = self.snap_index(marker.lat, marker.lng);
        let mut markers = self.trace.markers.clone();
        markers[pos] = marker;
        self.update(
            TracePatch {
                markers: Some(markers),
                ..Default::default()
            },
            true,
        );
        Ok(())
    }

    /// Remove a marker by id. A missing id is a no-op. Clears the current
    /// marker when it is the one removed.
    pub fn remove_marker(&mut self, id: u32) {
        if !self.has_marker(id) {
            return;
        }
        if self.current_marker == Some(id) {
            self.current_marker = None;
        }
        let markers: Vec<Marker> = self
            .trace
            .markers
            .iter()
            .filter(|m| m.id != id)
            .cloned()
            .collect();
        self.update(
            TracePatch {
                markers: Some(markers),
                ..Default::default()
            },
            true,
        );
    }

    /// Marker by id; callers wanting a non-erroring lookup use
    /// [`TraceUpdater::has_marker`] first.
    pub fn marker(&self, id: u32) -> Result<&Marker> {
        self.trace
            .markers
            .iter()
            .find(|m| m.id == id)
            .ok_or(TraceError::MarkerNotFound { id })
    }

    pub fn has_marker(&self, id: u32) -> bool {
        self.trace.markers.iter().any(|m| m.id == id)
    }

    pub fn current_marker(&self) -> Option<u32> {
        self.current_marker
    }

    pub fn set_current_marker(&mut self, id: Option<u32>) {
        self.current_marker = id;
    }

    // ========================================================================
    // Children
    // ========================================================================

    /// Add a child trace reference, assigning the next free id.
    pub fn add_child(&mut self, mut child: ChildRef) -> u32 {
        let id = self
            .trace
            .children
            .iter()
            .map(|c| c.id)
            .max()
            .unwrap_or(0)
            + 1;
        child.id = id;
        let mut children = self.trace.children.clone();
        children.push(child);
        self.update(
            TracePatch {
                children: Some(children),
                ..Default::default()
            },
            true,
        );
        id
    }

    /// Replace a child reference by id.
    pub fn update_child(&mut self, child: ChildRef) -> Result<()> {
        let pos = self
            .trace
            .children
            .iter()
            .position(|c| c.id == child.id)
            .ok_or(TraceError::ChildNotFound { id: child.id })?;
        let mut children = self.trace.children.clone();
        children[pos] = child;
        self.update(
            TracePatch {
                children: Some(children),
                ..Default::default()
            },
            true,
        );
        Ok(())
    }

    /// Remove a child reference by id. A missing id is a no-op.
    pub fn remove_child(&mut self, id: u32) {
        if !self.trace.children.iter().any(|c| c.id == id) {
            return;
        }
        let children: Vec<ChildRef> = self
            .trace
            .children
            .iter()
            .filter(|c| c.id != id)
            .cloned()
            .collect();
        self.update(
            TracePatch {
                children: Some(children),
                ..Default::default()
            },
            true,
        );
    }

    // ========================================================================
    // Spatial index and observers
    // ========================================================================

    /// The spatial index for the current coordinates, rebuilt lazily after
    /// any `lat`/`lng` change.
    pub fn proximum(&mut self) -> &Proximum {
        let trace = &self.trace;
        self.index
            .get_or_insert_with(|| Proximum::new(&trace.lat, &trace.lng))
    }

    fn snap_index(&mut self, lat: f64, lng: f64) -> Option<usize> {
        self.proximum().nearest_point_index(lat, lng)
    }

    /// Register a change listener, fired synchronously after each applied
    /// mutation with the patch of attributes that changed.
    pub fn subscribe(&mut self, listener: impl FnMut(&TracePatch) + 'static) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.push((id, Box::new(listener)));
        ListenerId(id)
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id.0);
        self.listeners.len() != before
    }

    /// Every listener runs on every event; no listener can suppress the
    /// others.
    fn notify(&mut self, patch: &TracePatch) {
        let mut listeners = std::mem::take(&mut self.listeners);
        for (_, listener) in listeners.iter_mut() {
            listener(patch);
        }
        // Listeners registered during dispatch land after the existing ones
        let mut registered_during_dispatch = std::mem::replace(&mut self.listeners, listeners);
        self.listeners.append(&mut registered_during_dispatch);
    }
}

/// Replace `current` with the incoming value when present and different,
/// recording old and new values into the undo/redo slots.
fn apply_field<T: Clone + PartialEq>(
    current: &mut T,
    incoming: Option<T>,
    undo: &mut Option<T>,
    redo: &mut Option<T>,
) -> bool {
    match incoming {
        Some(value) if value != *current => {
            *undo = Some(std::mem::replace(current, value.clone()));
            *redo = Some(value);
            true
        }
        _ => false,
    }
}
