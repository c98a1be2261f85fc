//! Dirty-state tracking shared by every stateful component.
//!
//! Each component family declares its own `bitflags` types for consistency
//! states and for the signals it raises, then embeds an [`Invalidatable`]
//! parameterized over them. Stages of a draw or run cycle check their own bit,
//! recompute, mark themselves consistent and may cascade-invalidate the next
//! stage.

use std::fmt;
use std::ops::{Deref, DerefMut};

use bitflags::Flags;
use tracing::trace;

/// Handle returned by [`Invalidatable::listen`], used to remove a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

type Listener<G> = Box<dyn FnMut(G)>;

/// Dirty bitmask plus synchronous signal dispatch with nested batching.
pub struct Invalidatable<S: Flags + Copy, G: Flags + Copy> {
    supported_states: S,
    supported_signals: G,
    dirty: S,
    suspend_depth: u32,
    pending_signals: G,
    has_pending: bool,
    listeners: Vec<(ListenerId, Listener<G>)>,
    next_listener_id: u64,
}

impl<S, G> fmt::Debug for Invalidatable<S, G>
where
    S: Flags + Copy + fmt::Debug,
    G: Flags + Copy + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invalidatable")
            .field("supported_states", &self.supported_states)
            .field("supported_signals", &self.supported_signals)
            .field("dirty", &self.dirty)
            .field("suspend_depth", &self.suspend_depth)
            .field("pending_signals", &self.pending_signals)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl<S, G> Invalidatable<S, G>
where
    S: Flags + Copy + fmt::Debug,
    G: Flags + Copy + fmt::Debug,
{
    /// Creates a tracker whose supported states start dirty.
    #[must_use]
    pub fn new(supported_states: S, supported_signals: G) -> Self {
        Self {
            supported_states,
            supported_signals,
            dirty: supported_states,
            suspend_depth: 0,
            pending_signals: G::empty(),
            has_pending: false,
            listeners: Vec::new(),
            next_listener_id: 0,
        }
    }

    #[must_use]
    pub fn supported_states(&self) -> S {
        self.supported_states
    }

    #[must_use]
    pub fn supported_signals(&self) -> G {
        self.supported_signals
    }

    #[must_use]
    pub fn dirty_states(&self) -> S {
        self.dirty
    }

    /// ORs `states` into the dirty set and notifies listeners when a new bit
    /// was actually set. Returns whether the dirty set changed.
    pub fn invalidate(&mut self, states: S, signals: G) -> bool {
        let effective = states.intersection(self.supported_states);
        let fresh = effective.difference(self.dirty);
        if fresh.is_empty() {
            return false;
        }
        self.dirty.insert(fresh);
        trace!(states = ?fresh, signals = ?signals, "invalidate");
        self.dispatch(signals);
        true
    }

    pub fn mark_consistent(&mut self, states: S) {
        self.dirty.remove(states);
    }

    #[must_use]
    pub fn has_invalidation_state(&self, states: S) -> bool {
        self.dirty.intersects(states)
    }

    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.dirty.is_empty()
    }

    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspend_depth > 0
    }

    pub fn suspend_signals_dispatching(&mut self) {
        self.suspend_depth = self.suspend_depth.saturating_add(1);
    }

    /// Leaves one suspension level. At depth zero the deferred signals are
    /// either flushed as one union or dropped, depending on `flush_pending`.
    pub fn resume_signals_dispatching(&mut self, flush_pending: bool) {
        if self.suspend_depth == 0 {
            return;
        }
        self.suspend_depth -= 1;
        if self.suspend_depth > 0 {
            return;
        }

        let pending = self.pending_signals;
        let had_pending = self.has_pending;
        self.pending_signals = G::empty();
        self.has_pending = false;
        if flush_pending && had_pending {
            self.notify(pending);
        }
    }

    pub fn listen(&mut self, listener: impl FnMut(G) + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id = self.next_listener_id.wrapping_add(1);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unlisten(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    fn dispatch(&mut self, signals: G) {
        let effective = signals.intersection(self.supported_signals);
        if self.suspend_depth > 0 {
            self.pending_signals.insert(effective);
            self.has_pending = true;
            return;
        }
        self.notify(effective);
    }

    fn notify(&mut self, signals: G) {
        if signals.is_empty() {
            return;
        }
        for (_, listener) in &mut self.listeners {
            listener(signals);
        }
    }
}

/// Capability shared by components that own an [`Invalidatable`].
pub trait Consistent {
    type State: Flags + Copy + fmt::Debug;
    type Signal: Flags + Copy + fmt::Debug;

    fn consistency(&self) -> &Invalidatable<Self::State, Self::Signal>;

    fn consistency_mut(&mut self) -> &mut Invalidatable<Self::State, Self::Signal>;

    fn invalidate(&mut self, states: Self::State, signals: Self::Signal) -> bool {
        self.consistency_mut().invalidate(states, signals)
    }

    fn mark_consistent(&mut self, states: Self::State) {
        self.consistency_mut().mark_consistent(states);
    }

    fn has_invalidation_state(&self, states: Self::State) -> bool {
        self.consistency().has_invalidation_state(states)
    }

    fn is_consistent(&self) -> bool {
        self.consistency().is_consistent()
    }

    fn suspend_signals_dispatching(&mut self) {
        self.consistency_mut().suspend_signals_dispatching();
    }

    fn resume_signals_dispatching(&mut self, flush_pending: bool) {
        self.consistency_mut()
            .resume_signals_dispatching(flush_pending);
    }

    fn listen_signals(&mut self, listener: impl FnMut(Self::Signal) + 'static) -> ListenerId
    where
        Self: Sized,
    {
        self.consistency_mut().listen(listener)
    }

    fn unlisten_signals(&mut self, id: ListenerId) -> bool {
        self.consistency_mut().unlisten(id)
    }

    /// Suspends signal dispatching until the returned guard is dropped.
    ///
    /// The guard resumes with `flush_pending = true` on every exit path,
    /// so nested batches collapse into one notification.
    fn batch(&mut self) -> SignalBatch<'_, Self>
    where
        Self: Sized,
    {
        self.suspend_signals_dispatching();
        SignalBatch {
            target: self,
            flush_pending: true,
        }
    }
}

/// Scoped suspension of a component's signal dispatching.
pub struct SignalBatch<'a, T: Consistent> {
    target: &'a mut T,
    flush_pending: bool,
}

impl<T: Consistent> SignalBatch<'_, T> {
    /// Drops deferred signals instead of flushing them on resume.
    pub fn discard_pending(&mut self) {
        self.flush_pending = false;
    }
}

impl<T: Consistent> fmt::Debug for SignalBatch<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalBatch")
            .field("flush_pending", &self.flush_pending)
            .finish_non_exhaustive()
    }
}

impl<T: Consistent> Deref for SignalBatch<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.target
    }
}

impl<T: Consistent> DerefMut for SignalBatch<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.target
    }
}

impl<T: Consistent> Drop for SignalBatch<'_, T> {
    fn drop(&mut self) {
        self.target.resume_signals_dispatching(self.flush_pending);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use bitflags::bitflags;

    use super::{Consistent, Invalidatable};

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct TestState: u8 {
            const A = 1 << 0;
            const B = 1 << 1;
            const C = 1 << 2;
            const UNSUPPORTED = 1 << 7;
        }
    }

    bitflags! {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        struct TestSignal: u8 {
            const REDRAW = 1 << 0;
            const BOUNDS = 1 << 1;
            const FOREIGN = 1 << 6;
        }
    }

    #[derive(Debug)]
    struct Probe {
        consistency: Invalidatable<TestState, TestSignal>,
    }

    impl Consistent for Probe {
        type State = TestState;
        type Signal = TestSignal;

        fn consistency(&self) -> &Invalidatable<TestState, TestSignal> {
            &self.consistency
        }

        fn consistency_mut(&mut self) -> &mut Invalidatable<TestState, TestSignal> {
            &mut self.consistency
        }
    }

    fn probe() -> (Probe, Rc<RefCell<Vec<TestSignal>>>) {
        let mut consistency = Invalidatable::new(
            TestState::A | TestState::B | TestState::C,
            TestSignal::REDRAW | TestSignal::BOUNDS,
        );
        consistency.mark_consistent(TestState::all());
        let received = Rc::new(RefCell::new(Vec::new()));
        let sink = received.clone();
        consistency.listen(move |signal| sink.borrow_mut().push(signal));
        (Probe { consistency }, received)
    }

    #[test]
    fn new_tracker_starts_with_supported_states_dirty() {
        let tracker: Invalidatable<TestState, TestSignal> =
            Invalidatable::new(TestState::A | TestState::B, TestSignal::REDRAW);
        assert!(tracker.has_invalidation_state(TestState::A));
        assert!(tracker.has_invalidation_state(TestState::B));
        assert!(!tracker.has_invalidation_state(TestState::C));
    }

    #[test]
    fn unsupported_bits_are_ignored() {
        let (mut probe, received) = probe();
        assert!(!probe.invalidate(TestState::UNSUPPORTED, TestSignal::REDRAW));
        assert!(probe.is_consistent());
        assert!(received.borrow().is_empty());
    }

    #[test]
    fn invalidate_notifies_only_when_a_new_bit_is_set() {
        let (mut probe, received) = probe();
        assert!(probe.invalidate(TestState::A, TestSignal::REDRAW));
        assert!(!probe.invalidate(TestState::A, TestSignal::REDRAW));
        assert_eq!(*received.borrow(), vec![TestSignal::REDRAW]);
    }

    #[test]
    fn unsupported_signals_are_masked_out() {
        let (mut probe, received) = probe();
        probe.invalidate(TestState::B, TestSignal::REDRAW | TestSignal::FOREIGN);
        assert_eq!(*received.borrow(), vec![TestSignal::REDRAW]);
    }

    #[test]
    fn mark_consistent_clears_bits_without_notifying() {
        let (mut probe, received) = probe();
        probe.invalidate(TestState::A | TestState::B, TestSignal::REDRAW);
        probe.mark_consistent(TestState::A);
        assert!(!probe.has_invalidation_state(TestState::A));
        assert!(probe.has_invalidation_state(TestState::B));
        assert!(!probe.is_consistent());
        probe.mark_consistent(TestState::B);
        assert!(probe.is_consistent());
        assert_eq!(received.borrow().len(), 1);
    }

    #[test]
    fn nested_suspension_flushes_union_once_at_depth_zero() {
        let (mut probe, received) = probe();
        probe.suspend_signals_dispatching();
        probe.suspend_signals_dispatching();
        probe.invalidate(TestState::A, TestSignal::REDRAW);
        probe.invalidate(TestState::B, TestSignal::BOUNDS);
        probe.resume_signals_dispatching(true);
        assert!(received.borrow().is_empty());
        probe.resume_signals_dispatching(true);
        assert_eq!(
            *received.borrow(),
            vec![TestSignal::REDRAW | TestSignal::BOUNDS]
        );
        assert!(probe.has_invalidation_state(TestState::A | TestState::B));
    }

    #[test]
    fn resume_without_flush_drops_deferred_signals() {
        let (mut probe, received) = probe();
        probe.suspend_signals_dispatching();
        probe.invalidate(TestState::C, TestSignal::REDRAW);
        probe.resume_signals_dispatching(false);
        assert!(received.borrow().is_empty());
        assert!(probe.has_invalidation_state(TestState::C));
    }

    #[test]
    fn batch_guard_resumes_on_drop() {
        let (mut probe, received) = probe();
        {
            let mut batch = probe.batch();
            batch.invalidate(TestState::A, TestSignal::REDRAW);
            batch.invalidate(TestState::C, TestSignal::REDRAW);
            assert!(batch.consistency().is_suspended());
        }
        assert!(!probe.consistency().is_suspended());
        assert_eq!(*received.borrow(), vec![TestSignal::REDRAW]);
    }

    #[test]
    fn unlisten_removes_listener() {
        let (mut probe, received) = probe();
        let extra = Rc::new(RefCell::new(0_u32));
        let counter = extra.clone();
        let id = probe.listen_signals(move |_| *counter.borrow_mut() += 1);
        assert!(probe.unlisten_signals(id));
        assert!(!probe.unlisten_signals(id));
        probe.invalidate(TestState::A, TestSignal::REDRAW);
        assert_eq!(*extra.borrow(), 0);
        assert_eq!(received.borrow().len(), 1);
    }
}
