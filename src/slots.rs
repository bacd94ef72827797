//! Lease bookkeeping shared by every acquire path.
//!
//! Everything in here runs under the pool mutex. [`Slots`] never blocks and
//! never wakes anybody itself: it decides *who* gets a slot and hands the
//! caller a [`Signal`] to fire once the lock has been dropped.

use std::{
    collections::{HashMap, VecDeque},
    fmt,
    sync::Arc,
    task::Waker,
    time::{Duration, Instant},
};

use parking_lot::Condvar;

/// What a queued waiter is willing to take.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Target {
    Any,
    Index(usize),
}

impl Target {
    fn accepts(self, index: usize) -> bool {
        match self {
            Self::Any => true,
            Self::Index(wanted) => wanted == index,
        }
    }
}

/// How a suspended waiter gets woken up.
pub(crate) enum Signal {
    /// A blocked thread parked on its own condition variable.
    Thread(Arc<Condvar>),
    /// A pending [`Acquire`](crate::Acquire) future.
    Task(Waker),
}

impl Signal {
    pub(crate) fn wake(self) {
        match self {
            Self::Thread(cond) => {
                let _ = cond.notify_one();
            }
            Self::Task(waker) => waker.wake(),
        }
    }
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Thread(_) => f.write_str("Thread"),
            Self::Task(_) => f.write_str("Task"),
        }
    }
}

/// Identifies a queued waiter. Tickets are handed out in arrival order.
pub(crate) type Ticket = u64;

#[derive(Debug)]
struct Waiter {
    ticket: Ticket,
    target: Target,
    signal: Signal,
}

/// Outcome of releasing a leased slot.
#[derive(Debug)]
pub(crate) struct Released {
    /// How long the slot was leased by the previous holder.
    pub(crate) held: Duration,
    /// The waiter that received the slot, if anybody was queued for it.
    pub(crate) handoff: Option<Signal>,
}

/// The slot was not leased when somebody tried to release it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NotLeased;

/// Free/leased state of every slot plus the FIFO queue of suspended callers.
///
/// Invariant: no queued waiter could take any currently free slot. Releases
/// hand slots straight to the first eligible waiter, and waiters only queue
/// when nothing they accept is free, so a fresh caller grabbing a free slot
/// never overtakes somebody already waiting.
#[derive(Debug)]
pub(crate) struct Slots {
    /// `None` for a free slot, otherwise the instant it was leased.
    leases: Vec<Option<Instant>>,
    free: usize,
    queue: VecDeque<Waiter>,
    /// Slots handed to waiters that have not picked them up yet.
    granted: HashMap<Ticket, usize>,
    next_ticket: Ticket,
}

impl Slots {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            leases: vec![None; size],
            free: size,
            queue: VecDeque::new(),
            granted: HashMap::new(),
            next_ticket: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.leases.len()
    }

    pub(crate) fn free(&self) -> usize {
        self.free
    }

    pub(crate) fn leased(&self) -> usize {
        self.leases.len() - self.free
    }

    pub(crate) fn waiting(&self) -> usize {
        self.queue.len()
    }

    /// Leases the lowest free slot, if any.
    pub(crate) fn take_any(&mut self) -> Option<usize> {
        if self.free == 0 {
            return None;
        }
        let index = self.leases.iter().position(Option::is_none)?;
        self.lease(index);
        Some(index)
    }

    /// Leases `index` if it is free.
    pub(crate) fn take(&mut self, index: usize) -> bool {
        if self.leases[index].is_some() {
            return false;
        }
        self.lease(index);
        true
    }

    pub(crate) fn try_take(&mut self, target: Target) -> Option<usize> {
        match target {
            Target::Any => self.take_any(),
            Target::Index(index) => self.take(index).then_some(index),
        }
    }

    fn lease(&mut self, index: usize) {
        debug_assert!(self.leases[index].is_none());
        self.leases[index] = Some(Instant::now());
        self.free -= 1;
    }

    /// Queues a waiter behind everybody already waiting.
    pub(crate) fn enqueue(&mut self, target: Target, signal: Signal) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.queue.push_back(Waiter {
            ticket,
            target,
            signal,
        });
        ticket
    }

    /// Replaces the waker of a pending task if it changed between polls.
    pub(crate) fn register(&mut self, ticket: Ticket, waker: &Waker) {
        if let Some(waiter) = self.queue.iter_mut().find(|w| w.ticket == ticket) {
            let stale = match &waiter.signal {
                Signal::Task(current) => !current.will_wake(waker),
                Signal::Thread(_) => true,
            };
            if stale {
                waiter.signal = Signal::Task(waker.clone());
            }
        }
    }

    /// Picks up a slot handed to `ticket`, if one has been.
    pub(crate) fn claim(&mut self, ticket: Ticket) -> Option<usize> {
        self.granted.remove(&ticket)
    }

    /// Removes `ticket` from the queue.
    ///
    /// Returns the slot if it was already handed to this waiter; the caller
    /// then owns that lease and must either use or release it.
    pub(crate) fn withdraw(&mut self, ticket: Ticket) -> Option<usize> {
        if let Some(pos) = self.queue.iter().position(|w| w.ticket == ticket) {
            drop(self.queue.remove(pos));
            return None;
        }
        self.granted.remove(&ticket)
    }

    /// Ends the lease on `index`.
    ///
    /// The slot goes to the earliest queued waiter that accepts it. It only
    /// becomes free when no such waiter exists.
    pub(crate) fn release(&mut self, index: usize) -> Result<Released, NotLeased> {
        let since = self.leases[index].ok_or(NotLeased)?;
        let now = Instant::now();
        let held = now.saturating_duration_since(since);

        let next = self
            .queue
            .iter()
            .position(|w| w.target.accepts(index))
            .and_then(|pos| self.queue.remove(pos));
        let handoff = if let Some(waiter) = next {
            self.leases[index] = Some(now);
            let _ = self.granted.insert(waiter.ticket, index);
            Some(waiter.signal)
        } else {
            self.leases[index] = None;
            self.free += 1;
            None
        };

        Ok(Released { held, handoff })
    }
}
