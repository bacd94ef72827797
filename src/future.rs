use std::{
    fmt,
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use tracing::trace;

use crate::{
    slots::{Signal, Target, Ticket},
    Pool,
};

/// Future returned by [`Pool::acquire_async()`] and
/// [`Pool::acquire_at_async()`], resolving to the index of the leased slot.
///
/// It takes its place in the same queue as blocked threads, so async and
/// blocking callers are served in a single arrival order. The future does not
/// depend on any particular executor.
///
/// Dropping the future before it completes withdraws it from the queue. A
/// slot that was handed to it in the meantime is released again, which passes
/// it on to the next waiter, so cancelling never leaks a lease.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Acquire<T> {
    pool: Pool<T>,
    target: Target,
    state: State,
}

#[derive(Clone, Copy, Debug)]
enum State {
    Init,
    Waiting { ticket: Ticket, since: Instant },
    Done,
}

impl<T> fmt::Debug for Acquire<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquire")
            .field("target", &self.target)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl<T> Acquire<T> {
    pub(crate) fn new(pool: Pool<T>, target: Target) -> Self {
        Self {
            pool,
            target,
            state: State::Init,
        }
    }
}

impl<T> Future for Acquire<T> {
    type Output = usize;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<usize> {
        let this = self.get_mut();
        let inner = &this.pool.inner;
        let mut slots = inner.slots.lock();
        match this.state {
            State::Init => {
                if let Some(index) = slots.try_take(this.target) {
                    this.state = State::Done;
                    trace!(index, "slot leased");
                    return Poll::Ready(index);
                }
                let ticket = slots.enqueue(this.target, Signal::Task(cx.waker().clone()));
                trace!(wanted = ?this.target, ticket, "task waiting for a slot");
                this.state = State::Waiting {
                    ticket,
                    since: Instant::now(),
                };
                Poll::Pending
            }
            State::Waiting { ticket, since } => match slots.claim(ticket) {
                Some(index) => {
                    drop(slots);
                    inner.metrics.record_waiting(since.elapsed());
                    this.state = State::Done;
                    trace!(index, ticket, "slot leased after waiting");
                    Poll::Ready(index)
                }
                None => {
                    slots.register(ticket, cx.waker());
                    Poll::Pending
                }
            },
            State::Done => panic!("`Acquire` polled after completion"),
        }
    }
}

impl<T> Drop for Acquire<T> {
    fn drop(&mut self) {
        if let State::Waiting { ticket, .. } = self.state {
            let granted = self.pool.inner.slots.lock().withdraw(ticket);
            if let Some(index) = granted {
                trace!(index, ticket, "passing on slot granted to a cancelled task");
                let _ = self.pool.inner.release(index);
            }
        }
    }
}
