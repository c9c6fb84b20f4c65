//! Single-slot hand-off between a pushing producer and a pulling consumer.
//!
//! The consumer asks for a frame by calling [`FrameHandoff::next_frame`],
//! which issues a [`Ticket`] and signals "buffer ready". A producer thread
//! blocked in [`HandoffProducer::wait_for_request`] receives the ticket,
//! produces one frame and hands it back with [`HandoffProducer::publish`],
//! which signals "frame ready".
//!
//! Late frames follow a one-frame grace rule. A frame answering the most
//! recently withdrawn request (the consumer timed out on it) is kept and
//! handed to the next `next_frame` call, which then returns at once. A frame
//! answering any older request is discarded. The consumer never waits for a
//! stale production, and at most one frame is ever held.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;
use framewire_image::ImageMetadata;
use tracing::{debug, trace, warn};

use crate::error::{FrameError, Result};

/// Observable state of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// A request is outstanding (or none has been made yet).
    WaitingForFrame,
    /// The last request was answered.
    FrameReady,
    /// The producer finished. Sticky.
    EndOfStream,
    /// The producer failed. Sticky.
    Faulted,
}

/// Permission to answer one consumer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

/// A frame moved out of the slot to the consumer.
#[derive(Debug, Clone)]
pub struct PublishedFrame {
    pub metadata: ImageMetadata,
    pub data: Bytes,
    /// Ticket the frame answered.
    pub sequence: u64,
}

/// Outcome of [`HandoffProducer::publish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publish {
    /// The consumer will observe the frame.
    Delivered,
    /// The request was too old or already answered; the frame was dropped.
    Discarded,
    /// The slot is closed or terminal; the producer should stop.
    Closed,
}

/// Outcome of [`HandoffProducer::wait_for_request_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestWait {
    Ready(Ticket),
    TimedOut,
    Closed,
}

/// Counters kept by the slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandoffStats {
    pub requests: u64,
    pub delivered: u64,
    /// Frames that arrived after their request timed out but were kept.
    pub late: u64,
    pub discarded: u64,
    pub timeouts: u64,
    pub overflows: u64,
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    next_ticket: u64,
    /// Ticket of the request the consumer is waiting on.
    requested: Option<u64>,
    /// Ticket of the last request the consumer gave up on.
    withdrawn: Option<u64>,
    /// Ticket last handed to a producer.
    claimed: Option<u64>,
    frame: Option<PublishedFrame>,
    terminal: Option<FrameError>,
    overflow_pending: bool,
    closed: bool,
    stats: HandoffStats,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
    buffer_ready: Condvar,
    frame_ready: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // Slot updates never panic halfway, so a poisoned slot is still consistent.
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn wake_all(&self) {
        self.buffer_ready.notify_all();
        self.frame_ready.notify_all();
    }
}

/// Consumer side of the hand-off. Dropping it releases every producer.
#[derive(Debug)]
pub struct FrameHandoff {
    shared: Arc<Shared>,
}

/// Producer side of the hand-off. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HandoffProducer {
    shared: Arc<Shared>,
}

impl FrameHandoff {
    /// Create a connected consumer/producer pair.
    pub fn new() -> (FrameHandoff, HandoffProducer) {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                state: SlotState::WaitingForFrame,
                next_ticket: 1,
                requested: None,
                withdrawn: None,
                claimed: None,
                frame: None,
                terminal: None,
                overflow_pending: false,
                closed: false,
                stats: HandoffStats::default(),
            }),
            buffer_ready: Condvar::new(),
            frame_ready: Condvar::new(),
        });
        (
            FrameHandoff {
                shared: Arc::clone(&shared),
            },
            HandoffProducer { shared },
        )
    }

    /// Request a new frame and wait up to `timeout` for it.
    ///
    /// Returns every published frame at most once. A late frame kept from
    /// a timed-out request is returned immediately. After
    /// [`FrameError::EndOfStream`] or a fault, every later call fails the
    /// same way without waiting.
    pub fn next_frame(&self, timeout: Duration) -> Result<PublishedFrame> {
        let mut slot = self.shared.lock();

        if let Some(frame) = slot.frame.take() {
            trace!(ticket = frame.sequence, "serving late frame");
            slot.state = SlotState::FrameReady;
            return Ok(frame);
        }
        if let Some(err) = slot.terminal.clone() {
            slot.state = terminal_state(&err);
            return Err(err);
        }
        if slot.overflow_pending {
            slot.overflow_pending = false;
            return Err(FrameError::Overflow);
        }

        let ticket = slot.next_ticket;
        slot.next_ticket += 1;
        slot.requested = Some(ticket);
        slot.state = SlotState::WaitingForFrame;
        slot.stats.requests += 1;
        trace!(ticket, "frame requested");
        self.shared.buffer_ready.notify_all();

        let deadline = Instant::now() + timeout;
        loop {
            if let Some(frame) = slot.frame.take() {
                slot.state = SlotState::FrameReady;
                return Ok(frame);
            }
            if let Some(err) = slot.terminal.clone() {
                slot.requested = None;
                slot.state = terminal_state(&err);
                return Err(err);
            }

            let now = Instant::now();
            if now >= deadline {
                // A late answer to this request may still satisfy the next call.
                slot.withdrawn = slot.requested.take();
                slot.stats.timeouts += 1;
                debug!(ticket, ?timeout, "no frame before deadline");
                return Err(FrameError::Timeout);
            }
            slot = self
                .shared
                .frame_ready
                .wait_timeout(slot, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    pub fn state(&self) -> SlotState {
        self.shared.lock().state
    }

    pub fn stats(&self) -> HandoffStats {
        self.shared.lock().stats
    }

    /// Another producer handle for the same slot.
    pub fn producer(&self) -> HandoffProducer {
        HandoffProducer {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Drop for FrameHandoff {
    fn drop(&mut self) {
        let mut slot = self.shared.lock();
        slot.closed = true;
        slot.requested = None;
        drop(slot);
        self.shared.wake_all();
    }
}

impl HandoffProducer {
    /// Block until the consumer requests a frame.
    ///
    /// Returns `None` once the consumer is gone or the slot is terminal.
    pub fn wait_for_request(&self) -> Option<Ticket> {
        let mut slot = self.shared.lock();
        loop {
            match poll_request(&mut slot) {
                RequestWait::Ready(ticket) => return Some(ticket),
                RequestWait::Closed => return None,
                RequestWait::TimedOut => {}
            }
            slot = self
                .shared
                .buffer_ready
                .wait(slot)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Like [`wait_for_request`](Self::wait_for_request) with an upper bound.
    pub fn wait_for_request_timeout(&self, timeout: Duration) -> RequestWait {
        let deadline = Instant::now() + timeout;
        let mut slot = self.shared.lock();
        loop {
            match poll_request(&mut slot) {
                RequestWait::TimedOut => {}
                outcome => return outcome,
            }
            let now = Instant::now();
            if now >= deadline {
                return RequestWait::TimedOut;
            }
            slot = self
                .shared
                .buffer_ready
                .wait_timeout(slot, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poisoned| poisoned.into_inner().0);
        }
    }

    /// Hand a frame to the consumer that issued `ticket`.
    pub fn publish(&self, ticket: Ticket, metadata: ImageMetadata, data: Bytes) -> Publish {
        let mut slot = self.shared.lock();
        if slot.closed || slot.terminal.is_some() {
            return Publish::Closed;
        }
        let current = slot.requested == Some(ticket.0);
        let late = slot.withdrawn == Some(ticket.0);
        if !(current || late) || slot.frame.is_some() {
            slot.stats.discarded += 1;
            debug!(ticket = ticket.0, "discarding stale frame");
            return Publish::Discarded;
        }
        if late {
            debug!(ticket = ticket.0, "keeping late frame for the next request");
            slot.stats.late += 1;
        }

        slot.requested = None;
        slot.withdrawn = None;
        slot.frame = Some(PublishedFrame {
            metadata,
            data,
            sequence: ticket.0,
        });
        slot.state = SlotState::FrameReady;
        slot.stats.delivered += 1;
        drop(slot);
        self.shared.frame_ready.notify_all();
        Publish::Delivered
    }

    /// Report that frames were dropped upstream. The consumer's next request
    /// fails once with [`FrameError::Overflow`].
    pub fn report_overflow(&self) {
        let mut slot = self.shared.lock();
        if slot.terminal.is_none() {
            slot.overflow_pending = true;
            slot.stats.overflows += 1;
        }
    }

    /// The producer has no more frames.
    pub fn end_of_stream(&self) {
        self.terminate(FrameError::EndOfStream);
    }

    /// The producer failed and will not recover.
    pub fn fault(&self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(%reason, "frame producer faulted");
        self.terminate(FrameError::Faulted(reason));
    }

    /// True once the consumer is gone or the slot is terminal.
    pub fn is_closed(&self) -> bool {
        let slot = self.shared.lock();
        slot.closed || slot.terminal.is_some()
    }

    fn terminate(&self, err: FrameError) {
        let mut slot = self.shared.lock();
        if slot.terminal.is_some() {
            return;
        }
        // An unconsumed frame is still handed out; the consumer sees the
        // terminal state on its following request.
        if slot.frame.is_none() {
            slot.state = terminal_state(&err);
        }
        slot.terminal = Some(err);
        drop(slot);
        self.shared.wake_all();
    }
}

fn poll_request(slot: &mut Slot) -> RequestWait {
    if slot.closed || slot.terminal.is_some() {
        return RequestWait::Closed;
    }
    match slot.requested {
        Some(ticket) if slot.claimed != Some(ticket) => {
            slot.claimed = Some(ticket);
            RequestWait::Ready(Ticket(ticket))
        }
        _ => RequestWait::TimedOut,
    }
}

fn terminal_state(err: &FrameError) -> SlotState {
    match err {
        FrameError::EndOfStream => SlotState::EndOfStream,
        _ => SlotState::Faulted,
    }
}
