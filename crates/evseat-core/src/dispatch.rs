// Evseat Dispatch
// Event source driving a seat from a backend inside a host poll loop

use std::io;

use crate::backend::{BackendError, BackendResult, DeviceBackend};
use crate::event::StageQueue;
use crate::seat::Seat;
use crate::timer::Clock;

/// Outcome of [`EventSource::prepare`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prepare {
    /// Events are already queued; dispatch without waiting
    pub ready: bool,
    /// Milliseconds until the next seat timer, `None` when none is armed
    pub timeout_ms: Option<i32>,
}

/// Glue between a [`DeviceBackend`], a [`Seat`] and the host's
/// [`StageQueue`].
///
/// The host drives it with the usual three phases: `prepare`, wait on
/// the backend descriptors, `check`, then `dispatch`. Each dispatch hands
/// at most one event to the stage queue, and the backend is only read
/// once everything normalized before has been delivered.
pub struct EventSource<B> {
    seat: Seat,
    backend: B,
    queue: StageQueue,
    clock: Box<dyn Clock>,
    suspended: bool,
}

impl<B: DeviceBackend> EventSource<B> {
    pub fn new(seat: Seat, backend: B, queue: StageQueue, clock: impl Clock + 'static) -> Self {
        Self {
            seat,
            backend,
            queue,
            clock: Box::new(clock),
            suspended: false,
        }
    }

    pub fn seat(&self) -> &Seat {
        &self.seat
    }

    pub fn seat_mut(&mut self) -> &mut Seat {
        &mut self.seat
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn stage_queue(&self) -> &StageQueue {
        &self.queue
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn prepare(&self) -> Prepare {
        let timeout_ms = self.seat.next_deadline().map(|deadline| {
            let remaining_us = deadline.saturating_sub(self.clock.now_us());
            i32::try_from(remaining_us.div_ceil(1_000)).unwrap_or(i32::MAX)
        });
        Prepare {
            ready: self.seat.queued_events() > 0 || self.backend.has_pending(),
            timeout_ms,
        }
    }

    /// Whether a dispatch has work to do after waiting
    pub fn check(&self, readable: bool) -> bool {
        readable
            || self.seat.queued_events() > 0
            || self.backend.has_pending()
            || self
                .seat
                .next_deadline()
                .is_some_and(|deadline| deadline <= self.clock.now_us())
    }

    /// Wait up to `timeout_ms` (-1 blocks) for a backend descriptor to
    /// become readable. An interrupted wait reports nothing readable.
    pub fn wait(&self, timeout_ms: i32) -> BackendResult<bool> {
        let mut poll_fds: Vec<libc::pollfd> = self
            .backend
            .poll_fds()
            .into_iter()
            .map(|fd| libc::pollfd {
                fd,
                events: libc::POLLIN,
                revents: 0,
            })
            .collect();
        if poll_fds.is_empty() {
            return Ok(self.backend.has_pending());
        }

        let result = unsafe {
            libc::poll(
                poll_fds.as_mut_ptr(),
                poll_fds.len() as libc::nfds_t,
                timeout_ms,
            )
        };
        if result < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(BackendError::Io(err));
        }
        Ok(result > 0)
    }

    /// Normalize what the backend has (only when nothing is pending
    /// delivery), fire due timers and move one event to the stage queue.
    /// Returns whether an event was delivered.
    ///
    /// Timers only catch up with the clock right after the backend was
    /// read. With a backlog pending, unread device events may be older
    /// than a due timer and must be processed first.
    pub fn dispatch(&mut self) -> BackendResult<bool> {
        if self.seat.queued_events() == 0 {
            for raw in self.backend.dispatch()? {
                self.seat.process_raw(raw);
            }
            self.seat.run_timers(self.clock.now_us());
        }
        self.flush_leds();

        match self.seat.next_event() {
            Some(event) => {
                log::trace!("dispatching {} from {}", event.name(), event.source_device);
                self.queue.push(event);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stop reading devices and drop whatever is in flight. Hotplug
    /// keeps being tracked.
    pub fn suspend(&mut self) -> BackendResult<()> {
        if self.suspended {
            log::warn!("event source already suspended");
            return Ok(());
        }
        self.backend.suspend()?;
        self.seat.release_devices();
        for raw in self.backend.dispatch()? {
            self.seat.process_raw(raw);
        }
        self.suspended = true;
        log::info!("suspended seat {}", self.seat.name());
        Ok(())
    }

    /// Resume reading devices and resync the lock LEDs
    pub fn resume(&mut self) -> BackendResult<()> {
        if !self.suspended {
            log::warn!("event source not suspended");
            return Ok(());
        }
        self.backend.resume()?;
        self.seat.reclaim_devices();
        self.flush_leds();
        self.suspended = false;
        log::info!("resumed seat {}", self.seat.name());
        Ok(())
    }

    fn flush_leds(&mut self) {
        if let Some(leds) = self.seat.take_pending_leds() {
            if let Err(e) = self.backend.update_leds(leds) {
                log::warn!("updating LEDs: {}", e);
            }
        }
    }
}
