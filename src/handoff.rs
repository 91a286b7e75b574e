//! Rendezvous handoff for readiness reports
//!
//! A handoff carries values from one producer to one consumer with no
//! buffering: [`Sender::send`] blocks until the consumer has taken the value.
//! The consumer polls with [`Receiver::try_recv`] and, when several handoffs
//! share one [`Doorbell`], sleeps on the doorbell until any of them has
//! something on offer.
//!
//! ```
//! use std::thread;
//! use tinsel::handoff::{rendezvous, Doorbell};
//!
//! let bell = Doorbell::new();
//! let (tx, rx) = rendezvous::<u32>(&bell);
//!
//! let producer = thread::spawn(move || tx.send(7));
//!
//! let value = loop {
//!     let seen = bell.generation();
//!     if let Some(v) = rx.try_recv().unwrap() {
//!         break v;
//!     }
//!     bell.wait_past(seen);
//! };
//! assert_eq!(value, 7);
//! producer.join().unwrap().unwrap();
//! ```

use crate::error::{Error, Result};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;
use tinsel_core::Error as CoreError;

/// Wakes a consumer when any of its handoffs is offered a value
///
/// Each ring bumps a generation counter. A consumer reads the generation,
/// polls its handoffs, and if nothing was ready waits for the generation to
/// move past the one it read; a ring that lands in between is never lost.
#[derive(Debug, Default)]
pub struct Doorbell {
    generation: Mutex<u64>,
    rung: Condvar,
}

impl Doorbell {
    /// Create a doorbell to share between handoffs
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Block until the generation moves past `seen`
    ///
    /// Returns the new generation.
    pub fn wait_past(&self, seen: u64) -> u64 {
        let mut generation = self.generation.lock();
        while *generation == seen {
            self.rung.wait(&mut generation);
        }
        *generation
    }

    /// Like [`wait_past`](Self::wait_past), giving up after `timeout`
    ///
    /// Returns `None` on timeout.
    pub fn wait_past_for(&self, seen: u64, timeout: Duration) -> Option<u64> {
        let mut generation = self.generation.lock();
        if *generation == seen {
            self.rung.wait_for(&mut generation, timeout);
        }
        (*generation != seen).then_some(*generation)
    }

    fn ring(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.rung.notify_all();
    }
}

struct Slot<T> {
    value: Option<T>,
    sender_alive: bool,
    receiver_alive: bool,
}

struct Shared<T> {
    slot: Mutex<Slot<T>>,
    /// Signalled when a value is offered or the sender goes away
    offered: Condvar,
    /// Signalled when a value is taken or the receiver goes away
    taken: Condvar,
    bell: Arc<Doorbell>,
}

/// Create a connected handoff pair that rings `bell` on every offer
pub fn rendezvous<T>(bell: &Arc<Doorbell>) -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            value: None,
            sender_alive: true,
            receiver_alive: true,
        }),
        offered: Condvar::new(),
        taken: Condvar::new(),
        bell: Arc::clone(bell),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared },
    )
}

/// Producing side of a handoff
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Offer `value` and block until the receiver takes it
    ///
    /// Offers are taken in the order they were made. Fails with
    /// `Disconnected` if the receiver is dropped before taking the value.
    pub fn send(&self, value: T) -> Result<()> {
        let mut slot = self.shared.slot.lock();

        // Wait for an earlier offer to clear
        while slot.value.is_some() && slot.receiver_alive {
            self.shared.taken.wait(&mut slot);
        }
        if !slot.receiver_alive {
            return Err(disconnected());
        }

        slot.value = Some(value);
        self.shared.offered.notify_all();
        self.shared.bell.ring();

        while slot.value.is_some() {
            if !slot.receiver_alive {
                slot.value = None;
                return Err(disconnected());
            }
            self.shared.taken.wait(&mut slot);
        }
        Ok(())
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        self.shared.slot.lock().sender_alive = false;
        self.shared.offered.notify_all();
        self.shared.bell.ring();
    }
}

/// Consuming side of a handoff
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Receiver<T> {
    /// Take the value on offer, if any
    ///
    /// Fails with `Disconnected` once the sender is gone and nothing is left
    /// on offer.
    pub fn try_recv(&self) -> Result<Option<T>> {
        let mut slot = self.shared.slot.lock();
        match slot.value.take() {
            Some(value) => {
                self.shared.taken.notify_all();
                Ok(Some(value))
            }
            None if !slot.sender_alive => Err(disconnected()),
            None => Ok(None),
        }
    }

    /// Block until a value is offered and take it
    pub fn recv(&self) -> Result<T> {
        let mut slot = self.shared.slot.lock();
        loop {
            if let Some(value) = slot.value.take() {
                self.shared.taken.notify_all();
                return Ok(value);
            }
            if !slot.sender_alive {
                return Err(disconnected());
            }
            self.shared.offered.wait(&mut slot);
        }
    }

    /// Check if a value is waiting to be taken
    pub fn is_offered(&self) -> bool {
        self.shared.slot.lock().value.is_some()
    }
}

impl<T> Drop for Receiver<T> {
    fn drop(&mut self) {
        self.shared.slot.lock().receiver_alive = false;
        self.shared.taken.notify_all();
    }
}

fn disconnected() -> Error {
    Error::Stm(CoreError::Disconnected)
}

impl<T> std::fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sender").finish_non_exhaustive()
    }
}

impl<T> std::fmt::Debug for Receiver<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("offered", &self.is_offered())
            .finish()
    }
}
