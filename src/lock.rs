//! The two readers/writers protocols.
//!
//! Both keep `readcount` behind `rmutex` and use `resource` as the
//! exclusive hold: held by exactly one writer, or by the current reader
//! wave as a whole (taken by its first reader, returned by its last).

use parking_lot::Mutex;

use crate::{
    sem::{Semaphore, TicketGate},
    Policy, Role,
};

pub trait RwProtocol: Send + Sync {
    fn acquire_read(&self);
    fn release_read(&self);
    fn acquire_write(&self);
    fn release_write(&self);

    fn policy(&self) -> Policy;

    /// Readers currently between `acquire_read` and `release_read`.
    fn readers(&self) -> usize;

    fn acquire(&self, role: Role) {
        match role {
            Role::Reader => self.acquire_read(),
            Role::Writer => self.acquire_write(),
        }
    }

    fn release(&self, role: Role) {
        match role {
            Role::Reader => self.release_read(),
            Role::Writer => self.release_write(),
        }
    }
}

/// The "writer-preference" solution as it is classically handed out.
///
/// Despite the name there is no mechanism giving writers priority over
/// arriving readers: once a wave holds `resource`, new readers join it
/// freely, and a writer only gets in after `readcount` drops back to 0.
/// A steady stream of readers starves writers. This is kept on purpose.
pub struct WriterPreference {
    rmutex: Mutex<usize>,
    resource: Semaphore,
}

impl WriterPreference {
    pub fn new() -> Self {
        Self {
            rmutex: Mutex::new(0),
            resource: Semaphore::binary(),
        }
    }
}

impl Default for WriterPreference {
    fn default() -> Self {
        Self::new()
    }
}

impl RwProtocol for WriterPreference {
    fn acquire_read(&self) {
        let mut readcount = self.rmutex.lock();
        *readcount += 1;
        if *readcount == 1 {
            self.resource.wait();
        }
    }

    fn release_read(&self) {
        let mut readcount = self.rmutex.lock();
        *readcount -= 1;
        if *readcount == 0 {
            self.resource.post();
        }
    }

    fn acquire_write(&self) {
        self.resource.wait();
    }

    fn release_write(&self) {
        self.resource.post();
    }

    fn policy(&self) -> Policy {
        Policy::WriterPreference
    }

    fn readers(&self) -> usize {
        *self.rmutex.lock()
    }
}

/// FIFO-fair solution. Every request passes the single-slot service queue
/// before it can touch `resource`, so nobody overtakes a request that is
/// already past the gate.
pub struct Fair {
    rmutex: Mutex<usize>,
    resource: Semaphore,
    service_queue: TicketGate,
}

impl Fair {
    pub fn new() -> Self {
        Self {
            rmutex: Mutex::new(0),
            resource: Semaphore::binary(),
            service_queue: TicketGate::new(),
        }
    }
}

impl Default for Fair {
    fn default() -> Self {
        Self::new()
    }
}

impl RwProtocol for Fair {
    fn acquire_read(&self) {
        self.service_queue.enter();
        let mut readcount = self.rmutex.lock();
        *readcount += 1;
        if *readcount == 1 {
            self.resource.wait();
        }
        self.service_queue.leave();
        drop(readcount);
    }

    fn release_read(&self) {
        let mut readcount = self.rmutex.lock();
        *readcount -= 1;
        if *readcount == 0 {
            self.resource.post();
        }
    }

    fn acquire_write(&self) {
        self.service_queue.enter();
        self.resource.wait();
        // Only the hand-off needs the ticket, not the whole critical section.
        self.service_queue.leave();
    }

    fn release_write(&self) {
        self.resource.post();
    }

    fn policy(&self) -> Policy {
        Policy::Fair
    }

    fn readers(&self) -> usize {
        *self.rmutex.lock()
    }
}
