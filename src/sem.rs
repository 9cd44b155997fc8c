//! Blocking primitives the reader/writer protocols are assembled from.

use parking_lot::{Condvar, Mutex};

/// Counting semaphore. Unlike a mutex, any thread may `post`, which is what
/// lets the last reader of a wave hand the resource back.
pub struct Semaphore {
    permits: Mutex<usize>,
    cv: Condvar,
}

impl Semaphore {
    pub fn new(permits: usize) -> Self {
        Self {
            permits: Mutex::new(permits),
            cv: Condvar::new(),
        }
    }

    /// Binary semaphore, initially free.
    pub fn binary() -> Self {
        Self::new(1)
    }

    /// P: blocks until a permit is available, then takes it.
    pub fn wait(&self) {
        let mut permits = self.permits.lock();
        while *permits == 0 {
            self.cv.wait(&mut permits);
        }
        *permits -= 1;
    }

    /// V
    pub fn post(&self) {
        let mut permits = self.permits.lock();
        *permits += 1;
        self.cv.notify_one();
    }

    #[cfg(test)]
    pub(crate) fn try_wait(&self) -> bool {
        let mut permits = self.permits.lock();
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    #[cfg(test)]
    pub(crate) fn available(&self) -> usize {
        *self.permits.lock()
    }
}

#[derive(Debug, Default)]
struct Tickets {
    next: u64,
    serving: u64,
}

/// Single-slot service queue. Callers are admitted strictly in the order
/// they called `enter`, which a plain semaphore does not promise.
pub struct TicketGate {
    tickets: Mutex<Tickets>,
    cv: Condvar,
}

impl TicketGate {
    pub fn new() -> Self {
        Self {
            tickets: Mutex::new(Tickets::default()),
            cv: Condvar::new(),
        }
    }

    pub fn enter(&self) {
        let mut t = self.tickets.lock();
        let mine = t.next;
        t.next += 1;
        while t.serving != mine {
            self.cv.wait(&mut t);
        }
    }

    pub fn leave(&self) {
        let mut t = self.tickets.lock();
        t.serving += 1;
        // Every waiter checks its own ticket, so wake them all.
        self.cv.notify_all();
    }

    /// Tickets handed out so far, including the one currently served.
    #[cfg(test)]
    pub(crate) fn issued(&self) -> u64 {
        self.tickets.lock().next
    }
}

impl Default for TicketGate {
    fn default() -> Self {
        Self::new()
    }
}
