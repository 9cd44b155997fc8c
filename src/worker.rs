use std::time::Instant;

use tracing::debug;

use crate::{
    delay::Delay,
    lock::RwProtocol,
    log::{EventLog, Phase},
    wait::ThreadWaitRecord,
    Region, Result, Role,
};

/// One reader or writer: `k` rounds of request, critical section, exit and
/// remainder section. Returns the waits it observed.
pub fn worker<L, D>(
    role: Role,
    id: usize,
    k: usize,
    lock: &L,
    log: &EventLog,
    delay: &mut D,
) -> Result<ThreadWaitRecord>
where
    L: RwProtocol + ?Sized,
    D: Delay,
{
    let mut record = ThreadWaitRecord::new(role, id);

    for i in 1..=k {
        let requested = Instant::now();
        log.record(i, role, Phase::Request, id)?;

        lock.acquire(role);
        record.push(requested.elapsed());
        let entered = log.record(i, role, Phase::Entry, id);
        if entered.is_ok() {
            delay.sleep(Region::In);
        }
        let exited = entered.and_then(|_| log.record(i, role, Phase::Exit, id));
        // Hand the resource back even if the log failed, or everyone else hangs.
        lock.release(role);
        exited?;

        delay.sleep(Region::Out);
    }

    debug!(%role, id, average = ?record.average(), "worker done");
    Ok(record)
}
