//! Bounded fan-out of chunks onto row-processing workers.
//!
//! The dispatch loop takes a slot from an [`AdmissionGate`] before handing
//! each chunk to the worker pool, so at most `pool_size` tasks are ever in
//! flight. A slot is released when its [`Permit`] drops, which also happens
//! when a task fails or panics. Once the input ends the loop waits on the
//! gate until the last task has finished.

use anyhow::{anyhow, Error, Result};
use crossbeam_channel::{bounded, Receiver};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;

/// Counting gate limiting the number of concurrently active tasks
#[derive(Debug)]
pub struct AdmissionGate {
    capacity: usize,
    in_flight: Mutex<usize>,
    changed: Condvar,
}

impl AdmissionGate {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            in_flight: Mutex::new(0),
            changed: Condvar::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, usize> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a slot is free, then take it
    pub fn acquire(&self) -> Permit<'_> {
        let mut in_flight = self.lock();
        while *in_flight >= self.capacity {
            in_flight = self
                .changed
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
        *in_flight += 1;
        Permit { gate: self }
    }

    pub fn in_flight(&self) -> usize {
        *self.lock()
    }

    /// Block until every permit has been released
    pub fn wait_idle(&self) {
        let mut in_flight = self.lock();
        while *in_flight > 0 {
            in_flight = self
                .changed
                .wait(in_flight)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn release(&self) {
        let mut in_flight = self.lock();
        *in_flight -= 1;
        drop(in_flight);
        self.changed.notify_all();
    }
}

/// An occupied gate slot, released on drop
#[derive(Debug)]
pub struct Permit<'a> {
    gate: &'a AdmissionGate,
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.gate.release();
    }
}

/// Runs one task per item on a fixed pool, never more than `pool_size` at once
#[derive(Debug, Clone)]
pub struct Dispatcher {
    pool_size: usize,
}

impl Dispatcher {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size: pool_size.max(1),
        }
    }

    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Run `task` for every item received until the channel closes.
    ///
    /// Stops admitting new items after the first failure and returns that
    /// failure once all in-flight tasks are done. On success returns the
    /// number of tasks run.
    pub fn run<T, F>(&self, items: Receiver<T>, task: F) -> Result<usize>
    where
        T: Send,
        F: Fn(T) -> Result<()> + Sync,
    {
        let gate = AdmissionGate::new(self.pool_size);
        let failure: Mutex<Option<Error>> = Mutex::new(None);
        let mut dispatched = 0usize;

        thread::scope(|scope| {
            let (work_sender, work_receiver) = bounded::<(T, Permit<'_>)>(self.pool_size);

            for worker_id in 0..self.pool_size {
                let work_receiver = work_receiver.clone();
                let task = &task;
                let failure = &failure;
                scope.spawn(move || worker_thread(worker_id, work_receiver, task, failure));
            }
            drop(work_receiver);

            for item in items.iter() {
                let permit = gate.acquire();
                if has_failed(&failure) {
                    break;
                }
                if work_sender.send((item, permit)).is_err() {
                    break;
                }
                dispatched += 1;
            }

            gate.wait_idle();
            drop(work_sender);
        });

        match failure.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(error) => Err(error),
            None => Ok(dispatched),
        }
    }
}

fn has_failed(failure: &Mutex<Option<Error>>) -> bool {
    failure
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

fn record_failure(failure: &Mutex<Option<Error>>, error: Error) {
    let mut slot = failure.lock().unwrap_or_else(PoisonError::into_inner);
    // Keep the first failure; later ones are usually fallout from it
    if slot.is_none() {
        *slot = Some(error);
    }
}

fn worker_thread<T, F>(
    worker_id: usize,
    work_receiver: Receiver<(T, Permit<'_>)>,
    task: &F,
    failure: &Mutex<Option<Error>>,
) where
    F: Fn(T) -> Result<()> + Sync,
{
    for (item, _permit) in work_receiver.iter() {
        if has_failed(failure) {
            continue;
        }
        let error = match panic::catch_unwind(AssertUnwindSafe(|| task(item))) {
            Ok(Ok(())) => continue,
            Ok(Err(error)) => error,
            Err(payload) => anyhow!(
                "row processing task on worker {} panicked: {}",
                worker_id,
                panic_message(payload.as_ref())
            ),
        };
        record_failure(failure, error);
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
