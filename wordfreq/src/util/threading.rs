//! Utility code for running a batch of blocking work items on dedicated threads, where each item
//! can be told to stop early, can report an error, and produces a single final result.
//!
//! The basic pattern here is to use crossbeam channels in two ways:
//! - A bounded(1) channel of type `()` is used to signal to the thread that it should stop its
//!   work.
//! - A bounded(1) channel of type `Result<T>` carries the final result (or failure) of the work
//!   back to whoever started it.
//!
//! # Thread Workers
//!
//! The bit of work that needs to happen in another thread is generalized into the concept of a
//! "thread worker".  Not much is assumed about this work, other than that it's blocking (no async
//! runtime is provided), it's fallible, and it produces one final output.
//!
//! A [`WorkerPool`] starts any number of thread workers of the same type and then blocks until
//! all of them are done.  If any of them fails, the others are told to stop, so that one bad
//! worker fails the whole batch as quickly as possible.

use crate::error::{WorkerFailedSnafu, WorkerPanickedSnafu, WorkerSpawnSnafu};
use crate::Result;
use crossbeam::channel::{bounded, Receiver, Select, Sender};
use snafu::ResultExt;
use std::thread::{self, JoinHandle};
use tracing::*;

/// Create a stop signal sender/receiver pair for a thread worker.
pub(crate) fn new_stop_signal(worker: &str) -> (StopSignalSender, StopSignalReceiver) {
    // Need a bound of 1 here.
    // A bound of 0 means the send will block (or fail for non-blocking sends) if the worker is not
    // actively at this very moment blocking on a stop signal.  In almost all cases the worker does
    // work besides waiting for a stop signal, so this isn't what we want.
    // A bound of > 1 doesn't make sense either, because a worker is expected to receive the stop
    // signal and stop immediately.  If the channel is already full with a stop signal, then we
    // simply log the fact that a stop is already signaled.
    let (sender, receiver) = bounded(1);
    (
        StopSignalSender {
            sender,
            worker: worker.to_owned(),
        },
        StopSignalReceiver {
            receiver,
            worker: worker.to_owned(),
        },
    )
}

/// Send a stop signal to a spawned thread worker.
///
/// Note that this also works as a drop guard; if this sender (and all of its clones) are dropped,
/// then that is equivalent to sending the stop signal.
#[derive(Clone, Debug)]
pub(crate) struct StopSignalSender {
    sender: Sender<()>,
    worker: String,
}

impl StopSignalSender {
    /// Signal to whatever worker is on the other end of this sender that it should stop what it is
    /// doing.
    ///
    /// If the worker has already stopped, or was already told to stop, this does nothing (but it
    /// does log the fact that this happened).
    ///
    /// This method is never blocking regardless of the state of the worker.
    pub(crate) fn signal_stop(&self) {
        match self.sender.try_send(()) {
            Ok(()) => trace!(worker = %self.worker, "Stop signal sent to worker"),
            Err(crossbeam::channel::TrySendError::Disconnected(_)) => {
                debug!(worker = %self.worker, "Stop signal was not sent because the worker has dropped the receiver (and therefore is probably already stopped)");
            }
            Err(crossbeam::channel::TrySendError::Full(_)) => {
                debug!(worker = %self.worker, "Stop signal was not sent to worker because another stop signal was already sent");
            }
        }
    }
}

/// Receives a stop signal sent by some caller to a thread worker.
///
/// Note that this considers a stop signal to be *either* a [`StopSignalSender`] sending an
/// explicit signal by calling [`StopSignalSender::signal_stop`], *or* if all associated
/// [`StopSignalSender`] senders have been dropped, meaning no stop signal will ever be sent.
#[derive(Clone, Debug)]
pub(crate) struct StopSignalReceiver {
    receiver: Receiver<()>,
    worker: String,
}

impl StopSignalReceiver {
    /// Check if a stop signal has been received, without blocking.
    ///
    /// Returns `true` either when the stop signal has been received, or when all senders have been
    /// dropped.
    pub(crate) fn is_stop_signaled(&self) -> bool {
        match self.receiver.try_recv() {
            Ok(()) => {
                debug!(worker = %self.worker, "Stop signal received");
                true
            }
            Err(crossbeam::channel::TryRecvError::Disconnected) => {
                debug!(
                    worker = %self.worker,
                    "All stop signal senders have been dropped; treating this as a stop signal"
                );
                true
            }
            Err(crossbeam::channel::TryRecvError::Empty) => {
                // No stop signal received, and at least one sender is still active.
                false
            }
        }
    }
}

/// Create a final output sender/receiver pair for a thread worker.
fn new_final_output_channel<T>(worker: &str) -> (FinalOutputSender<T>, FinalOutputReceiver<T>) {
    // The worker should be able to send the final result and exit, even if the receiver is not yet
    // ready to receive it.  That's why the bound is 1.
    let (sender, receiver) = bounded(1);
    (
        FinalOutputSender {
            sender,
            worker: worker.to_owned(),
        },
        FinalOutputReceiver { receiver },
    )
}

#[derive(Debug)]
pub(crate) struct FinalOutputSender<T> {
    sender: Sender<Result<T>>,
    worker: String,
}

impl<T> FinalOutputSender<T>
where
    T: Send + 'static,
{
    /// Send the final output from the worker to the receiver
    ///
    /// This will not block because the channel bound is 1 and there can only ever be one output
    /// sender.
    ///
    /// If the receiver has been dropped, then it's not possible to send the final output.
    /// The output is returned in the error case so the caller can handle it if needed.
    pub(crate) fn send(self, output: Result<T>) -> Result<(), Result<T>> {
        match self.sender.send(output) {
            Ok(()) => Ok(()),
            Err(crossbeam::channel::SendError(output)) => {
                debug!(
                    worker = %self.worker,
                    "Final output was not sent because receiver was dropped"
                );
                Err(output)
            }
        }
    }
}

/// The receiving end of a worker's final output.
///
/// There's no `recv` method; receiving is done by [`WorkerPool::join_all`] with a
/// [`crossbeam::channel::Select`] across all workers at once.  If the sender is dropped without
/// sending anything, the worker thread died before finishing, which in practice means it
/// panicked.
#[derive(Debug)]
pub(crate) struct FinalOutputReceiver<T> {
    receiver: Receiver<Result<T>>,
}

/// Trait implemented by a type that will actually perform some work in a thread.
///
/// By definition this must be `Send` obviously.
pub(crate) trait ThreadWorker: Send + 'static {
    /// The type that is produced when the work is done.
    ///
    /// Note that all thread workers are assumed to be fallible, so whatever type is specified
    /// here *is* wrapped in `Result`.
    type FinalOutput: Send + 'static;

    /// The name of this worker instance, used as the thread name and in the logs.  It doesn't
    /// have any semantic meaning.
    fn worker_name(&self) -> String;

    /// Run whatever the task is.
    ///
    /// The implementation can do anything, but it should poll the stop signal from time to time,
    /// and if a stop is signaled return as soon as possible.
    fn run(self, stop_signal: StopSignalReceiver) -> Result<Self::FinalOutput>;
}

/// Everything the caller needs to interact with one running thread worker.
#[derive(Debug)]
pub(crate) struct ThreadWorkerHandle<T> {
    name: String,
    stop_signal: StopSignalSender,
    final_output: FinalOutputReceiver<T>,
    join_handle: JoinHandle<()>,
}

/// Launch a new thread and run a given thread worker in that thread.
///
/// The returned handle holds the stop signal sender, the final output receiver, and the OS thread
/// handle.
pub(crate) fn start_thread_worker<W: ThreadWorker>(
    worker: W,
) -> Result<ThreadWorkerHandle<W::FinalOutput>> {
    let name = worker.worker_name();
    let (stop_sender, stop_receiver) = new_stop_signal(&name);
    let (final_output_sender, final_output_receiver) = new_final_output_channel(&name);

    let current_span = Span::current();
    let join_handle = thread::Builder::new()
        .name(name.clone())
        .spawn({
            let name = name.clone();
            move || {
                // Propagate the span from the caller into this thread too
                let span = debug_span!(parent: &current_span, "thread_worker", worker = %name);
                let _guard = span.enter();
                debug!("Starting worker thread");

                match worker.run(stop_receiver) {
                    Err(e) => {
                        error!(error = %e, "Worker failed");
                        let _ = final_output_sender.send(Err(e));
                    }
                    Ok(output) => {
                        debug!("Worker completed successfully");
                        let _ = final_output_sender.send(Ok(output));
                    }
                }

                debug!("Worker thread exiting");
            }
        })
        .with_context(|_| WorkerSpawnSnafu {
            worker: name.clone(),
        })?;

    Ok(ThreadWorkerHandle {
        name,
        stop_signal: stop_sender,
        final_output: final_output_receiver,
        join_handle,
    })
}

/// A fixed set of thread workers started together and joined together.
///
/// A pool lives only as long as one batch of work; nothing about it is global.
pub(crate) struct WorkerPool<T> {
    workers: Vec<ThreadWorkerHandle<T>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Start one thread per worker.
    ///
    /// If any thread fails to start, the ones that did start are stopped and joined before the
    /// error is returned.
    pub(crate) fn start<W, I>(workers: I) -> Result<Self>
    where
        W: ThreadWorker<FinalOutput = T>,
        I: IntoIterator<Item = W>,
    {
        let mut pool = Self {
            workers: Vec::new(),
        };

        for worker in workers {
            match start_thread_worker(worker) {
                Ok(handle) => pool.workers.push(handle),
                Err(e) => {
                    pool.stop_all();
                    pool.join_threads();
                    return Err(e);
                }
            }
        }

        debug!(workers = pool.workers.len(), "Started worker pool");

        Ok(pool)
    }

    pub(crate) fn len(&self) -> usize {
        self.workers.len()
    }

    /// Tell every worker to stop
    fn stop_all(&self) {
        for worker in &self.workers {
            worker.stop_signal.signal_stop();
        }
    }

    /// Wait for every OS thread in the pool to exit
    fn join_threads(self) {
        for worker in self.workers {
            if worker.join_handle.join().is_err() {
                warn!(worker = %worker.name, "Worker thread panicked");
            }
        }
    }

    /// Block until every worker has finished, returning their outputs in the order the workers
    /// were started.
    ///
    /// Outputs are received in whatever order the workers happen to finish.  As soon as one
    /// worker fails (or dies without producing output), all remaining workers are told to stop.
    /// Either way this only returns after all threads have exited, and the error returned is the
    /// first failure that was observed.
    pub(crate) fn join_all(self) -> Result<Vec<T>> {
        let count = self.workers.len();
        let mut outputs: Vec<Option<T>> = (0..count).map(|_| None).collect();
        let mut finished = vec![false; count];
        let mut failure = None;

        for _ in 0..count {
            let (slot, outcome) = {
                let live: Vec<(usize, &Receiver<Result<T>>)> = self
                    .workers
                    .iter()
                    .enumerate()
                    .filter(|(slot, _)| !finished[*slot])
                    .map(|(slot, worker)| (slot, &worker.final_output.receiver))
                    .collect();

                let mut select = Select::new();
                for (_, receiver) in &live {
                    select.recv(receiver);
                }

                let operation = select.select();
                let (slot, receiver) = live[operation.index()];
                (slot, operation.recv(receiver))
            };
            finished[slot] = true;

            let worker = &self.workers[slot];
            let result: Result<()> = match outcome {
                Ok(Ok(output)) => {
                    outputs[slot] = Some(output);
                    continue;
                }
                Ok(Err(e)) => Err(e).context(WorkerFailedSnafu {
                    worker: worker.name.clone(),
                }),
                Err(crossbeam::channel::RecvError) => WorkerPanickedSnafu {
                    worker: worker.name.clone(),
                }
                .fail(),
            };

            if failure.is_none() {
                debug!(worker = %worker.name, "Worker failed; stopping all other workers");
                self.stop_all();
                failure = result.err();
            }
        }

        self.join_threads();

        match failure {
            Some(e) => Err(e),
            None => Ok(outputs.into_iter().flatten().collect()),
        }
    }
}
