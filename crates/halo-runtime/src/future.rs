//! Handles to task results.

use crossbeam_channel::{Receiver, Sender};
use halo_core::TaskError;

/// The eventual result of a task launch.
///
/// Backed by a one-shot channel: the executor sends exactly one value.
/// Launches currently complete before [`ColorContext::execute`] returns,
/// so the future is ready on creation, but callers should not rely on it.
///
/// [`ColorContext::execute`]: crate::ColorContext::execute
#[derive(Debug)]
pub struct TaskFuture<R> {
    task: String,
    rx: Receiver<R>,
    value: Option<R>,
}

impl<R> TaskFuture<R> {
    /// Create a pending future and the sender that completes it.
    pub fn pending(task: impl Into<String>) -> (Sender<R>, Self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let future = Self {
            task: task.into(),
            rx,
            value: None,
        };
        (tx, future)
    }

    /// Name of the launched task.
    pub fn task(&self) -> &str {
        &self.task
    }

    /// Whether the result is available without blocking.
    pub fn is_ready(&self) -> bool {
        self.value.is_some() || !self.rx.is_empty()
    }

    /// Block until the result is available.
    ///
    /// Fails if the executor dropped the sender without completing.
    pub fn wait(&mut self) -> Result<(), TaskError> {
        if self.value.is_none() {
            let value = self.rx.recv().map_err(|_| TaskError::Failed {
                task: self.task.clone(),
                reason: "result channel closed before completion".into(),
            })?;
            self.value = Some(value);
        }
        Ok(())
    }

    /// Block until the result is available and take it.
    pub fn get(mut self) -> Result<R, TaskError> {
        self.wait()?;
        self.value.take().ok_or_else(|| TaskError::Failed {
            task: self.task.clone(),
            reason: "result already taken".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn completes_across_threads() {
        let (tx, mut future) = TaskFuture::pending("sum");
        assert!(!future.is_ready());
        let handle = thread::spawn(move || tx.send(41 + 1).unwrap());
        future.wait().unwrap();
        assert!(future.is_ready());
        handle.join().unwrap();
        assert_eq!(future.get().unwrap(), 42);
    }

    #[test]
    fn dropped_sender_is_a_task_error() {
        let (tx, future) = TaskFuture::<u8>::pending("lost");
        drop(tx);
        let err = future.get().unwrap_err();
        assert!(matches!(err, TaskError::Failed { ref task, .. } if task == "lost"));
    }
}
