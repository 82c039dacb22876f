//! Progress notification: the external sink plus the event broadcast.
//!
//! Task snapshots are broadcast by the registry under its lock; this module
//! owns the channel for subscribers and non-task events, and calls the sink.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::broadcast;

use crate::error::BoxError;
use crate::types::{Event, TaskId};

/// External observer of task state changes
///
/// Called synchronously after every mutation of a task, with no registry
/// lock held, so implementations may read the current record back through
/// [`TaskManager::get`](crate::TaskManager::get). Errors and panics are
/// logged and never affect task state.
///
/// Closures of the form `Fn(&TaskId) -> Result<(), BoxError>` implement this
/// trait.
pub trait ProgressSink: Send + Sync {
    /// A task changed
    fn on_task_update(&self, id: &TaskId) -> Result<(), BoxError>;
}

impl<F> ProgressSink for F
where
    F: Fn(&TaskId) -> Result<(), BoxError> + Send + Sync,
{
    fn on_task_update(&self, id: &TaskId) -> Result<(), BoxError> {
        self(id)
    }
}

pub(crate) struct ProgressNotifier {
    sink: RwLock<Option<Arc<dyn ProgressSink>>>,
    event_tx: broadcast::Sender<Event>,
}

impl ProgressNotifier {
    pub(crate) fn new(event_tx: broadcast::Sender<Event>) -> Self {
        Self {
            sink: RwLock::new(None),
            event_tx,
        }
    }

    pub(crate) fn set_sink(&self, sink: Arc<dyn ProgressSink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub(crate) fn clear_sink(&self) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    #[cfg(test)]
    pub(crate) fn has_sink(&self) -> bool {
        self.sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Send an event to subscribers; having none is fine
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Tell the sink a task changed
    pub(crate) fn notify(&self, id: &TaskId) {
        // Clone out of the lock so a slow sink can't block set_sink
        let sink = self
            .sink
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(sink) = sink else {
            return;
        };

        match catch_unwind(AssertUnwindSafe(|| sink.on_task_update(id))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(task_id = %id, error = %e, "progress sink failed");
            }
            Err(panic) => {
                tracing::error!(
                    task_id = %id,
                    panic = %panic_message(panic.as_ref()),
                    "progress sink panicked"
                );
            }
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn notify_without_sink_or_subscribers_is_silent() {
        let (tx, _) = broadcast::channel(4);
        drop(tx.subscribe());
        let notifier = ProgressNotifier::new(tx);

        notifier.notify(&TaskId::new());
        assert!(!notifier.has_sink());
    }

    #[test]
    fn notify_calls_sink_with_task_id_only() {
        let (tx, _) = broadcast::channel(4);
        let notifier = ProgressNotifier::new(tx);
        let mut events = notifier.subscribe();

        let seen = Arc::new(Mutex::new(Vec::new()));
        notifier.set_sink(Arc::new({
            let seen = seen.clone();
            move |id: &TaskId| -> Result<(), BoxError> {
                seen.lock().unwrap().push(*id);
                Ok(())
            }
        }));

        let id = TaskId::new();
        notifier.notify(&id);

        assert_eq!(*seen.lock().unwrap(), vec![id]);
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn emit_reaches_every_subscriber() {
        let (tx, _) = broadcast::channel(4);
        let notifier = ProgressNotifier::new(tx);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();

        notifier.emit(Event::Shutdown);

        assert!(matches!(first.try_recv().unwrap(), Event::Shutdown));
        assert!(matches!(second.try_recv().unwrap(), Event::Shutdown));
    }

    #[test]
    fn failing_and_panicking_sinks_are_swallowed() {
        let (tx, _) = broadcast::channel(4);
        let notifier = ProgressNotifier::new(tx);

        notifier.set_sink(Arc::new(|_: &TaskId| -> Result<(), BoxError> {
            Err("socket closed".into())
        }));
        notifier.notify(&TaskId::new());

        notifier.set_sink(Arc::new(|_: &TaskId| -> Result<(), BoxError> {
            panic!("sink exploded")
        }));
        notifier.notify(&TaskId::new());
    }

    #[test]
    fn cleared_sink_is_no_longer_called() {
        let (tx, _) = broadcast::channel(4);
        let notifier = ProgressNotifier::new(tx);
        let calls = Arc::new(Mutex::new(0));

        notifier.set_sink(Arc::new({
            let calls = calls.clone();
            move |_: &TaskId| -> Result<(), BoxError> {
                *calls.lock().unwrap() += 1;
                Ok(())
            }
        }));
        notifier.notify(&TaskId::new());
        notifier.clear_sink();
        notifier.notify(&TaskId::new());

        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn panic_message_reads_str_and_string_payloads() {
        assert_eq!(panic_message(&"static"), "static");
        assert_eq!(panic_message(&String::from("owned")), "owned");
        assert_eq!(panic_message(&42_u8), "unknown panic payload");
    }
}
