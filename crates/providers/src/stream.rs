//! The consumer side of an open stream.
//!
//! A backend reader task publishes [`StreamEvent`]s into a bounded channel in
//! receipt order; the caller drains them through a [`StreamHandle`]. Only one
//! event is handed out at a time, and nothing is handed out after the first
//! terminal event or after [`StreamHandle::close`].

use std::sync::Arc;

use futures::Stream;
use scenewright_core::error::StreamError;
use scenewright_core::stream::{StreamEvent, StreamState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Capacity of the event channel between reader task and consumer.
pub(crate) const EVENT_BUFFER: usize = 64;

/// Shared lifecycle cell. The reader task and the handle both hold it.
pub(crate) type StateCell = Arc<watch::Sender<StreamState>>;

pub(crate) fn state_cell(initial: StreamState) -> StateCell {
    Arc::new(watch::channel(initial).0)
}

/// Move to `next` unless the stream already reached a terminal state.
pub(crate) fn transition(cell: &StateCell, next: StreamState) {
    cell.send_if_modified(|state| {
        if state.is_terminal() || *state == next {
            return false;
        }
        *state = next;
        true
    });
}

/// Handle to one open stream.
pub struct StreamHandle {
    events: mpsc::Receiver<StreamEvent>,
    state: StateCell,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: JoinHandle<()>,
    finished: bool,
}

impl StreamHandle {
    pub(crate) fn new(
        events: mpsc::Receiver<StreamEvent>,
        state: StateCell,
        outbound: Option<mpsc::UnboundedSender<String>>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            state,
            outbound,
            task,
            finished: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> StreamState {
        *self.state.borrow()
    }

    /// Wait for the next event. Returns `None` once the stream has finished.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        if self.finished {
            return None;
        }
        let event = self.events.recv().await;
        match &event {
            Some(e) if e.is_terminal() => self.finished = true,
            None => self.finished = true,
            _ => {}
        }
        event
    }

    /// Send a JSON frame over the connection.
    ///
    /// Only socket streams accept outbound frames, and only until the stream
    /// is closed or errored.
    pub fn send(&self, frame: &serde_json::Value) -> Result<(), StreamError> {
        if self.finished || self.state().is_terminal() {
            return Err(StreamError::Closed);
        }
        let outbound = self.outbound.as_ref().ok_or(StreamError::Unsupported)?;
        outbound
            .send(frame.to_string())
            .map_err(|_| StreamError::Closed)
    }

    /// Abandon the stream: drop the connection and stop delivery.
    pub fn close(&mut self) {
        debug!("Closing stream on request");
        self.finished = true;
        transition(&self.state, StreamState::Closed);
        self.task.abort();
        self.events.close();
    }

    /// Drain the stream through callbacks.
    ///
    /// `on_delta` runs once per text fragment and `on_close` once when the
    /// backend ends the stream. Connection failures are logged and end the
    /// drive without `on_close`. Returns the final state.
    pub async fn drive<D, C>(mut self, mut on_delta: D, on_close: C) -> StreamState
    where
        D: FnMut(&str),
        C: FnOnce(),
    {
        let mut on_close = Some(on_close);
        while let Some(event) = self.next().await {
            match event {
                StreamEvent::Delta(text) => on_delta(&text),
                StreamEvent::Closed => {
                    if let Some(cb) = on_close.take() {
                        cb();
                    }
                }
                StreamEvent::Errored(reason) => {
                    error!(reason = %reason, "Stream failed");
                }
            }
        }
        self.state()
    }

    /// Convert into a `Stream` of events that ends after the terminal event.
    pub fn into_stream(self) -> impl Stream<Item = StreamEvent> + Send {
        futures::stream::unfold(self, |mut handle| async move {
            handle.next().await.map(|event| (event, handle))
        })
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A handle fed by a scripted task, plus the outbound frames it received.
    pub(crate) fn scripted(
        events: Vec<StreamEvent>,
        with_outbound: bool,
    ) -> (StreamHandle, Option<mpsc::UnboundedReceiver<String>>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let state = state_cell(StreamState::Open);
        let task_state = state.clone();
        let task = tokio::spawn(async move {
            for event in events {
                match &event {
                    StreamEvent::Closed => transition(&task_state, StreamState::Closed),
                    StreamEvent::Errored(_) => transition(&task_state, StreamState::Errored),
                    StreamEvent::Delta(_) => {}
                }
                if tx.send(event).await.is_err() {
                    return;
                }
            }
        });
        let (out_tx, out_rx) = if with_outbound {
            let (t, r) = mpsc::unbounded_channel();
            (Some(t), Some(r))
        } else {
            (None, None)
        };
        (StreamHandle::new(rx, state, out_tx, task), out_rx)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::scripted;
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn nothing_after_terminal_event() {
        let (mut handle, _) = scripted(
            vec![
                StreamEvent::Delta("a".into()),
                StreamEvent::Closed,
                StreamEvent::Delta("late".into()),
            ],
            false,
        );
        assert_eq!(handle.next().await, Some(StreamEvent::Delta("a".into())));
        assert_eq!(handle.next().await, Some(StreamEvent::Closed));
        assert_eq!(handle.next().await, None);
        assert_eq!(handle.state(), StreamState::Closed);
    }

    #[tokio::test]
    async fn drive_calls_on_close_once() {
        let (handle, _) = scripted(
            vec![
                StreamEvent::Delta("Hel".into()),
                StreamEvent::Delta("lo".into()),
                StreamEvent::Closed,
            ],
            false,
        );
        let mut text = String::new();
        let mut closes = 0;
        let state = handle
            .drive(|d| text.push_str(d), || closes += 1)
            .await;
        assert_eq!(text, "Hello");
        assert_eq!(closes, 1);
        assert_eq!(state, StreamState::Closed);
    }

    #[tokio::test]
    async fn drive_skips_on_close_when_errored() {
        let (handle, _) = scripted(vec![StreamEvent::Errored("refused".into())], false);
        let mut closes = 0;
        let state = handle.drive(|_| {}, || closes += 1).await;
        assert_eq!(closes, 0);
        assert_eq!(state, StreamState::Errored);
    }

    #[tokio::test]
    async fn close_stops_delivery() {
        let (mut handle, _) = scripted(vec![StreamEvent::Delta("a".into())], false);
        handle.close();
        assert_eq!(handle.state(), StreamState::Closed);
        assert_eq!(handle.next().await, None);
    }

    #[tokio::test]
    async fn send_requires_outbound_and_open_stream() {
        let (handle, _) = scripted(vec![], false);
        assert_eq!(
            handle.send(&serde_json::json!({"x": 1})),
            Err(StreamError::Unsupported)
        );

        let (mut handle, out) = scripted(vec![], true);
        let mut out = out.unwrap();
        handle.send(&serde_json::json!({"x": 1})).unwrap();
        assert_eq!(out.recv().await.as_deref(), Some(r#"{"x":1}"#));

        handle.close();
        assert_eq!(
            handle.send(&serde_json::json!({"x": 2})),
            Err(StreamError::Closed)
        );
    }

    #[tokio::test]
    async fn into_stream_ends_after_terminal() {
        let (handle, _) = scripted(
            vec![StreamEvent::Delta("x".into()), StreamEvent::Closed],
            false,
        );
        let events: Vec<StreamEvent> = handle.into_stream().collect().await;
        assert_eq!(events, vec![StreamEvent::Delta("x".into()), StreamEvent::Closed]);
    }

    #[test]
    fn terminal_state_is_sticky() {
        let cell = state_cell(StreamState::Connecting);
        transition(&cell, StreamState::Open);
        transition(&cell, StreamState::Errored);
        transition(&cell, StreamState::Closed);
        assert_eq!(*cell.borrow(), StreamState::Errored);
    }
}
