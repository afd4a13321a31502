//! Test utilities for the dispatch crate.
//!
//! This module provides shared helpers for both unit tests (in `src/`) and
//! integration tests (in `tests/`). It is only compiled when running tests or
//! with the `test-support` feature.

pub mod connections {
    //! In-memory client connections that record what they are sent.

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::domain::ports::{ClientConnection, ConnectionWriteError, OutboundFrame};

    #[derive(Default)]
    struct RecorderState {
        texts: Vec<String>,
        closed: Option<Option<String>>,
        broken: bool,
    }

    /// Shared view of everything written to one [`RecordingConnection`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dispatch::test_support::connections::Recorder;
    ///
    /// let recorder = Recorder::default();
    /// let _connection = recorder.connection();
    /// assert!(recorder.messages().is_empty());
    /// ```
    #[derive(Clone, Default)]
    pub struct Recorder {
        state: Arc<Mutex<RecorderState>>,
    }

    impl Recorder {
        /// A connection whose writes land in this recorder.
        pub fn connection(&self) -> Box<dyn ClientConnection> {
            Box::new(RecordingConnection {
                recorder: self.clone(),
            })
        }

        /// Make every later write fail as if the peer had gone away.
        pub fn break_connection(&self) {
            if let Ok(mut state) = self.state.lock() {
                state.broken = true;
            }
        }

        /// Text frames received so far, decoded as JSON.
        pub fn messages(&self) -> Vec<Value> {
            self.state
                .lock()
                .map(|state| {
                    state
                        .texts
                        .iter()
                        .filter_map(|text| serde_json::from_str(text).ok())
                        .collect()
                })
                .unwrap_or_default()
        }

        /// Messages of one `type`.
        pub fn messages_of(&self, kind: &str) -> Vec<Value> {
            self.messages()
                .into_iter()
                .filter(|message| message["type"] == kind)
                .collect()
        }

        /// Close reason, if the connection was closed.
        pub fn close_reason(&self) -> Option<Option<String>> {
            self.state
                .lock()
                .ok()
                .and_then(|state| state.closed.clone())
        }
    }

    /// Client connection backed by a [`Recorder`].
    pub struct RecordingConnection {
        recorder: Recorder,
    }

    #[async_trait]
    impl ClientConnection for RecordingConnection {
        async fn send(&mut self, frame: OutboundFrame) -> Result<(), ConnectionWriteError> {
            let mut state = self
                .recorder
                .state
                .lock()
                .map_err(|_| ConnectionWriteError::closed())?;
            if state.broken || state.closed.is_some() {
                return Err(ConnectionWriteError::closed());
            }
            if let OutboundFrame::Text(text) = frame {
                state.texts.push(text);
            }
            Ok(())
        }

        async fn close(&mut self, reason: Option<String>) {
            if let Ok(mut state) = self.recorder.state.lock() {
                state.closed = Some(reason);
            }
        }
    }
}
