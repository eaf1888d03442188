//! Recording doubles for the outbound collaborators

use async_trait::async_trait;
use mediawatch_core::error::{Error, Result};
use mediawatch_core::Destination;
use mediawatch_dispatch::{ChatNotifier, ScanDispatcher};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct RecordingDispatcher {
    calls: Mutex<Vec<Destination>>,
    failing: HashSet<Destination>,
    panic_on_call: bool,
}

impl RecordingDispatcher {
    pub fn failing(destinations: impl IntoIterator<Item = Destination>) -> Self {
        Self {
            failing: destinations.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_call: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Destination> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ScanDispatcher for RecordingDispatcher {
    async fn request_scan(&self, destination: &Destination) -> Result<()> {
        if self.panic_on_call {
            panic!("dispatcher exploded");
        }
        self.calls.lock().unwrap().push(destination.clone());
        if self.failing.contains(destination) {
            return Err(Error::dispatch(format!("scan of {destination} refused")));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<String>>,
    attempts: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Messages that were accepted
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().unwrap().clone()
    }

    /// Text of every call, accepted or not
    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatNotifier for RecordingNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        self.attempts.lock().unwrap().push(text.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::notification("chat unavailable"));
        }
        self.delivered.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
