use std::sync::{Arc, Mutex};

use crate::error::Result;

/// Free-form inference result, as a JSON object.
pub type ResultBody = serde_json::Map<String, serde_json::Value>;

/// Accepts results that a consumer produced from frames.
pub trait ResultsSink {
    fn send(&mut self, result: &ResultBody) -> Result<()>;
}

impl<S: ResultsSink + ?Sized> ResultsSink for Box<S> {
    fn send(&mut self, result: &ResultBody) -> Result<()> {
        (**self).send(result)
    }
}

/// A sink shared between the threads of a server.
pub type SharedSink = Arc<Mutex<dyn ResultsSink + Send>>;

/// Wrap a sink for sharing.
pub fn shared_sink<S: ResultsSink + Send + 'static>(sink: S) -> SharedSink {
    Arc::new(Mutex::new(sink))
}

/// Keeps every result in memory. Clones share the same store, so a test can
/// hand one clone to a server and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    results: Arc<Mutex<Vec<ResultBody>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the results received so far.
    pub fn received(&self) -> Vec<ResultBody> {
        match self.results.lock() {
            Ok(results) => results.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.received().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResultsSink for MemorySink {
    fn send(&mut self, result: &ResultBody) -> Result<()> {
        self.results.lock()?.push(result.clone());
        Ok(())
    }
}
