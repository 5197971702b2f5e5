//! Destination-keyed sink table
//!
//! Built once before the dispatcher pool starts. The map itself is never
//! mutated afterwards; each sink sits behind its own lock so appends to one
//! destination are serialized while different destinations proceed in
//! parallel.

use std::collections::HashMap;
use std::sync::Arc;

use contracts::{ByteSink, ContractError, EndpointId, RunBlueprint, SinkType};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::error::DispatcherError;
use crate::sinks::{FileSink, LogSink};

/// One sink behind its per-destination lock
pub type SharedSink = Arc<Mutex<Box<dyn ByteSink>>>;

#[derive(Default)]
pub struct SinkTable {
    sinks: HashMap<EndpointId, SharedSink>,
}

impl std::fmt::Debug for SinkTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinkTable")
            .field("destinations", &self.destinations())
            .finish()
    }
}

impl SinkTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open one sink per distinct destination of the blueprint
    #[instrument(
        name = "sink_table_from_blueprint",
        skip_all,
        fields(kind = ?blueprint.sinks.kind)
    )]
    pub fn from_blueprint(blueprint: &RunBlueprint) -> Result<Self, DispatcherError> {
        let mut table = Self::new();
        for destination in blueprint.destinations() {
            match blueprint.sinks.kind {
                SinkType::File => {
                    let sink = FileSink::open(&blueprint.sinks.output_dir, destination)
                        .map_err(|e| {
                            DispatcherError::sink_creation(
                                FileSink::file_name(destination),
                                e.to_string(),
                            )
                        })?;
                    table.insert(destination, sink);
                }
                SinkType::Log => table.insert(destination, LogSink::for_destination(destination)),
            }
        }
        info!(sinks = table.len(), "sink table ready");
        Ok(table)
    }

    /// Register the sink for `destination`, replacing any previous one
    pub fn insert(&mut self, destination: EndpointId, sink: impl ByteSink + 'static) {
        self.sinks
            .insert(destination, Arc::new(Mutex::new(Box::new(sink))));
    }

    pub fn get(&self, destination: EndpointId) -> Option<&SharedSink> {
        self.sinks.get(&destination)
    }

    pub fn contains(&self, destination: EndpointId) -> bool {
        self.sinks.contains_key(&destination)
    }

    /// Registered destinations, ascending
    pub fn destinations(&self) -> Vec<EndpointId> {
        let mut ids: Vec<_> = self.sinks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Append `payload` to the sink of `destination`
    ///
    /// Returns `Ok(false)` when no sink is registered for it.
    pub fn append(&self, destination: EndpointId, payload: &[u8]) -> Result<bool, ContractError> {
        match self.sinks.get(&destination) {
            Some(sink) => {
                sink.lock().append(payload)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Flush and close every sink, returning the first failure
    ///
    /// All sinks are attempted even if one fails.
    #[instrument(name = "sink_table_close_all", skip(self))]
    pub fn close_all(&self) -> Result<(), DispatcherError> {
        let mut first_error = None;
        for destination in self.destinations() {
            let Some(sink) = self.sinks.get(&destination) else {
                continue;
            };
            let mut sink = sink.lock();
            if let Err(e) = sink.flush().and_then(|()| sink.close()) {
                warn!(destination, sink = %sink.name(), error = %e, "failed to close sink");
                first_error.get_or_insert(DispatcherError::Sink {
                    destination,
                    source: e,
                });
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
