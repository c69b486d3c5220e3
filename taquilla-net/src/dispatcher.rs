use crate::transport::{SearchTransport, TransportError};
use std::sync::Arc;
use taquilla_core::{SearchRequest, SearchResponse};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

/// A finished transport call, matched back to the request that produced it.
/// Failures travel as values; a failed call never cancels its siblings.
#[derive(Debug)]
pub struct CorrelatedResult {
    pub correlation_id: Uuid,
    pub request: SearchRequest,
    pub outcome: Result<SearchResponse, TransportError>,
}

/// Fans requests out over the transport, one task each, and hands results
/// back on a single stream so one consumer can process them sequentially.
pub struct RequestDispatcher {
    transport: Arc<dyn SearchTransport>,
}

impl RequestDispatcher {
    pub fn new(transport: Arc<dyn SearchTransport>) -> Self {
        Self { transport }
    }

    /// Fire every request on its own task. Results arrive on the returned
    /// stream in completion order, not submission order; the stream ends
    /// once every request has produced exactly one result.
    pub fn dispatch(
        &self,
        requests: Vec<(Uuid, SearchRequest)>,
    ) -> ReceiverStream<CorrelatedResult> {
        let (tx, rx) = mpsc::channel(requests.len().max(1));
        for (correlation_id, request) in requests {
            let transport = Arc::clone(&self.transport);
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = transport.send(&request).await;
                if let Err(err) = &outcome {
                    tracing::warn!(%correlation_id, error = %err, "dispatched request failed");
                }
                // A dropped receiver just means nobody is waiting anymore.
                let _ = tx
                    .send(CorrelatedResult {
                        correlation_id,
                        request,
                        outcome,
                    })
                    .await;
            });
        }
        ReceiverStream::new(rx)
    }
}
