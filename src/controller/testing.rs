//! Mock transport for testing
//!
//! Returns queued results and records every request it receives.

use crate::transport::{CompletionRequest, CompletionResult, CompletionTransport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock transport that returns queued results
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<CompletionResult, TransportError>>>,
    /// Record of all requests made
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a completion result
    pub fn queue_result(&self, result: CompletionResult) {
        self.responses.lock().unwrap().push_back(Ok(result));
    }

    /// Queue a transport error
    pub fn queue_error(&self, error: TransportError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionTransport for MockTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::new("No mock response queued")))
    }
}
