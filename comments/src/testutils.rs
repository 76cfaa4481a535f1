use crate::store::{GraphqlRequest, GraphqlTransport, RemoteOutcome};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// In-memory transport that records every request and always gives the same answer.
pub struct FakeTransport {
    reply: RemoteOutcome,
    requests: Mutex<Vec<GraphqlRequest>>,
}

impl FakeTransport {
    pub fn replying(reply: RemoteOutcome) -> Arc<Self> {
        Arc::new(FakeTransport {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<GraphqlRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl GraphqlTransport for FakeTransport {
    async fn execute(&self, request: &GraphqlRequest) -> RemoteOutcome {
        self.requests.lock().unwrap().push(request.clone());
        self.reply.clone()
    }
}
