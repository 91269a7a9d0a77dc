use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::bidding::dispatcher::{HttpDispatcher, HttpRequest, HttpResponse};
use crate::errors::DispatchError;

/// Scripted dispatcher: answers with queued outcomes and records every request.
#[derive(Default)]
pub struct MockDispatcher {
    outcomes: Mutex<VecDeque<Result<HttpResponse, DispatchError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn responding(status_code: u16, body: &str) -> Self {
        let dispatcher = Self::new();
        dispatcher.push_response(status_code, body);
        dispatcher
    }

    pub fn failing(error: DispatchError) -> Self {
        let dispatcher = Self::new();
        dispatcher.push(Err(error));
        dispatcher
    }

    pub fn push_response(&self, status_code: u16, body: &str) {
        self.push(Ok(HttpResponse {
            status_code,
            body: body.to_string(),
        }));
    }

    pub fn push(&self, outcome: Result<HttpResponse, DispatchError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpDispatcher for MockDispatcher {
    async fn dispatch(&self, request: HttpRequest) -> Result<HttpResponse, DispatchError> {
        self.requests.lock().unwrap().push(request);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DispatchError::Transport("no scripted response".to_string())))
    }
}
