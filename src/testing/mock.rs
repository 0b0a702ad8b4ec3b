//! Mock objects and fake implementations for testing
//!
//! [`MockTransport`] replays queued responses in order and records every request
//! it receives. [`MockIdentitySource`] stands in for a platform identifier source.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{IdentityError, TransportError};
use crate::hwid::{HwidSource, IdentitySource};
use crate::transport::{ApiRequest, ApiResponse, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Transport that answers from a queue of scripted outcomes
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response with a JSON body
    pub fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, &body.to_string());
    }

    /// Queue a response with an arbitrary body
    pub fn push_raw(&self, status: u16, body: &str) {
        lock(&self.responses).push_back(Ok(ApiResponse::new(status, body)));
    }

    /// Queue a transport failure
    pub fn push_error(&self, error: TransportError) {
        lock(&self.responses).push_back(Err(error));
    }

    /// Every request sent so far, oldest first
    #[must_use]
    pub fn requests(&self) -> Vec<ApiRequest> {
        lock(&self.requests).clone()
    }

    #[must_use]
    pub fn last_request(&self) -> Option<ApiRequest> {
        lock(&self.requests).last().cloned()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Queued outcomes not yet consumed
    #[must_use]
    pub fn pending(&self) -> usize {
        lock(&self.responses).len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        lock(&self.requests).push(request);
        lock(&self.responses).pop_front().unwrap_or_else(|| {
            Err(TransportError::Connect(
                "mock transport has no queued response".to_string(),
            ))
        })
    }
}

/// Identity source returning a fixed value or a fixed failure
#[derive(Debug)]
pub struct MockIdentitySource {
    kind: HwidSource,
    value: Option<String>,
    reads: Arc<AtomicUsize>,
}

impl MockIdentitySource {
    #[must_use]
    pub fn available(kind: HwidSource, value: &str) -> Self {
        Self {
            kind,
            value: Some(value.to_string()),
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[must_use]
    pub fn unavailable(kind: HwidSource) -> Self {
        Self {
            kind,
            value: None,
            reads: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of `read` calls, usable after the source is boxed
    #[must_use]
    pub fn read_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

impl IdentitySource for MockIdentitySource {
    fn kind(&self) -> HwidSource {
        self.kind
    }

    fn name(&self) -> &'static str {
        match self.kind {
            HwidSource::SystemUuid => "mock system UUID",
            HwidSource::ProcessorId => "mock processor ID",
            HwidSource::Unknown => "mock source",
        }
    }

    fn read(&self) -> Result<String, IdentityError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.value.clone().ok_or(IdentityError::Unavailable {
            source_name: self.name(),
            reason: "not exposed on this machine".to_string(),
        })
    }
}
