//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::transport::Transport;
use crate::error::DeliveryError;

/// Records every call and answers from a script; once the script runs out it
/// falls back to `default_ok`.
pub(crate) struct FakeTransport {
    script: Mutex<VecDeque<Result<Vec<u8>, u16>>>,
    default_ok: bool,
    pub calls: Mutex<Vec<(String, Vec<u8>)>>,
}

impl FakeTransport {
    pub fn always_ok() -> Self {
        Self::scripted(Vec::new(), true)
    }

    pub fn always_failing() -> Self {
        Self::scripted(Vec::new(), false)
    }

    pub fn scripted(script: Vec<Result<Vec<u8>, u16>>, default_ok: bool) -> Self {
        Self {
            script: Mutex::new(script.into()),
            default_ok,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(p, _)| p.clone()).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post(&self, path: &str, body: Vec<u8>) -> Result<Vec<u8>, DeliveryError> {
        self.calls.lock().unwrap().push((path.to_string(), body));
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(resp)) => Ok(resp),
            Some(Err(status)) => Err(DeliveryError::BadStatus(status)),
            None if self.default_ok => Ok(b"{}".to_vec()),
            None => Err(DeliveryError::Transport("connection refused".into())),
        }
    }
}
