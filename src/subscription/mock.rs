//! Mock company API for testing.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::CompanyApi;
use crate::error::{PortalError, Result};
use crate::models::CompanyRecord;

#[derive(Debug, Clone)]
enum Reply {
    Record(Option<CompanyRecord>),
    Status(u16),
}

/// Mock company API that serves a fixed record and records every call.
pub struct MockCompanyApi {
    reply: Mutex<Reply>,
    calls: Mutex<Vec<(String, String)>>,
    gate: Option<Arc<Notify>>,
}

impl MockCompanyApi {
    pub fn new(record: Option<CompanyRecord>) -> Self {
        Self {
            reply: Mutex::new(Reply::Record(record)),
            calls: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every call until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn set_record(&self, record: Option<CompanyRecord>) {
        *self.reply.lock().unwrap_or_else(|e| e.into_inner()) = Reply::Record(record);
    }

    /// Answer subsequent calls with an HTTP error status.
    pub fn fail_with(&self, status: u16) {
        *self.reply.lock().unwrap_or_else(|e| e.into_inner()) = Reply::Status(status);
    }

    /// `(token, company_id)` of every call, oldest first
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl CompanyApi for MockCompanyApi {
    async fn fetch_company(&self, token: &str, company_id: &str) -> Result<Option<CompanyRecord>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((token.to_string(), company_id.to_string()));

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let reply = self.reply.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match reply {
            Reply::Record(record) => Ok(record),
            Reply::Status(status @ (401 | 403)) => Err(PortalError::Unauthorized { status }),
            Reply::Status(status) => Err(PortalError::Server {
                status,
                message: "mock failure".to_string(),
            }),
        }
    }
}
