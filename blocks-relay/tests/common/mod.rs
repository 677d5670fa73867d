// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blocks_common::checkpoint::CheckpointStore;
use blocks_common::record::BlockRecord;
use blocks_relay::app_context::AppContext;
use blocks_relay::error::{DeliveryError, SourceError};
use blocks_relay::notifier::Notifier;
use blocks_relay::scheduler::Scheduler;
use blocks_relay::source::RecordSource;
use reqwest::StatusCode;

pub fn block(created: i64, email: &str) -> BlockRecord {
    BlockRecord {
        created,
        email: email.to_owned(),
        reason: "550 5.1.1 mailbox does not exist".to_owned(),
        status: "5.1.1".to_owned(),
    }
}

pub fn decode_error() -> SourceError {
    SourceError::from(serde_json::from_str::<Vec<BlockRecord>>("<html>").unwrap_err())
}

/// A record source serving a fixed data set.
///
/// `backed_by` filters on `created >= start_time` like the real report does, `returning` hands
/// back everything regardless of the query. Queued failures are returned first, one per fetch.
#[derive(Default)]
pub struct FakeSource {
    records: Mutex<Vec<BlockRecord>>,
    filter: bool,
    failures: Mutex<VecDeque<SourceError>>,
    queries: Mutex<Vec<i64>>,
    verify_status: Option<StatusCode>,
}

impl FakeSource {
    pub fn backed_by(records: Vec<BlockRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            filter: true,
            ..Default::default()
        }
    }

    pub fn returning(records: Vec<BlockRecord>) -> Self {
        Self {
            records: Mutex::new(records),
            filter: false,
            ..Default::default()
        }
    }

    pub fn rejecting_credentials(status: StatusCode) -> Self {
        Self {
            verify_status: Some(status),
            ..Default::default()
        }
    }

    pub fn push_record(&self, record: BlockRecord) {
        self.records.lock().unwrap().push(record);
    }

    pub fn fail_next(&self, error: SourceError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Every `start_time` we were asked for, in order.
    pub fn queries(&self) -> Vec<i64> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSource for FakeSource {
    async fn fetch_since(&self, timestamp: i64) -> Result<Vec<BlockRecord>, SourceError> {
        self.queries.lock().unwrap().push(timestamp);

        if let Some(error) = self.failures.lock().unwrap().pop_front() {
            return Err(error);
        }

        let records = self.records.lock().unwrap();
        Ok(records
            .iter()
            .filter(|record| !self.filter || record.created >= timestamp)
            .cloned()
            .collect())
    }

    async fn verify(&self) -> Result<(), SourceError> {
        match self.verify_status {
            Some(status) => Err(SourceError::Auth(status)),
            None => Ok(()),
        }
    }
}

/// A notifier that remembers what it sent, and rejects messages about some addresses.
#[derive(Default)]
pub struct FakeNotifier {
    messages: Mutex<Vec<String>>,
    failing: Vec<String>,
    verify_status: Option<StatusCode>,
}

impl FakeNotifier {
    pub fn failing_for(emails: &[&str]) -> Self {
        Self {
            failing: emails.iter().map(|email| email.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn rejecting_credentials(status: StatusCode) -> Self {
        Self {
            verify_status: Some(status),
            ..Default::default()
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    /// Messages that mention `email`.
    pub fn sent_for(&self, email: &str) -> usize {
        let needle = format!("Email: {}\n", email);
        self.messages()
            .iter()
            .filter(|message| message.contains(&needle))
            .count()
    }
}

#[async_trait]
impl Notifier for FakeNotifier {
    async fn send_message(&self, content: &str) -> Result<(), DeliveryError> {
        let rejected = self
            .failing
            .iter()
            .any(|email| content.contains(&format!("Email: {}\n", email)));
        if rejected {
            return Err(DeliveryError::Rejected {
                status: StatusCode::INTERNAL_SERVER_ERROR,
            });
        }

        self.messages.lock().unwrap().push(content.to_owned());
        Ok(())
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        match self.verify_status {
            Some(status) => Err(DeliveryError::Rejected { status }),
            None => Ok(()),
        }
    }
}

/// A scheduler that ticks immediately, a fixed number of times.
pub struct FixedTicks {
    remaining: usize,
}

impl FixedTicks {
    pub fn new(ticks: usize) -> Self {
        Self { remaining: ticks }
    }
}

#[async_trait]
impl Scheduler for FixedTicks {
    async fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

pub fn context<S, N, C>(source: S, notifier: N, store: C) -> AppContext
where
    S: RecordSource + 'static,
    N: Notifier + 'static,
    C: CheckpointStore + 'static,
{
    AppContext::new(
        Box::new(source),
        Box::new(notifier),
        Box::new(store),
        Duration::from_secs(60),
        false,
    )
}

pub fn shared<T>(value: T) -> Arc<T> {
    Arc::new(value)
}
