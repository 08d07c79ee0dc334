#![allow(dead_code)]

use cwlogs::cloud_providers::logs::{LogStreamInfo, LogsApi, LogsError, LogsResult};
use cwlogs::LogEvent;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

/// One PutLogEvents request as the service saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCall {
    pub group: String,
    pub stream: String,
    pub token: Option<String>,
    pub events: Vec<LogEvent>,
}

/// A scripted reaction to the next PutLogEvents call.
#[derive(Debug, Clone)]
pub enum PutScript {
    /// Store the batch but answer as if it had been accepted before
    AlreadyAccepted,
    /// Another writer moved the stream's token before this call arrives
    RotateToken(String),
    Fail(LogsError),
}

#[derive(Debug, Default)]
struct StreamState {
    token: Option<String>,
    events: Vec<LogEvent>,
}

#[derive(Default)]
struct State {
    groups: BTreeSet<String>,
    streams: BTreeMap<(String, String), StreamState>,
    next_token: u64,
    put_calls: Vec<PutCall>,
    put_script: VecDeque<PutScript>,
    create_group_calls: usize,
    create_stream_calls: usize,
    describe_groups_error: Option<LogsError>,
    create_stream_error: Option<LogsError>,
    concurrent_creator: bool,
}

impl State {
    fn issue_token(&mut self) -> String {
        self.next_token += 1;
        format!("token-{}", self.next_token)
    }
}

/// In-memory log service enforcing sequence tokens per stream.
#[derive(Clone, Default)]
pub struct FakeLogs {
    state: Arc<Mutex<State>>,
    put_gate: Arc<Mutex<Option<Arc<Semaphore>>>>,
}

impl FakeLogs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: &str) -> Self {
        self.state.lock().unwrap().groups.insert(group.to_string());
        self
    }

    pub fn with_stream(self, group: &str, stream: &str, token: Option<&str>) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.groups.insert(group.to_string());
            state.streams.insert(
                (group.to_string(), stream.to_string()),
                StreamState {
                    token: token.map(str::to_string),
                    events: Vec::new(),
                },
            );
        }
        self
    }

    /// Create calls answer ResourceAlreadyExists after creating, as if a
    /// concurrent writer won the race.
    pub fn with_concurrent_creator(self) -> Self {
        self.state.lock().unwrap().concurrent_creator = true;
        self
    }

    pub fn fail_describe_groups(&self, err: LogsError) {
        self.state.lock().unwrap().describe_groups_error = Some(err);
    }

    pub fn fail_create_stream(&self, err: LogsError) {
        self.state.lock().unwrap().create_stream_error = Some(err);
    }

    pub fn script(&self, script: PutScript) {
        self.state.lock().unwrap().put_script.push_back(script);
    }

    /// Holds every PutLogEvents call until the returned semaphore gets permits.
    pub fn gate_puts(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.put_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    pub fn put_calls(&self) -> Vec<PutCall> {
        self.state.lock().unwrap().put_calls.clone()
    }

    pub fn stored_events(&self, group: &str, stream: &str) -> Vec<LogEvent> {
        self.state
            .lock()
            .unwrap()
            .streams
            .get(&(group.to_string(), stream.to_string()))
            .map(|s| s.events.clone())
            .unwrap_or_default()
    }

    pub fn stream_token(&self, group: &str, stream: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .streams
            .get(&(group.to_string(), stream.to_string()))
            .and_then(|s| s.token.clone())
    }

    pub fn has_stream(&self, group: &str, stream: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .streams
            .contains_key(&(group.to_string(), stream.to_string()))
    }

    pub fn create_group_calls(&self) -> usize {
        self.state.lock().unwrap().create_group_calls
    }

    pub fn create_stream_calls(&self) -> usize {
        self.state.lock().unwrap().create_stream_calls
    }
}

impl LogsApi for FakeLogs {
    async fn describe_log_groups(&self, name_prefix: &str) -> LogsResult<Vec<String>> {
        let state = self.state.lock().unwrap();
        if let Some(err) = &state.describe_groups_error {
            return Err(err.clone());
        }
        Ok(state
            .groups
            .iter()
            .filter(|name| name.starts_with(name_prefix))
            .cloned()
            .collect())
    }

    async fn create_log_group(&self, group_name: &str) -> LogsResult<()> {
        let mut state = self.state.lock().unwrap();
        state.create_group_calls += 1;
        let created = state.groups.insert(group_name.to_string());
        if !created || state.concurrent_creator {
            return Err(LogsError::ResourceAlreadyExists(group_name.to_string()));
        }
        Ok(())
    }

    async fn describe_log_streams(
        &self,
        group_name: &str,
        name_prefix: &str,
    ) -> LogsResult<Vec<LogStreamInfo>> {
        let state = self.state.lock().unwrap();
        if !state.groups.contains(group_name) {
            return Err(LogsError::service(
                "DescribeLogStreams",
                "ResourceNotFoundException",
            ));
        }
        Ok(state
            .streams
            .iter()
            .filter(|((group, stream), _)| group == group_name && stream.starts_with(name_prefix))
            .map(|((_, stream), info)| LogStreamInfo {
                name: stream.clone(),
                upload_sequence_token: info.token.clone(),
            })
            .collect())
    }

    async fn create_log_stream(&self, group_name: &str, stream_name: &str) -> LogsResult<()> {
        let mut state = self.state.lock().unwrap();
        state.create_stream_calls += 1;
        if let Some(err) = &state.create_stream_error {
            return Err(err.clone());
        }
        let key = (group_name.to_string(), stream_name.to_string());
        if state.streams.contains_key(&key) {
            return Err(LogsError::ResourceAlreadyExists(stream_name.to_string()));
        }
        state.streams.insert(key, StreamState::default());
        if state.concurrent_creator {
            return Err(LogsError::ResourceAlreadyExists(stream_name.to_string()));
        }
        Ok(())
    }

    async fn put_log_events(
        &self,
        group_name: &str,
        stream_name: &str,
        events: &[LogEvent],
        sequence_token: Option<&str>,
    ) -> LogsResult<Option<String>> {
        let call = PutCall {
            group: group_name.to_string(),
            stream: stream_name.to_string(),
            token: sequence_token.map(str::to_string),
            events: events.to_vec(),
        };
        self.state.lock().unwrap().put_calls.push(call);

        let gate = self.put_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }

        let mut state = self.state.lock().unwrap();
        let script = state.put_script.pop_front();
        let key = (group_name.to_string(), stream_name.to_string());

        match script {
            Some(PutScript::Fail(err)) => return Err(err),
            Some(PutScript::RotateToken(token)) => {
                if let Some(stream) = state.streams.get_mut(&key) {
                    stream.token = Some(token);
                }
            }
            Some(PutScript::AlreadyAccepted) => {
                let token = state.issue_token();
                let stream = state.streams.get_mut(&key).unwrap();
                stream.events.extend_from_slice(events);
                stream.token = Some(token.clone());
                return Err(LogsError::DataAlreadyAccepted {
                    expected_token: Some(token),
                });
            }
            None => {}
        }

        let token = state.issue_token();
        let Some(stream) = state.streams.get_mut(&key) else {
            return Err(LogsError::service("PutLogEvents", "ResourceNotFoundException"));
        };
        if stream.token.as_deref() != sequence_token {
            return Err(LogsError::InvalidSequenceToken {
                expected_token: stream.token.clone(),
            });
        }
        stream.events.extend_from_slice(events);
        stream.token = Some(token.clone());
        Ok(Some(token))
    }
}

pub fn timestamps(events: &[LogEvent]) -> Vec<i64> {
    events.iter().map(|event| event.timestamp).collect()
}
