//! API responses and ordered batches of them.

use genie_core::fanout::{Collector, SettledBatch};
use genie_core::poll::{ReadyBatch, Readiness, check_once, gather_ready};
use genie_core::{Error, OutputRef, OutputStore, Result, Table};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::TRACING_TARGET;

/// Maximum number of nested `data` envelopes unwrapped by [`TaskResponse::data`].
const MAX_DATA_NESTING: usize = 2;

/// Status reported for tasks that were queued rather than run.
const STATUS_SCHEDULED: &str = "scheduled";

/// Raw response for a single task.
///
/// The API answers with `{"response": {"task_1": {...}}}`; the accessors
/// read from that envelope and return `None` for anything absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskResponse {
    raw: Value,
}

impl TaskResponse {
    /// Wraps a raw JSON response.
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// Returns the raw JSON.
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Consumes the response and returns the raw JSON.
    pub fn into_raw(self) -> Value {
        self.raw
    }

    fn task_1(&self) -> Option<&Map<String, Value>> {
        self.raw.get("response")?.get("task_1")?.as_object()
    }

    /// Returns an attribute of the `task_1` envelope.
    pub fn response_attr(&self, attr: &str) -> Option<&Value> {
        self.task_1()?.get(attr)
    }

    /// Returns an attribute of the task metadata.
    pub fn task_attr(&self, attr: &str) -> Option<&Value> {
        self.task_1()?.get("task")?.get(attr)
    }

    /// Returns the status at the time of the call.
    ///
    /// The status of a scheduled task does not change once its output is
    /// written; check the output file instead.
    pub fn status(&self) -> Option<&str> {
        self.response_attr("status")?.as_str()
    }

    /// Returns the data returned with the response, unwrapping up to two
    /// nested `data` envelopes. `None` for scheduled tasks.
    pub fn data(&self) -> Option<&Value> {
        let mut data = self.response_attr("data")?;
        for _ in 0..MAX_DATA_NESTING {
            match data.get("data") {
                Some(inner) if data.is_object() => data = inner,
                _ => break,
            }
        }

        (!data.is_null()).then_some(data)
    }

    /// Returns the file the task writes its output to.
    pub fn output_file(&self) -> Option<OutputRef> {
        self.task_attr("output_file")?
            .as_str()
            .filter(|path| !path.is_empty())
            .map(OutputRef::from_legacy_path)
    }

    /// Returns when the task started.
    pub fn start_time(&self) -> Option<Timestamp> {
        match self.task_attr("start_time")? {
            Value::Number(seconds) => {
                let millis = seconds.as_f64()? * 1000.0;
                Timestamp::from_millisecond(millis as i64).ok()
            }
            Value::String(text) => text.parse().ok(),
            _ => None,
        }
    }

    /// Returns the error reported by the API, if any.
    pub fn error(&self) -> Option<String> {
        let error = self
            .raw
            .get("error")
            .or_else(|| self.response_attr("error"))?;

        match error {
            Value::Null => None,
            Value::String(message) => Some(message.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Returns true if the task was queued and its output will appear later.
    pub fn is_scheduled(&self) -> bool {
        match self.status() {
            Some(status) => status.eq_ignore_ascii_case(STATUS_SCHEDULED),
            None => self.data().is_none() && self.output_file().is_some(),
        }
    }

    /// Returns the output: the data carried by the response, or else the
    /// contents of the output file if it exists yet.
    pub async fn output<S>(&self, store: &S) -> Result<Option<Value>>
    where
        S: OutputStore + ?Sized,
    {
        if let Some(data) = self.data() {
            return Ok(Some(data.clone()));
        }

        self.read_output_data(store).await
    }

    /// Reads the output file, returning `None` while it does not exist.
    pub async fn read_output_data<S>(&self, store: &S) -> Result<Option<Value>>
    where
        S: OutputStore + ?Sized,
    {
        let Some(output) = self.output_file() else {
            return Ok(None);
        };

        match check_once(store, &output).await? {
            Readiness::Ready(data) => Ok(Some(parse_output(&output, &data)?)),
            Readiness::NotReady => {
                tracing::warn!(
                    target: TRACING_TARGET,
                    output = %output,
                    "Output does not exist yet"
                );
                Ok(None)
            }
        }
    }
}

impl From<Value> for TaskResponse {
    fn from(raw: Value) -> Self {
        Self::new(raw)
    }
}

/// Parses output bytes as JSON.
///
/// The API store hands back CSV outputs already decoded to JSON, while raw
/// storage returns the file itself. CSV outputs that are not JSON are read
/// as a table and returned as records with string cells.
pub(crate) fn parse_output(output: &OutputRef, data: &[u8]) -> Result<Value> {
    let error = match serde_json::from_slice(data) {
        Ok(value) => return Ok(value),
        Err(error) => error,
    };

    if output.format().is_some_and(|format| format.eq_ignore_ascii_case("csv")) {
        let table = Table::from_csv(data).map_err(|error| {
            error.with_message(format!("output {output} is not valid CSV"))
        })?;
        return Ok(table.to_records());
    }

    Err(Error::serialization()
        .with_message(format!("output {output} is not valid JSON"))
        .with_source(error))
}

/// Responses for a batch of tasks, in the order the tasks were submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseBatch {
    responses: Vec<TaskResponse>,
}

impl ResponseBatch {
    /// Creates a batch.
    pub fn new(responses: Vec<TaskResponse>) -> Self {
        Self { responses }
    }

    /// Returns the number of responses.
    pub fn len(&self) -> usize {
        self.responses.len()
    }

    /// Returns true if the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    /// Returns the response at `index`.
    pub fn get(&self, index: usize) -> Option<&TaskResponse> {
        self.responses.get(index)
    }

    /// Iterates over the responses.
    pub fn iter(&self) -> std::slice::Iter<'_, TaskResponse> {
        self.responses.iter()
    }

    /// Appends a response.
    pub fn push(&mut self, response: TaskResponse) {
        self.responses.push(response);
    }

    /// Returns the output file of every response, aligned with the batch.
    pub fn output_refs(&self) -> Vec<Option<OutputRef>> {
        self.responses.iter().map(TaskResponse::output_file).collect()
    }

    /// Reads every output file concurrently, one outcome per response.
    pub async fn read_output_data<S>(&self, store: &S) -> SettledBatch<Option<Value>, Error>
    where
        S: OutputStore + ?Sized,
    {
        Collector::new()
            .with_name("read_output_data")
            .collect_settled(self.responses.iter().map(|r| r.read_output_data(store)))
            .await
    }

    /// Returns every output, concurrently reading the output file of the
    /// responses that carry no data. Missing outputs are `null`.
    ///
    /// With `concat`, missing outputs are dropped and the rest are merged by
    /// [`concat_outputs`](Self::concat_outputs).
    pub async fn outputs<S>(&self, store: &S, concat: bool) -> Result<Value>
    where
        S: OutputStore + ?Sized,
    {
        let outputs = Collector::new()
            .with_name("outputs")
            .collect(self.responses.iter().map(|r| r.output(store)))
            .await?;

        if concat {
            Ok(Self::concat_outputs(outputs.into_iter().flatten()))
        } else {
            Ok(Value::Array(
                outputs.into_iter().map(Option::unwrap_or_default).collect(),
            ))
        }
    }

    /// Merges outputs: lists are flattened into one list, objects are merged
    /// key-wise (flattening per key when every value is a list), and anything
    /// else is returned as a list of the outputs.
    pub fn concat_outputs(outputs: impl IntoIterator<Item = Value>) -> Value {
        let outputs: Vec<Value> = outputs.into_iter().filter(|v| !v.is_null()).collect();

        if outputs.iter().all(Value::is_array) {
            let flat = outputs
                .into_iter()
                .filter_map(|v| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .flatten()
                .collect();
            return Value::Array(flat);
        }

        if outputs.iter().all(Value::is_object) {
            let mut grouped: Map<String, Value> = Map::new();
            let objects: Vec<Map<String, Value>> = outputs
                .into_iter()
                .filter_map(|v| match v {
                    Value::Object(fields) => Some(fields),
                    _ => None,
                })
                .collect();

            let mut keys: Vec<&String> = objects.iter().flat_map(|o| o.keys()).collect();
            keys.sort();
            keys.dedup();

            for key in keys {
                let values: Vec<Value> = objects
                    .iter()
                    .map(|o| o.get(key).cloned().unwrap_or_default())
                    .collect();
                grouped.insert(key.clone(), Self::concat_outputs_for_key(values));
            }

            return Value::Object(grouped);
        }

        Value::Array(outputs)
    }

    fn concat_outputs_for_key(values: Vec<Value>) -> Value {
        if values.iter().all(Value::is_array) {
            Self::concat_outputs(values)
        } else {
            Value::Array(values)
        }
    }

    /// Checks every output file once and splits the batch into ready and
    /// missing outputs. Responses without an output file are skipped.
    pub async fn split_ready<S>(&self, store: &S) -> Result<ReadyBatch<Value>>
    where
        S: OutputStore + ?Sized,
    {
        let outputs = self.output_refs().into_iter().flatten();
        gather_ready(store, outputs, |output, data| parse_output(output, &data)).await
    }
}

impl From<Vec<TaskResponse>> for ResponseBatch {
    fn from(responses: Vec<TaskResponse>) -> Self {
        Self::new(responses)
    }
}

impl FromIterator<TaskResponse> for ResponseBatch {
    fn from_iter<I: IntoIterator<Item = TaskResponse>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl Extend<TaskResponse> for ResponseBatch {
    fn extend<I: IntoIterator<Item = TaskResponse>>(&mut self, iter: I) {
        self.responses.extend(iter);
    }
}

impl IntoIterator for ResponseBatch {
    type IntoIter = std::vec::IntoIter<TaskResponse>;
    type Item = TaskResponse;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResponseBatch {
    type IntoIter = std::slice::Iter<'a, TaskResponse>;
    type Item = &'a TaskResponse;

    fn into_iter(self) -> Self::IntoIter {
        self.responses.iter()
    }
}
