use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Reason a single pair produced no value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Connection failure, non-success status or a body that is not JSON
    Transport,
    /// JSON body without the expected `data.result[0].value[1]`
    Shape,
    /// Query did not settle within the configured timeout
    Timeout,
    /// The query task itself faulted
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Transport => "transport",
            ErrorKind::Shape => "shape",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transport" => Ok(ErrorKind::Transport),
            "shape" => Ok(ErrorKind::Shape),
            "timeout" => Ok(ErrorKind::Timeout),
            "internal" => Ok(ErrorKind::Internal),
            other => Err(ParseError::UnknownFailure(other.to_string())),
        }
    }
}

/// Failure of a single metrics query, with the detail kept for diagnostics
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response shape: {0}")]
    Shape(String),

    #[error("query timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("query task failed: {0}")]
    Internal(String),
}

impl QueryError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueryError::Transport(_) => ErrorKind::Transport,
            QueryError::Shape(_) => ErrorKind::Shape,
            QueryError::Timeout(_) => ErrorKind::Timeout,
            QueryError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn transport<S: Into<String>>(msg: S) -> Self {
        QueryError::Transport(msg.into())
    }

    pub(crate) fn shape<S: Into<String>>(msg: S) -> Self {
        QueryError::Shape(msg.into())
    }
}

/// Errors decoding a snapshot log line
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("missing ': ' separator between timestamp and values")]
    MissingSeparator,

    #[error("invalid timestamp '{0}'")]
    Timestamp(String),

    #[error("values must be enclosed in [ ]")]
    MissingBrackets,

    #[error("invalid value '{0}'")]
    Value(String),

    #[error("unknown failure marker '{0}'")]
    UnknownFailure(String),
}

/// Prefix marking a failed entry in the text encoding
pub const FAILED_MARKER: &str = "failed:";

/// Outcome of one (address, kind) query
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricSample {
    Value(f64),
    Failed(ErrorKind),
}

impl MetricSample {
    pub fn value(&self) -> Option<f64> {
        match self {
            MetricSample::Value(v) => Some(*v),
            MetricSample::Failed(_) => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, MetricSample::Failed(_))
    }
}

impl From<Result<f64, QueryError>> for MetricSample {
    fn from(result: Result<f64, QueryError>) -> Self {
        match result {
            Ok(value) => MetricSample::Value(value),
            Err(e) => MetricSample::Failed(e.kind()),
        }
    }
}

impl fmt::Display for MetricSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // f64 Display is the shortest representation that parses back exactly
            MetricSample::Value(v) => write!(f, "{}", v),
            MetricSample::Failed(kind) => write!(f, "{}{}", FAILED_MARKER, kind),
        }
    }
}

impl FromStr for MetricSample {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(kind) = s.strip_prefix(FAILED_MARKER) {
            return Ok(MetricSample::Failed(kind.parse()?));
        }
        s.parse::<f64>()
            .map(MetricSample::Value)
            .map_err(|_| ParseError::Value(s.to_string()))
    }
}

/// Position of a pair in the round vector
pub fn pair_index(address_index: usize, kind_index: usize, kind_count: usize) -> usize {
    address_index * kind_count + kind_index
}

/// Fixed-shape result of one sampling round, ordered address-major
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingRoundResult {
    samples: Vec<MetricSample>,
}

impl SamplingRoundResult {
    pub fn new(samples: Vec<MetricSample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[MetricSample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Option<&MetricSample> {
        self.samples.get(index)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn failed_count(&self) -> usize {
        self.samples.iter().filter(|s| s.is_failed()).count()
    }

    /// True when every pair produced a value
    pub fn is_complete(&self) -> bool {
        self.failed_count() == 0
    }

    /// Indices and reasons of failed pairs
    pub fn failures(&self) -> impl Iterator<Item = (usize, ErrorKind)> + '_ {
        self.samples.iter().enumerate().filter_map(|(i, s)| match s {
            MetricSample::Failed(kind) => Some((i, *kind)),
            MetricSample::Value(_) => None,
        })
    }
}

impl fmt::Display for SamplingRoundResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, sample) in self.samples.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", sample)?;
        }
        f.write_str("]")
    }
}

impl FromStr for SamplingRoundResult {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or(ParseError::MissingBrackets)?;

        if inner.trim().is_empty() {
            return Ok(Self::new(Vec::new()));
        }

        let samples = inner
            .split(',')
            .map(MetricSample::from_str)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(samples))
    }
}

/// Timestamped record of one completed round
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    timestamp: DateTime<Utc>,
    round: SamplingRoundResult,
}

impl Snapshot {
    /// Timestamps are kept at millisecond precision so the text form is lossless
    pub fn new(timestamp: DateTime<Utc>, round: SamplingRoundResult) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(3),
            round,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn round(&self) -> &SamplingRoundResult {
        &self.round
    }

    /// Encode as `<rfc3339>: [v0, v1, ...]`, without trailing newline
    pub fn to_line(&self) -> String {
        format!(
            "{}: {}",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.round
        )
    }

    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let (ts, values) = line
            .trim_end()
            .split_once(": ")
            .ok_or(ParseError::MissingSeparator)?;

        let timestamp = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| ParseError::Timestamp(ts.to_string()))?
            .with_timezone(&Utc);

        Ok(Self::new(timestamp, values.parse()?))
    }
}
