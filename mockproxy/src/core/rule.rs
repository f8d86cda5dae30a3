//! Per-route behaviour and its evaluation

use axum::body::Body;
use axum::http::{Response, StatusCode};
use std::fmt;
use tokio::sync::Mutex;

use super::chance::ErrorChance;
use super::delay::DelayPolicy;
use super::fault::SimulatedFault;
use super::mock::MockResponse;
use super::periodic::PeriodicFailure;
use shared::{ConfigResult, EndpointConfig};

/// Status used for chance errors without a configured status
pub const CHANCE_ERROR_STATUS: StatusCode = StatusCode::INTERNAL_SERVER_ERROR;

/// Status used for periodic errors without a configured status
pub const PERIODIC_ERROR_STATUS: StatusCode = StatusCode::BAD_REQUEST;

/// What to do with one request
#[derive(Debug, Clone, PartialEq)]
pub enum Disposition {
    /// Hand the request to the upstream
    Forward,

    /// Answer with the configured mock
    Mock(MockResponse),

    /// Answer with the error response because a simulated fault fired
    Error {
        fault: SimulatedFault,
        response: MockResponse,
        default_status: StatusCode,
    },
}

impl Disposition {
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Forward => "forward",
            Disposition::Mock(_) => "mock",
            Disposition::Error { .. } => "error",
        }
    }

    /// The response to write, or `None` when the request must be forwarded
    pub fn into_response(self) -> Option<Response<Body>> {
        match self {
            Disposition::Forward => None,
            Disposition::Mock(mock) => Some(mock.render(StatusCode::OK)),
            Disposition::Error {
                response,
                default_status,
                ..
            } => Some(response.render(default_status)),
        }
    }
}

/// Structured view of a rule's error block
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ErrorSummary {
    pub chance: Option<ErrorChance>,
    /// `(nth, amount)`
    pub every: Option<(u32, u32)>,
    pub has_response: bool,
}

impl fmt::Display for ErrorSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chance {
            Some(chance) => write!(f, "chance: {chance}")?,
            None => write!(f, "chance: <nil>")?,
        }
        match self.every {
            Some((nth, amount)) => write!(f, ", every: {amount} times on the {nth}nth")?,
            None => write!(f, ", every: <nil>")?,
        }
        if self.has_response {
            write!(f, ", response: <set>")
        } else {
            write!(f, ", response: <nil>")
        }
    }
}

/// All behaviour bound to one route path
///
/// The periodic counter sits behind the rule's own lock. The lock is held for
/// the whole delay, chance, periodic, mock sequence, so concurrent requests to
/// the same route are evaluated one at a time. Other routes are unaffected.
#[derive(Debug)]
pub struct EndpointRule {
    delay: Option<DelayPolicy>,
    mock: Option<MockResponse>,
    chance: Option<ErrorChance>,
    error_response: Option<MockResponse>,
    every: Mutex<Option<PeriodicFailure>>,
    summary: ErrorSummary,
}

impl EndpointRule {
    pub fn from_config(endpoint: &str, config: &EndpointConfig) -> ConfigResult<Self> {
        let delay = config
            .delay
            .map(|range| DelayPolicy::new(endpoint, range.lower, range.upper))
            .transpose()?;

        let mock = config
            .response
            .as_ref()
            .map(|response| MockResponse::from_config(endpoint, response))
            .transpose()?;

        let (chance, every, error_response) = match &config.error {
            Some(error) => (
                error.chance.map(ErrorChance::new).transpose()?,
                error
                    .every
                    .map(|every| PeriodicFailure::new(endpoint, every.nth, every.amount))
                    .transpose()?,
                error
                    .response
                    .as_ref()
                    .map(|response| MockResponse::from_config(endpoint, response))
                    .transpose()?,
            ),
            None => (None, None, None),
        };

        let summary = ErrorSummary {
            chance,
            every: every.as_ref().map(|e| (e.nth(), e.amount())),
            has_response: error_response.is_some(),
        };

        Ok(Self {
            delay,
            mock,
            chance,
            error_response,
            every: Mutex::new(every),
            summary,
        })
    }

    pub fn error_summary(&self) -> ErrorSummary {
        self.summary
    }

    /// Decide the disposition for one request
    ///
    /// Order: delay, error chance, periodic error, mock, forward.
    pub async fn evaluate(&self) -> Disposition {
        let mut every = self.every.lock().await;

        if let Some(delay) = &self.delay {
            delay.apply().await;
        }

        if let Some(Err(fault)) = self.chance.map(|chance| chance.roll()) {
            return self.error(fault, CHANCE_ERROR_STATUS);
        }

        if let Some(Err(fault)) = every.as_mut().map(PeriodicFailure::tick) {
            return self.error(fault, PERIODIC_ERROR_STATUS);
        }

        match &self.mock {
            Some(mock) => Disposition::Mock(mock.clone()),
            None => Disposition::Forward,
        }
    }

    fn error(&self, fault: SimulatedFault, default_status: StatusCode) -> Disposition {
        Disposition::Error {
            fault,
            response: self.error_response.clone().unwrap_or_default(),
            default_status,
        }
    }
}

impl fmt::Display for EndpointRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.delay {
            Some(delay) => write!(f, "delay: {delay}")?,
            None => write!(f, "delay: <nil>")?,
        }
        write!(
            f,
            ", mock: {}, error: [{}]",
            if self.mock.is_some() { "<set>" } else { "<nil>" },
            self.summary
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::parse_endpoints;
    use std::time::Duration;

    fn rule(yaml: &str) -> EndpointRule {
        let table = parse_endpoints(yaml).unwrap();
        let (path, config) = table.iter().next().unwrap();
        EndpointRule::from_config(path, config).unwrap()
    }

    #[tokio::test]
    async fn test_empty_rule_always_forwards() {
        let rule = rule("/plain: {}\n");
        for _ in 0..10 {
            assert_eq!(rule.evaluate().await, Disposition::Forward);
        }
    }

    #[tokio::test]
    async fn test_error_beats_mock() {
        let rule = rule(
            "/both:\n  response:\n    body: mocked\n  error:\n    chance: 1.0\n",
        );
        for _ in 0..20 {
            let disposition = rule.evaluate().await;
            assert_eq!(disposition.label(), "error");
            let response = disposition.into_response().unwrap();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[tokio::test]
    async fn test_mock_without_errors() {
        let rule = rule("/mock:\n  response:\n    status: 201\n    body: made\n");
        let disposition = rule.evaluate().await;
        assert!(matches!(disposition, Disposition::Mock(_)));
        let response = disposition.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_periodic_error_defaults_to_bad_request() {
        let rule = rule("/every:\n  error:\n    every:\n      nth: 2\n      amount: 1\n");
        assert_eq!(rule.evaluate().await, Disposition::Forward);

        let disposition = rule.evaluate().await;
        match &disposition {
            Disposition::Error { fault, default_status, .. } => {
                assert_eq!(*default_status, StatusCode::BAD_REQUEST);
                assert_eq!(
                    *fault,
                    SimulatedFault::Periodic { nth: 2, amount: 1, counter: 2 }
                );
            }
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(
            disposition.into_response().unwrap().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(rule.evaluate().await, Disposition::Forward);
    }

    #[tokio::test]
    async fn test_periodic_uses_configured_error_status() {
        let rule = rule(
            "/every:\n  error:\n    every:\n      nth: 1\n    response:\n      status: 503\n",
        );
        let response = rule.evaluate().await.into_response().unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_chance_fault_does_not_advance_counter() {
        // chance fires first, so the periodic check never runs
        let rule = rule(
            "/both:\n  error:\n    chance: 1.0\n    every:\n      nth: 1\n",
        );
        for _ in 0..5 {
            match rule.evaluate().await {
                Disposition::Error { fault, .. } => assert_eq!(fault.kind(), "chance"),
                other => panic!("expected error, got {other:?}"),
            }
        }
        assert_eq!(rule.every.lock().await.as_ref().unwrap().counter(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_applies_before_decision() {
        let rule = rule("/slow:\n  delay: [\"50ms\", \"50ms\"]\n");
        let start = tokio::time::Instant::now();
        assert_eq!(rule.evaluate().await, Disposition::Forward);
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_concurrent_requests_share_counter() {
        let rule = std::sync::Arc::new(rule(
            "/every:\n  error:\n    every:\n      nth: 3\n      amount: 2\n",
        ));
        let mut handles = Vec::new();
        for _ in 0..40 {
            let rule = rule.clone();
            handles.push(tokio::spawn(async move { rule.evaluate().await }));
        }
        let mut errors = 0;
        for handle in handles {
            if handle.await.unwrap().label() == "error" {
                errors += 1;
            }
        }
        // 40 requests are 10 full cycles of ok, ok, fail, fail
        assert_eq!(errors, 20);
    }

    #[test]
    fn test_invalid_chance_is_rejected() {
        let table = parse_endpoints("/bad:\n  error:\n    chance: 1.5\n").unwrap();
        let config = &table["/bad"];
        assert!(EndpointRule::from_config("/bad", config).is_err());
    }

    #[test]
    fn test_summary() {
        let rule = rule(
            r#"
/s:
  delay: ["1s", "2s"]
  error:
    chance: 0.5
    every:
      nth: 3
      amount: 2
"#,
        );
        let summary = rule.error_summary();
        assert_eq!(summary.every, Some((3, 2)));
        assert!(!summary.has_response);
        assert_eq!(
            rule.to_string(),
            concat!(
                "delay: 1s-2s, mock: <nil>, ",
                "error: [chance: 50.0%, every: 2 times on the 3nth, response: <nil>]"
            )
        );
    }
}
