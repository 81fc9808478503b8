//! Integration tests for scenario sequencing and stress ramps

use http_load_tester::{
    run_stress_test, CancellationToken, LoadConfig, Scenario, ScenarioRunner, StressSpec, Thresholds,
};
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

async fn mock_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_scenarios_run_in_order() {
    let server = mock_server().await;
    let ok = format!("{}/ok", server.uri());

    let mut runner = ScenarioRunner::new();
    runner
        .add_scenario(Scenario::new("first", LoadConfig::new(ok.clone()).with_requests(3)))
        .unwrap();
    runner
        .add_scenario(
            Scenario::new("second", LoadConfig::new(ok).with_requests(4)).with_warmup(Duration::from_millis(50)),
        )
        .unwrap();

    runner.run(&CancellationToken::new()).await.unwrap();

    let ordered = runner.ordered_results();
    assert_eq!(ordered.len(), 2);
    assert_eq!(ordered[0].0, "first");
    assert_eq!(ordered[0].1.total_requests, 3);
    assert_eq!(ordered[1].0, "second");
    // Warmup traffic is not part of the measured result.
    assert_eq!(ordered[1].1.total_requests, 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_validation_stops_the_sequence() {
    let server = mock_server().await;
    let ok = format!("{}/ok", server.uri());
    let broken = format!("{}/broken", server.uri());
    let strict = Thresholds {
        max_failure_rate: Some(0.0),
        ..Thresholds::default()
    };

    let mut runner = ScenarioRunner::new();
    runner
        .add_scenario(Scenario::new("healthy", LoadConfig::new(ok.clone()).with_requests(5)))
        .unwrap();
    runner
        .add_scenario(
            Scenario::new("degraded", LoadConfig::new(broken).with_requests(5))
                .with_validation(strict.into_validation()),
        )
        .unwrap();
    runner
        .add_scenario(Scenario::new("never", LoadConfig::new(ok).with_requests(5)))
        .unwrap();

    let err = runner.run(&CancellationToken::new()).await.unwrap_err();
    assert_eq!(err.category(), "VALIDATION");
    assert!(err.to_string().contains("degraded"));

    let results = runner.results();
    assert_eq!(results.len(), 2);
    assert_eq!(results["healthy"].success_count, 5);
    assert_eq!(results["degraded"].status_count(503), 5);
    assert!(!results.contains_key("never"));
}

#[tokio::test]
async fn test_cancelled_sequence_does_not_start() {
    let mut runner = ScenarioRunner::new();
    runner
        .add_scenario(Scenario::new("a", LoadConfig::new("http://127.0.0.1:1/").with_requests(1)))
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = runner.run(&cancel).await.unwrap_err();
    assert_eq!(err.category(), "CANCELLED");
    assert!(runner.results().is_empty());
}

/// Healthy until a fixed instant, then every response is a 500
struct DegradesAt {
    deadline: Instant,
}

impl Respond for DegradesAt {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        if Instant::now() < self.deadline {
            ResponseTemplate::new(200)
        } else {
            ResponseTemplate::new(500)
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stress_stops_at_breaking_point() {
    let server = MockServer::start().await;
    let spec = StressSpec {
        start: 1,
        step: 1,
        max: 10,
        step_duration: Duration::from_millis(300),
        failure_threshold: 5.0,
    };
    Mock::given(method("GET"))
        .respond_with(DegradesAt {
            deadline: Instant::now() + Duration::from_millis(450),
        })
        .mount(&server)
        .await;

    let steps = run_stress_test(&CancellationToken::new(), &LoadConfig::new(server.uri()), &spec)
        .await
        .unwrap();

    let last = steps.last().unwrap();
    assert!(last.breaking_point);
    assert!(last.concurrency >= 2 && last.concurrency < 10, "broke at {}", last.concurrency);
    assert!(steps[..steps.len() - 1].iter().all(|s| !s.breaking_point));
    assert!(!steps[0].breaking_point);
    for (idx, step) in steps.iter().enumerate() {
        assert_eq!(step.concurrency, 1 + idx);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stress_without_breaking_point_runs_every_level() {
    let server = mock_server().await;
    let spec = StressSpec {
        start: 1,
        step: 2,
        max: 6,
        step_duration: Duration::from_millis(100),
        failure_threshold: 5.0,
    };

    let steps = run_stress_test(
        &CancellationToken::new(),
        &LoadConfig::new(format!("{}/ok", server.uri())),
        &spec,
    )
    .await
    .unwrap();

    let levels: Vec<usize> = steps.iter().map(|s| s.concurrency).collect();
    assert_eq!(levels, vec![1, 3, 5]);
    assert!(steps.iter().all(|s| !s.breaking_point && s.result.total_requests > 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stress_unreachable_target_breaks_first_step() {
    let spec = StressSpec {
        start: 2,
        step: 2,
        max: 8,
        step_duration: Duration::from_millis(100),
        failure_threshold: 5.0,
    };
    let base = LoadConfig::new("http://127.0.0.1:1/").with_timeout(Duration::from_millis(100));

    let steps = run_stress_test(&CancellationToken::new(), &base, &spec).await.unwrap();

    assert_eq!(steps.len(), 1);
    assert!(steps[0].breaking_point);
    assert_eq!(steps[0].result.failure_rate(), 100.0);
}
