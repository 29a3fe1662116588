mod common;
use common::*;

use loadcore::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn run(executor: MockExecutor, plan: RunPlan) -> RunHandle {
    RunCoordinator::new(Arc::new(executor), Arc::new(AcceptAll))
        .start_run(plan)
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn concurrent_profile_holds_user_count() {
    let plan = RunPlan::new(
        LoadProfile::Concurrent {
            users: 10,
            duration: Duration::from_secs(2),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(5), Duration::from_millis(2));
    let handle = run(executor, plan);

    // Live count must sit at the configured value at every sampled instant
    // between settling and the end of the run.
    let started = Instant::now();
    while started.elapsed() < Duration::from_millis(1_700) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if started.elapsed() > Duration::from_millis(300) {
            assert_eq!(handle.active_users(), 10);
        }
    }

    let result = handle.wait_for_result().await;
    assert_eq!(result.status, RunStatus::Completed);
    assert_eq!(
        result.total_requests,
        result.successful + result.failed_total()
    );
    assert!(result.total_requests > 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn tps_profile_tracks_target_rate() {
    let plan = RunPlan::new(
        LoadProfile::Tps {
            rate: 50,
            duration: Duration::from_secs(2),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(1), Duration::ZERO);
    let result = run(executor, plan).wait_for_result().await;

    assert_eq!(result.status, RunStatus::Completed);
    // 50/s over 2s with burst 1, plus at most one watchdog tick of runover.
    assert!(
        result.total_requests >= 95 && result.total_requests <= 108,
        "dispatched {} requests",
        result.total_requests
    );
    assert!(result.wall_clock >= Duration::from_secs(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn qps_profile_tracks_target_rate() {
    let plan = RunPlan::new(
        LoadProfile::Qps {
            rate: 40,
            duration: Duration::from_secs(2),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(1), Duration::ZERO);
    let result = run(executor, plan).wait_for_result().await;

    assert_eq!(result.status, RunStatus::Completed);
    // Same dispatch mechanics as Tps: 40/s over 2s, burst 1, at most one
    // watchdog tick of runover.
    assert!(
        result.total_requests >= 76 && result.total_requests <= 88,
        "dispatched {} requests",
        result.total_requests
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn waiting_for_a_result_is_repeatable() {
    let plan = RunPlan::new(
        LoadProfile::Concurrent {
            users: 3,
            duration: Duration::from_millis(300),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(2), Duration::ZERO);
    let handle = run(executor, plan);

    let first = handle.wait_for_result().await;
    let second = handle.wait_for_result().await;
    assert_eq!(first, second);

    // The handle is awaitable directly and agrees with both.
    let third = handle.await;
    assert_eq!(first, third);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn totals_balance_with_mixed_failures() {
    let plan = RunPlan::new(
        LoadProfile::Concurrent {
            users: 5,
            duration: Duration::from_secs(1),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(3), Duration::from_millis(1))
        .failing_every(4);
    let result = run(executor, plan).wait_for_result().await;

    assert!(result.total_requests > 0);
    assert_eq!(
        result.total_requests,
        result.successful + result.failed_total()
    );
    assert!(result
        .failed_by_kind
        .contains_key(&OutcomeKind::TransportError));
    let expected = result.failed_total() as f64 / result.total_requests as f64;
    assert!((result.error_rate - expected).abs() < 1e-9);

    // Percentile ordering on a non-trivial latency distribution.
    let lat = result.latency;
    assert!(lat.p50 <= lat.p90);
    assert!(lat.p90 <= lat.p95);
    assert!(lat.p95 <= lat.p99);
    assert!(lat.p99 <= lat.max);
    assert!(lat.min <= lat.p50);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn error_threshold_aborts_early() {
    let plan = RunPlan::new(
        LoadProfile::Concurrent {
            users: 4,
            duration: Duration::from_secs(10),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    )
    .with_error_threshold(0.05);
    // Every 5th request fails: a 20% error rate against a 5% threshold.
    let executor =
        MockExecutor::with_latency(Duration::from_millis(1), Duration::ZERO).failing_every(5);
    let result = run(executor, plan).wait_for_result().await;

    assert_eq!(result.status, RunStatus::ThresholdAborted);
    assert!(result.wall_clock < Duration::from_secs(5));
    assert!(result.error_rate >= 0.05);
    assert_eq!(
        result.total_requests,
        result.successful + result.failed_total()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn cancel_stops_the_run_gracefully() {
    let plan = RunPlan::new(
        LoadProfile::Concurrent {
            users: 2,
            duration: Duration::from_secs(10),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(5), Duration::ZERO);
    let handle = run(executor, plan);

    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.cancel();
    let result = handle.wait_for_result().await;

    assert_eq!(result.status, RunStatus::Cancelled);
    assert!(result.wall_clock < Duration::from_secs(2));
    assert_eq!(
        result.total_requests,
        result.successful + result.failed_total()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn ramp_profile_reaches_the_target() {
    let plan = RunPlan::new(
        LoadProfile::RampUp {
            start_users: 2,
            target_users: 6,
            ramp_duration: Duration::from_secs(1),
            hold_duration: Duration::from_millis(500),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(2), Duration::ZERO);
    let handle = run(executor, plan);

    tokio::time::sleep(Duration::from_millis(150)).await;
    let early = handle.active_users();
    assert!(early >= 2 && early <= 4, "early user count {early}");

    tokio::time::sleep(Duration::from_millis(1_100)).await;
    assert_eq!(handle.active_users(), 6);

    let result = handle.wait_for_result().await;
    assert_eq!(result.status, RunStatus::Completed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn rejected_assertions_are_counted() {
    let plan = RunPlan::new(
        LoadProfile::Concurrent {
            users: 2,
            duration: Duration::from_millis(400),
        },
        RequestSpec::get("mock://target"),
        Duration::from_secs(1),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(2), Duration::ZERO);
    let coordinator = RunCoordinator::new(Arc::new(executor), Arc::new(RejectAll));
    let result = coordinator
        .start_run(plan)
        .unwrap()
        .wait_for_result()
        .await;

    assert_eq!(result.successful, 0);
    assert_eq!(
        result.failed_by_kind.get(&OutcomeKind::AssertionFailure),
        Some(&result.total_requests)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn slow_responses_classify_as_timeouts() {
    let plan = RunPlan::new(
        LoadProfile::Concurrent {
            users: 2,
            duration: Duration::from_millis(500),
        },
        RequestSpec::get("mock://target"),
        Duration::from_millis(20),
    );
    let executor = MockExecutor::with_latency(Duration::from_millis(200), Duration::ZERO);
    let result = run(executor, plan).wait_for_result().await;

    assert_eq!(result.successful, 0);
    assert!(result.failed_by_kind.contains_key(&OutcomeKind::Timeout));
    assert_eq!(
        result.total_requests,
        result.successful + result.failed_total()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ntest::timeout(30_000)]
async fn invalid_profiles_fail_before_any_dispatch() {
    let executor = Arc::new(MockExecutor::with_latency(
        Duration::from_millis(1),
        Duration::ZERO,
    ));
    let request = RequestSpec::get("mock://target");

    let bad_profiles = [
        LoadProfile::Tps {
            rate: 0,
            duration: Duration::from_secs(5),
        },
        LoadProfile::Concurrent {
            users: 0,
            duration: Duration::from_secs(5),
        },
        LoadProfile::Concurrent {
            users: 10,
            duration: Duration::ZERO,
        },
    ];

    for profile in bad_profiles {
        let coordinator = RunCoordinator::new(executor.clone(), Arc::new(AcceptAll));
        let plan = RunPlan::new(profile, request.clone(), Duration::from_secs(1));
        assert!(matches!(
            coordinator.start_run(plan),
            Err(Error::Configuration(_))
        ));
    }

    assert_eq!(executor.calls(), 0);
}
