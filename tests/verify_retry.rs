mod common;

use ifthenpay_gateway::error::GatewayError;
use ifthenpay_gateway::gateways::mock::{MockBehavior, MockGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn offsets(start: Instant, times: &[Instant]) -> Vec<Duration> {
    times.iter().map(|t| t.duration_since(start)).collect()
}

#[tokio::test(start_paused = true)]
async fn settles_on_fourth_poll_after_nine_seconds() {
    let gateway = Arc::new(MockGateway::new(MockBehavior::SettleAfter(3)));
    let h = common::harness(gateway.clone());

    let start = Instant::now();
    let settled = h
        .service
        .verify_with_retry("TX-1", &CancellationToken::new())
        .await
        .unwrap();

    assert!(settled);
    assert_eq!(gateway.status_calls(), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(9));
}

#[tokio::test(start_paused = true)]
async fn gives_up_at_deadline_without_polling_past_it() {
    let gateway = Arc::new(MockGateway::new(MockBehavior::NeverSettled));
    let h = common::harness(gateway.clone());

    let start = Instant::now();
    let settled = h
        .service
        .verify_with_retry("TX-2", &CancellationToken::new())
        .await
        .unwrap();

    assert!(!settled);
    assert_eq!(start.elapsed(), Duration::from_secs(10));
    assert_eq!(
        offsets(start, &gateway.status_call_times()),
        vec![
            Duration::from_secs(0),
            Duration::from_secs(3),
            Duration::from_secs(6),
            Duration::from_secs(9),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn first_poll_success_returns_immediately() {
    let gateway = Arc::new(MockGateway::new(MockBehavior::AlwaysSettled));
    let h = common::harness(gateway.clone());

    let start = Instant::now();
    assert!(h
        .service
        .verify_with_retry("TX-3", &CancellationToken::new())
        .await
        .unwrap());
    assert_eq!(gateway.status_calls(), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_the_wait() {
    let gateway = Arc::new(MockGateway::new(MockBehavior::NeverSettled));
    let h = common::harness(gateway.clone());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(4)).await;
        trigger.cancel();
    });

    let start = Instant::now();
    let err = h.service.verify_with_retry("TX-4", &cancel).await.unwrap_err();
    assert!(matches!(err, GatewayError::VerificationCancelled));
    assert_eq!(gateway.status_calls(), 2);
    assert_eq!(start.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn custom_policy_is_honoured() {
    let gateway = Arc::new(MockGateway::new(MockBehavior::NeverSettled));
    let mut h = common::harness(gateway.clone());
    h.service.verify_policy.timeout = Duration::from_secs(2);
    h.service.verify_policy.interval = Duration::from_millis(500);

    let start = Instant::now();
    assert!(!h
        .service
        .verify_with_retry("TX-5", &CancellationToken::new())
        .await
        .unwrap());
    assert_eq!(gateway.status_calls(), 4);
    assert_eq!(start.elapsed(), Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn zero_interval_is_raised_to_the_floor() {
    let gateway = Arc::new(MockGateway::new(MockBehavior::NeverSettled));
    let mut h = common::harness(gateway.clone());
    h.service.verify_policy.timeout = Duration::from_secs(1);
    h.service.verify_policy.interval = Duration::ZERO;

    let start = Instant::now();
    assert!(!h
        .service
        .verify_with_retry("TX-6", &CancellationToken::new())
        .await
        .unwrap());
    assert_eq!(gateway.status_calls(), 4);
    assert_eq!(
        offsets(start, &gateway.status_call_times()),
        vec![
            Duration::ZERO,
            Duration::from_millis(250),
            Duration::from_millis(500),
            Duration::from_millis(750),
        ]
    );
}
