use promptgate_rate_limit::{Decision, RateLimiter};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn test_exactly_max_requests_allowed() {
    let limiter = RateLimiter::new(60, Duration::from_secs(60));
    let now = Instant::now();

    for _ in 0..60 {
        assert_eq!(limiter.check_at("127.0.0.1", now), Decision::Allowed);
    }

    // 61st request within the same window is denied
    assert!(!limiter.check_at("127.0.0.1", now).is_allowed());
}

#[test]
fn test_clients_do_not_share_budget() {
    let limiter = RateLimiter::new(2, Duration::from_secs(60));
    let now = Instant::now();

    assert!(limiter.check_at("127.0.0.1", now).is_allowed());
    assert!(limiter.check_at("127.0.0.1", now).is_allowed());

    // Client 2 is unaffected by client 1 exhausting its budget
    assert!(limiter.check_at("127.0.0.2", now).is_allowed());
    assert!(limiter.check_at("127.0.0.2", now).is_allowed());

    assert!(!limiter.check_at("127.0.0.1", now).is_allowed());
    assert!(!limiter.check_at("127.0.0.2", now).is_allowed());
}

#[test]
fn test_recovers_without_reset() {
    let limiter = RateLimiter::new(2, Duration::from_secs(60));
    let start = Instant::now();

    limiter.check_at("127.0.0.1", start);
    limiter.check_at("127.0.0.1", start + Duration::from_secs(30));
    assert!(!limiter.check_at("127.0.0.1", start + Duration::from_secs(45)).is_allowed());

    // Two minutes later both old requests have slid out of the window
    let later = start + Duration::from_secs(120);
    assert!(limiter.check_at("127.0.0.1", later).is_allowed());
    assert!(limiter.check_at("127.0.0.1", later).is_allowed());
    assert!(!limiter.check_at("127.0.0.1", later).is_allowed());
}

#[test]
fn test_real_clock_window_expiry() {
    let limiter = RateLimiter::new(1, Duration::from_millis(50));

    assert!(limiter.check("client").is_allowed());
    assert!(!limiter.check("client").is_allowed());

    std::thread::sleep(Duration::from_millis(80));

    assert!(limiter.check("client").is_allowed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_tasks_admit_exactly_limit() {
    let limiter = Arc::new(RateLimiter::new(25, Duration::from_secs(60)));

    let handles: Vec<_> = (0..100)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            tokio::spawn(async move { limiter.check("same-client").is_allowed() })
        })
        .collect();

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 25);
}
