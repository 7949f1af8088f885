use std::time::{Duration, Instant};

use connprobe::core::probe::adapters::commerce;
use connprobe::core::probe::{
    AuthMode, EndpointSpec, MapEnv, Presence, ProbeDefaults, ProbeEngine, ProbeError, Verdict,
};
use serde_json::Value;

use crate::common::{header_of, path_of, shop_descriptor, status, MockProbeClient, Reply};

const BASE: &str = "https://shop.example.com";

fn without_duration(report: &impl serde::Serialize) -> Value {
    let mut value = serde_json::to_value(report).unwrap();
    value.as_object_mut().unwrap().remove("durationMs");
    value
}

#[tokio::test]
async fn test_not_configured_makes_no_attempts() {
    let client = MockProbeClient::new(|_| status(200));
    let engine = ProbeEngine::new(client.clone());

    let report = engine
        .probe(&shop_descriptor(None), &MapEnv::new())
        .await
        .unwrap();

    assert_eq!(client.request_count(), 0);
    assert!(!report.ok());
    assert_eq!(report.verdict(), Verdict::NotConfigured);
    assert!(report.tried_endpoints().is_empty());
    assert_eq!(report.errors().len(), 1);
    assert!(report.errors()[0].error.contains("not configured"));
    assert!(report.errors()[0].error.contains("SHOP_BASE_URL"));
    assert_eq!(report.env().get("SHOP_BASE_URL"), Some(&Presence::Missing));
}

#[tokio::test]
async fn test_tried_endpoints_match_attempts() {
    let client = MockProbeClient::routes(&[("/wp-json", status(200))]);
    let engine = ProbeEngine::new(client.clone());
    let env = MapEnv::new().with("SHOP_API_KEY", "k-1");

    let report = engine
        .probe(&shop_descriptor(Some(BASE)), &env)
        .await
        .unwrap();

    assert_eq!(report.tried_endpoints().len(), client.request_count());
    assert_eq!(report.status_codes().len(), report.tried_endpoints().len());
    assert_eq!(report.verdict(), Verdict::EndpointMissing);
}

#[tokio::test]
async fn test_reports_are_idempotent_against_static_mock() {
    let client = MockProbeClient::routes(&[
        ("/wp-json", status(200)),
        ("/wp-json/shop/v1/products", status(403)),
    ]);
    let engine = ProbeEngine::new(client);
    let env = MapEnv::new().with("SHOP_API_KEY", "k-1");
    let descriptor = shop_descriptor(Some(BASE));

    let first = engine.probe(&descriptor, &env).await.unwrap();
    let second = engine.probe(&descriptor, &env).await.unwrap();

    assert_eq!(without_duration(&first), without_duration(&second));
}

#[tokio::test]
async fn test_stops_after_first_service_success() {
    let client = MockProbeClient::routes(&[
        ("/wp-json", status(200)),
        ("/wp-json/shop/v1/products", status(200)),
    ]);
    let engine = ProbeEngine::new(client.clone());
    let env = MapEnv::new().with("SHOP_API_KEY", "k-1");

    let report = engine
        .probe(&shop_descriptor(Some(BASE)), &env)
        .await
        .unwrap();

    assert!(report.ok());
    assert_eq!(client.request_count(), 2);
    assert_eq!(report.auth_mode_tried(), &[AuthMode::Bearer]);
}

#[tokio::test]
async fn test_timeout_bound_through_engine() {
    let client = MockProbeClient::new(|request| match path_of(request).as_str() {
        "/wp-json" => Reply::Hang,
        _ => status(200),
    });
    let engine = ProbeEngine::new(client.clone());
    let mut descriptor = shop_descriptor(Some(BASE));
    descriptor.timeout = Duration::from_millis(50);

    let started = Instant::now();
    let report = engine.probe(&descriptor, &MapEnv::new()).await.unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(80), "took {:?}", elapsed);
    assert_eq!(client.request_count(), 2);
    assert_eq!(report.status_codes().get("/wp-json [none]"), Some(&None));
    assert!(report.errors()[0].error.starts_with("timeout"));
    assert_eq!(
        report.status_codes().get("/wp-json/shop/v1/products [none]"),
        Some(&Some(200))
    );
    assert!(report.ok());
    assert_eq!(report.verdict(), Verdict::Reachable);
}

#[tokio::test]
async fn test_credentials_never_appear_in_report() {
    let client = MockProbeClient::new(|request| {
        if path_of(request) == "/wp-json" {
            return status(200);
        }
        Reply::Fail(connprobe::core::probe::TransportError::Network(format!(
            "proxy rejected {} with {:?}",
            request.url,
            header_of(request, "authorization")
        )))
    });
    let engine = ProbeEngine::new(client);
    let adapter = commerce();
    let env = MapEnv::new()
        .with("COMMERCE_BASE_URL", BASE)
        .with("COMMERCE_CONSUMER_KEY", "ck_live_4f9a")
        .with("COMMERCE_CONSUMER_SECRET", "cs_live_77d1")
        .with("COMMERCE_BASIC_AUTH", "YWRtaW46aHVudGVyMg==");
    let descriptor = adapter.descriptor(&env, &ProbeDefaults::default());

    let report = engine.probe(&descriptor, &env).await.unwrap();
    let json = serde_json::to_string(&report).unwrap();

    assert!(!report.errors().is_empty());
    for secret in [
        "ck_live_4f9a",
        "cs_live_77d1",
        "YWRtaW46aHVudGVyMg==",
        "Y2tfbGl2ZV80ZjlhOmNzX2xpdmVfNzdkMQ==",
    ] {
        assert!(!json.contains(secret), "leaked {}", secret);
    }
    assert!(json.contains("\"COMMERCE_CONSUMER_KEY\":\"present\""));
}

#[tokio::test]
async fn test_root_ok_service_unauthorized_without_credentials() {
    let client = MockProbeClient::routes(&[
        ("/wp-json", status(200)),
        ("/wp-json/shop/v1/products", status(401)),
    ]);
    let engine = ProbeEngine::new(client);

    let report = engine
        .probe(&shop_descriptor(Some(BASE)), &MapEnv::new())
        .await
        .unwrap();

    assert!(report.platform_reachable());
    assert!(!report.service_reachable());
    assert!(!report.ok());
    assert_eq!(
        report.detected_base(),
        Some("https://shop.example.com/wp-json/shop/v1")
    );
    assert_eq!(report.auth_mode_tried(), &[AuthMode::None]);
    assert_eq!(report.verdict(), Verdict::Unauthenticated);
    assert_eq!(report.skipped().len(), 1);
}

#[tokio::test]
async fn test_rate_limit_reported_and_fallbacks_not_tried() {
    let client = MockProbeClient::new(|request| match path_of(request).as_str() {
        "/wp-json" => status(200),
        _ if header_of(request, "authorization") == Some("Bearer k-42") => {
            Reply::Status(200, vec![("x-ratelimit-remaining", "42")])
        }
        _ => status(401),
    });
    let engine = ProbeEngine::new(client.clone());
    let env = MapEnv::new().with("SHOP_API_KEY", "k-42");

    let report = engine
        .probe(&shop_descriptor(Some(BASE)), &env)
        .await
        .unwrap();

    assert!(report.ok());
    assert_eq!(report.rate_limit().and_then(|r| r.remaining), Some(42));
    assert_eq!(
        report.tried_endpoints(),
        &[
            "/wp-json [none]".to_string(),
            "/wp-json/shop/v1/products [bearer]".to_string()
        ]
    );
    assert_eq!(client.request_count(), 2);
}

#[tokio::test]
async fn test_root_unreachable_stops_plan() {
    let client = MockProbeClient::new(|_| {
        Reply::Fail(connprobe::core::probe::TransportError::Network(
            "dns lookup failed".to_string(),
        ))
    });
    let engine = ProbeEngine::new(client.clone());
    let env = MapEnv::new().with("SHOP_API_KEY", "k-1");

    let report = engine
        .probe(&shop_descriptor(Some(BASE)), &env)
        .await
        .unwrap();

    assert_eq!(client.request_count(), 1);
    assert!(!report.platform_reachable());
    assert_eq!(report.errors().len(), 1);
    assert!(report.errors()[0].error.starts_with("network"));
}

#[tokio::test]
async fn test_overall_deadline_cancels_and_reports_partial() {
    let client = MockProbeClient::new(|_| Reply::Hang);
    let engine = ProbeEngine::new(client);
    let mut descriptor = shop_descriptor(Some(BASE));
    descriptor.timeout = Duration::from_secs(5);
    descriptor.deadline = Some(Duration::from_millis(80));

    let started = Instant::now();
    let report = engine.probe(&descriptor, &MapEnv::new()).await.unwrap();

    assert!(started.elapsed() < Duration::from_millis(600));
    assert_eq!(report.tried_endpoints().len(), 1);
    assert!(report.errors()[0].error.starts_with("cancelled"));
    assert!(report
        .errors()
        .iter()
        .any(|e| e.endpoint == "plan" && e.error.contains("1 candidate(s) not attempted")));
}

#[tokio::test]
async fn test_invalid_descriptor_is_rejected() {
    let engine = ProbeEngine::new(MockProbeClient::new(|_| status(200)));

    let mut two_roots = shop_descriptor(Some(BASE));
    two_roots.endpoints.push(EndpointSpec::root("/"));
    assert!(matches!(
        engine.probe(&two_roots, &MapEnv::new()).await,
        Err(ProbeError::InvalidDescriptor(_))
    ));

    let mut zero_timeout = shop_descriptor(Some(BASE));
    zero_timeout.timeout = Duration::ZERO;
    assert!(engine.probe(&zero_timeout, &MapEnv::new()).await.is_err());
}

#[tokio::test]
async fn test_unusable_base_url_is_reported_without_requests() {
    let client = MockProbeClient::new(|_| status(200));
    let engine = ProbeEngine::new(client.clone());

    for base in ["ftp://files.example.com", "shop.example.com/secret-path"] {
        let report = engine
            .probe(&shop_descriptor(Some(base)), &MapEnv::new())
            .await
            .unwrap();

        assert!(!report.ok());
        assert_eq!(report.verdict(), Verdict::InvalidConfig);
        assert!(report.tried_endpoints().is_empty());
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.errors()[0].endpoint, "config");
        assert!(report.errors()[0]
            .error
            .starts_with("invalid configuration: SHOP_BASE_URL:"));
        assert!(!report.errors()[0].error.contains("secret-path"));
    }
    assert_eq!(client.request_count(), 0);
}

#[tokio::test]
async fn test_commerce_strategies_of_same_mode_keep_separate_statuses() {
    let client = MockProbeClient::new(|request| {
        match (path_of(request).as_str(), header_of(request, "authorization")) {
            ("/wp-json", _) => status(200),
            ("/wp-json/wc/v3", Some("Basic Y2s6Y3M=")) => status(500),
            ("/wp-json/wc/v3", Some(_)) => Reply::Fail(
                connprobe::core::probe::TransportError::Network("connection reset".to_string()),
            ),
            _ => status(401),
        }
    });
    let engine = ProbeEngine::new(client.clone());
    let env = MapEnv::new()
        .with("COMMERCE_BASE_URL", BASE)
        .with("COMMERCE_CONSUMER_KEY", "ck")
        .with("COMMERCE_CONSUMER_SECRET", "cs")
        .with("COMMERCE_BASIC_AUTH", "YWRtaW46cHc=");
    let descriptor = commerce().descriptor(&env, &ProbeDefaults::default());

    let report = engine.probe(&descriptor, &env).await.unwrap();

    assert_eq!(report.tried_endpoints().len(), client.request_count());
    assert_eq!(report.status_codes().len(), report.tried_endpoints().len());
    assert_eq!(
        report.status_codes().get("/wp-json/wc/v3 [basic]"),
        Some(&Some(500))
    );
    assert_eq!(report.status_codes().get("/wp-json/wc/v3 [basic#2]"), Some(&None));
    assert!(report
        .errors()
        .iter()
        .any(|e| e.endpoint == "/wp-json/wc/v3 [basic#2]" && e.error.starts_with("network")));
}

#[tokio::test]
async fn test_commerce_pair_credentials_find_namespace() {
    let client = MockProbeClient::new(|request| {
        match (path_of(request).as_str(), header_of(request, "authorization")) {
            ("/wp-json", _) => status(200),
            ("/wp-json/wc/v3", Some(_)) => status(200),
            _ => status(401),
        }
    });
    let engine = ProbeEngine::new(client.clone());
    let env = MapEnv::new()
        .with("COMMERCE_BASE_URL", "https://shop.example.com/")
        .with("COMMERCE_CONSUMER_KEY", "ck")
        .with("COMMERCE_CONSUMER_SECRET", "cs");
    let descriptor = commerce().descriptor(&env, &ProbeDefaults::default());

    let report = engine.probe(&descriptor, &env).await.unwrap();

    assert!(report.ok());
    assert_eq!(
        report.detected_base(),
        Some("https://shop.example.com/wp-json/wc/v3")
    );
    assert_eq!(report.auth_mode_tried(), &[AuthMode::Basic]);
    assert_eq!(report.skipped().len(), 2);
    assert_eq!(report.env().get("COMMERCE_BASIC_AUTH"), Some(&Presence::Missing));
    assert_eq!(
        header_of(&client.requests()[1], "authorization"),
        Some("Basic Y2s6Y3M=")
    );
}

#[tokio::test]
async fn test_probe_all_keeps_input_order() {
    let client = MockProbeClient::routes(&[
        ("/wp-json", status(200)),
        ("/wp-json/shop/v1/products", status(200)),
    ]);
    let engine = ProbeEngine::new(client);

    let mut other = shop_descriptor(None);
    other.name = "other".to_string();
    other.env_prefix = "OTHER".to_string();
    let descriptors = vec![shop_descriptor(Some(BASE)), other];

    let results = engine.probe_all(&descriptors, &MapEnv::new()).await;

    assert_eq!(results.len(), 2);
    let first = results[0].as_ref().unwrap();
    let second = results[1].as_ref().unwrap();
    assert_eq!(first.service(), "shop");
    assert!(first.ok());
    assert_eq!(second.service(), "other");
    assert_eq!(second.verdict(), Verdict::NotConfigured);
}
