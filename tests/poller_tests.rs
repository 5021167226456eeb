//! Integration tests for the stats poller against a scripted connection.
//!
//! These tests verify the refresh contents, the derived age statistics, the
//! one-refresh-per-cycle behaviour of `fetch` and connection release on
//! failure.

mod common;

use common::{descriptor_file, FakeConnection, STATS, STATS_ITEMS};
use memcached_gmond::{
    MetricModule, Params, PollerConfig, PollerError, StatValue, StatsPoller,
};

fn poller_with(conn: FakeConnection) -> StatsPoller {
    StatsPoller::new(PollerConfig::default(), Box::new(conn))
}

fn params_for(file: &tempfile::NamedTempFile) -> Params {
    Params::from([(
        "defs".to_string(),
        file.path().to_string_lossy().to_string(),
    )])
}

#[test]
fn test_refresh_merges_both_commands_and_ages() {
    let (conn, observed) = FakeConnection::standard();
    let mut poller = poller_with(conn);

    poller.refresh().unwrap();

    let cache = poller.cache();
    assert_eq!(cache.len(), STATS.len() + STATS_ITEMS.len() + 4);
    assert_eq!(cache.get("pid"), Some(&StatValue::Int(1234)));
    assert_eq!(cache.get("version"), Some(&StatValue::from("1.6.21")));
    assert_eq!(cache.get("rusage_user"), Some(&StatValue::Float(0.5)));
    assert_eq!(cache.get("items:2:age"), Some(&StatValue::Int(300)));

    assert_eq!(cache.get("age_min"), Some(&StatValue::Int(100)));
    assert_eq!(cache.get("age_max"), Some(&StatValue::Int(400)));
    assert_eq!(cache.get("age_mean"), Some(&StatValue::Float(250.0)));
    assert_eq!(cache.get("age_median"), Some(&StatValue::Float(250.0)));
    assert!(cache.last_refresh_ok);
    assert!(cache.last_updated.is_some());

    let observed = observed.lock().unwrap();
    assert_eq!(observed.commands, vec!["stats", "stats items"]);
    assert_eq!(observed.opens, 1);
    assert_eq!(observed.close_calls, 1);
}

#[test]
fn test_refresh_without_ages_reports_zeros() {
    let (conn, _) = FakeConnection::new(STATS, &["STAT items:1:number 5"]);
    let mut poller = poller_with(conn);

    poller.refresh().unwrap();

    for key in ["age_min", "age_max", "age_mean", "age_median"] {
        assert_eq!(poller.cache().get(key), Some(&StatValue::Int(0)), "{key}");
    }
}

#[test]
fn test_unsigned_counters_stay_numeric() {
    let stats = ["STAT total_items 18446744073709551615"];
    let items = ["STAT items:1:age 18446744073709551615", "STAT items:2:age 60"];
    let (conn, _) = FakeConnection::new(&stats, &items);
    let mut poller = poller_with(conn);

    poller.refresh().unwrap();

    let cache = poller.cache();
    let big = StatValue::UInt(u64::MAX);
    assert_eq!(cache.get("total_items"), Some(&big));
    assert_eq!(cache.get("age_min"), Some(&StatValue::Int(60)));
    assert_eq!(cache.get("age_max"), Some(&big));
}

#[test]
fn test_one_round_trip_per_cycle() {
    let names = [
        "curr_items",
        "version",
        "pid",
        "age_min",
        "age_max",
        "age_mean",
        "age_median",
    ];
    let file = descriptor_file(&names);
    let (conn, observed) = FakeConnection::standard();
    let mut poller = poller_with(conn);

    for cycle in 1..=2 {
        let descriptors = poller.init(&params_for(&file)).unwrap();
        assert_eq!(descriptors.len(), names.len());
        for descriptor in &descriptors {
            assert!(descriptor.call_back.is_some());
            descriptor.invoke(&mut poller).unwrap();
        }
        assert_eq!(observed.lock().unwrap().opens, cycle);
    }
}

#[test]
fn test_fetch_consumes_cached_values() {
    let (conn, observed) = FakeConnection::standard();
    let mut poller = poller_with(conn);

    // Miss: refresh, then a plain read that leaves the entry.
    assert_eq!(poller.fetch("curr_items").unwrap(), StatValue::Int(10));
    assert_eq!(poller.cache().get("curr_items"), Some(&StatValue::Int(10)));

    // Hit: removed on read.
    assert_eq!(poller.fetch("pid").unwrap(), StatValue::Int(1234));
    assert!(poller.cache().get("pid").is_none());
    assert_eq!(observed.lock().unwrap().opens, 1);

    // Consumed entry forces the next refresh.
    assert_eq!(poller.fetch("pid").unwrap(), StatValue::Int(1234));
    assert_eq!(observed.lock().unwrap().opens, 2);
}

#[test]
fn test_unknown_metric_after_refresh_fails() {
    let (conn, observed) = FakeConnection::standard();
    let mut poller = poller_with(conn);

    let err = poller.fetch("no_such_metric").unwrap_err();
    assert!(matches!(err, PollerError::UnknownMetric(ref name) if name == "no_such_metric"));
    assert_eq!(observed.lock().unwrap().opens, 1);
}

#[test]
fn test_connection_closed_when_open_fails() {
    let (conn, observed) = FakeConnection::unreachable();
    let mut poller = poller_with(conn);

    let err = poller.fetch("curr_items").unwrap_err();
    assert!(matches!(err, PollerError::Io { .. }));
    assert_eq!(observed.lock().unwrap().close_calls, 1);
    assert!(!poller.cache().last_refresh_ok);
}

#[test]
fn test_connection_closed_when_response_is_malformed() {
    let (conn, observed) = FakeConnection::new(STATS, &["STAT items:1:age"]);
    let mut poller = poller_with(conn);

    let err = poller.refresh().unwrap_err();
    assert!(matches!(err, PollerError::MalformedLine(_)));
    assert_eq!(observed.lock().unwrap().close_calls, 1);
    assert!(poller.cache().is_empty());
}

#[test]
fn test_init_merges_params_and_reports_bad_files() {
    let (conn, _) = FakeConnection::standard();
    let mut poller = poller_with(conn);

    let params = Params::from([
        ("host".to_string(), "10.1.2.3".to_string()),
        ("port".to_string(), "11311".to_string()),
        ("defs".to_string(), "/nonexistent/memcached-metrics.json".to_string()),
    ]);
    let err = poller.init(&params).unwrap_err();
    assert!(matches!(err, PollerError::DescriptorRead { .. }));
    assert_eq!(poller.config().host, "10.1.2.3");
    assert_eq!(poller.config().port, 11311);
}

#[test]
fn test_cleanup_releases_connection() {
    let (conn, observed) = FakeConnection::standard();
    let mut poller = poller_with(conn);

    poller.cleanup();
    poller.cleanup();
    assert_eq!(observed.lock().unwrap().close_calls, 2);
}

#[test]
fn test_bundled_descriptors_cover_age_metrics() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("memcached-metrics.json");
    let descriptors = memcached_gmond::descriptor::load_descriptors(&path).unwrap();
    for key in ["age_min", "age_max", "age_mean", "age_median"] {
        assert!(descriptors.iter().any(|d| d.name == key), "{key}");
    }
    assert!(descriptors.iter().all(|d| d.extra.contains_key("value_type")));
}
