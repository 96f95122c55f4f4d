//! Configuration to running router, end to end.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use metadata_router::config::{parse_config, ConfigError, ValidationError};
use metadata_router::destination::{InvalidationReason, RouteDestination};
use metadata_router::lifecycle::startup::StartupError;
use metadata_router::metadata::pump::TopologyPump;
use metadata_router::metadata::TopologyUpdate;
use metadata_router::routing::{RoutingStrategy, ServerRole};
use metadata_router::{RouterRuntime, Shutdown};

mod common;
use common::{drain, p, s};

const CONFIG: &str = r#"
[[metadata_caches]]
name = "cluster"
replicaset = "default"

[[metadata_caches.instances]]
id = "P1"
host = "10.0.0.1"
port = 3306
mode = "read-write"

[[metadata_caches.instances]]
id = "S1"
host = "10.0.0.2"
port = 3306
mode = "read-only"

[[metadata_caches.instances]]
id = "S2"
host = "10.0.0.3"
port = 3306
mode = "read-only"

[[routes]]
name = "rw"
metadata_cache = "cluster"
access_mode = "read-write"

[[routes]]
name = "ro"
metadata_cache = "cluster"
access_mode = "read-only"

[routes.options]
disconnect_on_promoted_to_primary = "yes"
"#;

#[test]
fn test_routes_resolved_from_access_mode() {
    let config = parse_config(CONFIG).unwrap();
    let runtime = RouterRuntime::start(&config, Arc::new(mpsc::unbounded_channel().0)).unwrap();

    let rw = runtime.route("rw").unwrap();
    assert_eq!(rw.server_role(), ServerRole::Primary);
    assert_eq!(rw.routing_strategy(), RoutingStrategy::FirstAvailable);
    assert_eq!(rw.destinations().ids(), ["P1"]);

    let ro = runtime.route("ro").unwrap();
    assert_eq!(ro.server_role(), ServerRole::Secondary);
    assert_eq!(ro.routing_strategy(), RoutingStrategy::RoundRobin);
    assert_eq!(ro.destinations().ids(), ["S1", "S2"]);
    assert_eq!(ro.destinations().ids(), ["S2", "S1"]);

    runtime.stop();
    assert!(runtime.routes().iter().all(|g| !g.is_subscribed()));
}

#[test]
fn test_invalid_route_rejected_at_load() {
    let config = CONFIG.replace(r#"access_mode = "read-write""#, r#"routing_strategy = "random""#);
    assert!(matches!(
        parse_config(&config),
        Err(ConfigError::Validation(_))
    ));
}

#[test]
fn test_route_replicaset_must_be_served() {
    let config = CONFIG.replace(
        "name = \"ro\"\nmetadata_cache = \"cluster\"",
        "name = \"ro\"\nmetadata_cache = \"cluster\"\nreplicaset = \"typo\"",
    );
    assert!(config.contains("replicaset = \"typo\""));

    let Err(ConfigError::Validation(errors)) = parse_config(&config) else {
        panic!("mismatched replicaset must be rejected");
    };
    assert_eq!(
        errors,
        vec![ValidationError::UnknownReplicaset {
            route: "ro".into(),
            cache: "cluster".into(),
            replicaset: "typo".into(),
        }]
    );
}

#[test]
fn test_startup_error_names_route() {
    let mut config = parse_config(CONFIG).unwrap();
    config.routes[0].metadata_cache = "missing".to_string();

    let err = RouterRuntime::start(&config, Arc::new(mpsc::unbounded_channel().0))
        .err()
        .expect("unknown cache must fail");
    assert!(matches!(err, StartupError::Route { ref route, .. } if route == "rw"));
}

#[tokio::test]
async fn test_pumped_update_reaches_groups() {
    let config = parse_config(CONFIG).unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let runtime = RouterRuntime::start(&config, Arc::new(tx)).unwrap();

    let cache = runtime.cache("cluster").unwrap().clone();
    let (pump, updates) = TopologyPump::new(cache);
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(pump.run(shutdown.subscribe()));

    updates
        .send(TopologyUpdate {
            replicaset: "default".to_string(),
            instances: vec![p("S1", 3306), s("S2", 3306)],
            md_servers_reachable: true,
        })
        .unwrap();
    drop(updates);

    let applied = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("pump finishes")
        .unwrap();
    assert_eq!(applied, 1);

    let events = drain(&mut rx);
    let promoted: Vec<_> = events
        .iter()
        .filter(|e| e.reason == InvalidationReason::PromotedToPrimary)
        .collect();
    assert_eq!(promoted.len(), 1);
    assert_eq!(promoted[0].group, "ro");
    assert_eq!(promoted[0].destination.id, "S1");

    // the read-write route lost P1
    assert!(events.iter().any(|e| e.group == "rw"
        && e.destination.id == "P1"
        && e.reason == InvalidationReason::Removed));

    assert_eq!(runtime.route("rw").unwrap().destinations().ids(), ["S1"]);
    assert_eq!(runtime.route("ro").unwrap().destinations().ids(), ["S2"]);
}

#[tokio::test]
async fn test_pump_stops_on_shutdown() {
    let config = parse_config(CONFIG).unwrap();
    let runtime = RouterRuntime::start(&config, Arc::new(mpsc::unbounded_channel().0)).unwrap();

    let (pump, _updates) = TopologyPump::new(runtime.cache("cluster").unwrap().clone());
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(pump.run(shutdown.subscribe()));

    shutdown.trigger();
    let applied = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("pump exits on shutdown")
        .unwrap();
    assert_eq!(applied, 0);
}
