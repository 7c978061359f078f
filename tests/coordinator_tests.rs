use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use uponor_smatrix::{
    Coordinator, DEFAULT_SCAN_INTERVAL, Error, Event, SmatrixClient, SnapshotSource,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn host(server: &MockServer) -> String {
    let addr = server.address();
    format!("{}:{}", addr.ip(), addr.port())
}

fn client(server: &MockServer) -> Arc<SmatrixClient> {
    Arc::new(
        SmatrixClient::builder(host(server))
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap(),
    )
}

fn thermostats(current: f64) -> Value {
    json!([
        {"code": "A", "name": "Living Room", "currentTemperature": current, "targetTemperature": 22.0, "active": true, "mode": "heating"},
        {"code": "B", "name": "Kitchen", "currentTemperature": 19.5, "targetTemperature": 20.0, "active": false, "mode": "heating"}
    ])
}

async fn mount_once(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/thermostats"))
        .respond_with(template)
        .up_to_n_times(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn refresh_publishes_snapshot() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(200).set_body_json(thermostats(21.0))).await;

    let coordinator = Coordinator::builder(client(&server)).build();
    let rx = coordinator.subscribe();
    assert!(rx.borrow().is_none());
    assert!(coordinator.snapshot().is_none());
    assert!(!coordinator.last_update_success());

    let snapshot = coordinator.refresh().await.unwrap();
    assert_eq!(snapshot.len(), 2);
    assert!(coordinator.last_update_success());

    let published = rx.borrow().clone().expect("snapshot should be published");
    assert!(Arc::ptr_eq(&published, &snapshot));
    assert_eq!(
        coordinator.snapshot().unwrap().get("A").unwrap().current_temperature,
        Some(21.0)
    );
}

#[tokio::test]
async fn bad_status_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(200).set_body_json(thermostats(21.0))).await;
    mount_once(&server, ResponseTemplate::new(500)).await;

    let coordinator = Coordinator::builder(client(&server)).build();
    let first = coordinator.refresh().await.unwrap();

    let err = coordinator.refresh().await.unwrap_err();
    assert!(matches!(err, Error::BadStatus(500)), "got {err:?}");
    assert!(!coordinator.last_update_success());

    let current = coordinator.snapshot().expect("previous snapshot stays published");
    assert!(Arc::ptr_eq(&current, &first));
}

#[tokio::test]
async fn timeout_keeps_previous_snapshot() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(200).set_body_json(thermostats(21.0))).await;
    mount_once(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(thermostats(25.0))
            .set_delay(Duration::from_secs(2)),
    )
    .await;

    let coordinator = Coordinator::builder(client(&server)).build();
    coordinator.refresh().await.unwrap();

    let err = coordinator.refresh().await.unwrap_err();
    assert!(err.is_transport(), "got {err:?}");
    let current = coordinator.snapshot().unwrap();
    assert_eq!(current.get("A").unwrap().current_temperature, Some(21.0));
}

#[tokio::test]
async fn recovery_after_failure_publishes_new_snapshot() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(500)).await;
    mount_once(&server, ResponseTemplate::new(200).set_body_json(thermostats(21.5))).await;

    let coordinator = Coordinator::builder(client(&server)).build();
    assert!(coordinator.refresh().await.is_err());
    assert!(coordinator.snapshot().is_none());

    coordinator.refresh().await.unwrap();
    assert!(coordinator.last_update_success());
    assert_eq!(
        coordinator.snapshot().unwrap().get("A").unwrap().current_temperature,
        Some(21.5)
    );
}

#[tokio::test]
async fn events_describe_changes_between_snapshots() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(200).set_body_json(thermostats(21.0))).await;
    mount_once(&server, ResponseTemplate::new(200).set_body_json(thermostats(21.5))).await;
    mount_once(&server, ResponseTemplate::new(200).set_body_json(thermostats(21.5))).await;

    let events: Arc<Mutex<Vec<Event>>> = Arc::new(Mutex::new(vec![]));
    let events_clone = events.clone();
    let coordinator = Coordinator::builder(client(&server))
        .on_event(move |event| events_clone.lock().unwrap().push(event.clone()))
        .build();

    coordinator.refresh().await.unwrap();
    {
        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert!(captured.iter().all(|e| matches!(e, Event::ThermostatAdded { .. })));
    }

    coordinator.refresh().await.unwrap();
    {
        let captured = events.lock().unwrap();
        assert_eq!(captured.len(), 3);
        assert_eq!(
            captured[2],
            Event::CurrentTemperatureChanged {
                code: "A".into(),
                name: "Living Room".into(),
                temperature: Some(21.5),
            }
        );
    }

    coordinator.refresh().await.unwrap();
    assert_eq!(events.lock().unwrap().len(), 3, "unchanged data fires no events");
}

#[tokio::test]
async fn snapshot_callbacks_skip_failed_cycles() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(200).set_body_json(thermostats(21.0))).await;
    mount_once(&server, ResponseTemplate::new(502)).await;

    let seen: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(vec![]));
    let seen_clone = seen.clone();
    let coordinator = Coordinator::builder(client(&server))
        .on_snapshot(move |snapshot| seen_clone.lock().unwrap().push(snapshot.len()))
        .build();

    coordinator.refresh().await.unwrap();
    let _ = coordinator.refresh().await;

    assert_eq!(*seen.lock().unwrap(), vec![2]);
}

#[tokio::test]
async fn request_refresh_wakes_poller() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/thermostats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermostats(21.0)))
        .mount(&server)
        .await;

    let coordinator = Arc::new(
        Coordinator::builder(client(&server))
            .interval(Duration::from_secs(3600))
            .build(),
    );
    let mut rx = coordinator.subscribe();
    let poller = coordinator.spawn();

    coordinator.request_refresh();
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("refresh should run well before the next tick")
        .unwrap();
    assert!(coordinator.snapshot().is_some());

    poller.stop().await;
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn poller_refreshes_on_interval() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/thermostats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermostats(21.0)))
        .mount(&server)
        .await;

    let coordinator = Arc::new(
        Coordinator::builder(client(&server))
            .interval(Duration::from_millis(50))
            .build(),
    );
    let mut rx = coordinator.subscribe();
    let poller = coordinator.spawn();

    for _ in 0..2 {
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("scheduled refresh")
            .unwrap();
    }

    poller.stop().await;
    assert!(server.received_requests().await.unwrap().len() >= 2);
}

#[tokio::test]
async fn poller_survives_failed_cycles() {
    let server = MockServer::start().await;
    mount_once(&server, ResponseTemplate::new(500)).await;
    Mock::given(method("GET"))
        .and(path("/api/thermostats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermostats(21.0)))
        .mount(&server)
        .await;

    let coordinator = Arc::new(
        Coordinator::builder(client(&server))
            .interval(Duration::from_millis(50))
            .build(),
    );
    let mut rx = coordinator.subscribe();
    let poller = coordinator.spawn();

    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("poller should keep going after a failed cycle")
        .unwrap();
    assert!(coordinator.last_update_success());
    assert!(!poller.is_finished());

    poller.stop().await;
}

#[tokio::test]
async fn dropping_handle_ends_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/thermostats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(thermostats(21.0)))
        .mount(&server)
        .await;

    let coordinator = Arc::new(
        Coordinator::builder(client(&server))
            .interval(Duration::from_millis(50))
            .build(),
    );
    let poller = coordinator.spawn();
    drop(poller);

    // Let any fetch that was already in flight settle.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let settled = server.received_requests().await.unwrap().len();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(server.received_requests().await.unwrap().len(), settled);
}

#[tokio::test]
async fn zero_interval_falls_back_to_default() {
    let server = MockServer::start().await;
    let coordinator = Coordinator::builder(client(&server))
        .interval(Duration::ZERO)
        .build();
    assert_eq!(coordinator.interval(), DEFAULT_SCAN_INTERVAL);
}
