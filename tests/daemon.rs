//! Integration tests for the presence daemon socket loop.
//!
//! Each test starts a real server on a temp socket with scripted OS
//! providers, connects a raw client, and checks the framed stream.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UnixStream;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use roster::config::PresenceConfig;
use roster::icon::IconCache;
use roster::ipc::client;
use roster::ipc::server::Server;
use roster::presence::Aggregator;
use roster::protocol::SocketMessage;
use roster::source::{
    ActivationPolicy, RunningApp, WindowServer, Workspace, WorkspaceEvent, WorkspaceEventKind,
};

struct StaticWorkspace(Vec<RunningApp>);

impl Workspace for StaticWorkspace {
    fn running_apps(&self) -> Vec<RunningApp> {
        self.0.clone()
    }
}

struct NoWindows;

impl WindowServer for NoWindows {
    fn window_owners(&self) -> HashMap<u32, i32> {
        HashMap::new()
    }

    fn ordered_windows(&self) -> Vec<u32> {
        Vec::new()
    }
}

fn regular(name: &str, pid: i32, active: bool) -> RunningApp {
    RunningApp {
        name: name.to_string(),
        pid,
        policy: ActivationPolicy::Regular,
        active,
        bundle_path: String::new(),
    }
}

fn event(kind: WorkspaceEventKind, app: RunningApp) -> WorkspaceEvent {
    WorkspaceEvent { kind, app }
}

/// Bind a server on a temp socket with a fixed registry snapshot.
fn bind_server(
    dir: &tempfile::TempDir,
    apps: Vec<RunningApp>,
) -> (
    Server,
    mpsc::Sender<WorkspaceEvent>,
    CancellationToken,
    PathBuf,
) {
    let socket_path = dir.path().join("roster.sock");
    let config = PresenceConfig {
        include_installed: false,
        app_dirs: Vec::new(),
        poll_interval_ms: 500,
    };
    let aggregator = Aggregator::new(
        Box::new(StaticWorkspace(apps)),
        Box::new(NoWindows),
        Arc::new(IconCache::new(dir.path().join("icons"))),
        &config,
    );
    let (events_tx, events_rx) = mpsc::channel(16);
    let shutdown = CancellationToken::new();
    let server = Server::bind(socket_path.clone(), aggregator, events_rx, shutdown.clone())
        .expect("bind failed");
    (server, events_tx, shutdown, socket_path)
}

async fn next_message(stream: &mut UnixStream) -> SocketMessage {
    timeout(Duration::from_secs(3), client::read_message(stream))
        .await
        .expect("timed out waiting for a message")
        .expect("read failed")
        .expect("stream closed")
}

async fn stop(shutdown: CancellationToken, handle: tokio::task::JoinHandle<()>) {
    shutdown.cancel();
    timeout(Duration::from_secs(3), handle)
        .await
        .expect("server did not stop")
        .expect("server task panicked");
}

#[tokio::test]
async fn test_client_receives_initial_list() {
    let dir = tempfile::tempdir().unwrap();
    let (server, _events, shutdown, socket_path) = bind_server(
        &dir,
        vec![regular("Mail", 10, true), regular("Safari", 11, false)],
    );
    let handle = tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;

    let mut stream = client::connect(&socket_path).await.unwrap();
    match next_message(&mut stream).await {
        SocketMessage::List(apps) => {
            assert_eq!(apps.len(), 2);
            assert_eq!(apps[0].name, "Mail");
            assert!(apps[0].active);
            assert_eq!(apps[1].name, "Safari");
        }
        other => panic!("expected list, got {other:?}"),
    }

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_events_stream_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (server, events, shutdown, socket_path) =
        bind_server(&dir, vec![regular("Mail", 10, true)]);
    let handle = tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;

    let mut stream = client::connect(&socket_path).await.unwrap();
    assert!(matches!(
        next_message(&mut stream).await,
        SocketMessage::List(_)
    ));

    events
        .send(event(
            WorkspaceEventKind::Launched,
            regular("Safari", 20, false),
        ))
        .await
        .unwrap();
    events
        .send(event(
            WorkspaceEventKind::Activated,
            regular("Safari", 20, true),
        ))
        .await
        .unwrap();
    events
        .send(event(
            WorkspaceEventKind::Terminated,
            regular("Mail", 10, false),
        ))
        .await
        .unwrap();

    match next_message(&mut stream).await {
        SocketMessage::Launch(app) => assert_eq!(app.name, "Safari"),
        other => panic!("expected launch, got {other:?}"),
    }
    match next_message(&mut stream).await {
        SocketMessage::Activate(app) => {
            assert_eq!(app.name, "Safari");
            assert!(app.active);
        }
        other => panic!("expected activate, got {other:?}"),
    }
    match next_message(&mut stream).await {
        SocketMessage::Close(app) => assert_eq!(app.name, "Mail"),
        other => panic!("expected close, got {other:?}"),
    }

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_second_client_waits_for_first() {
    let dir = tempfile::tempdir().unwrap();
    let (server, _events, shutdown, socket_path) =
        bind_server(&dir, vec![regular("Mail", 10, true)]);
    let handle = tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;

    let mut first = client::connect(&socket_path).await.unwrap();
    assert!(matches!(
        next_message(&mut first).await,
        SocketMessage::List(_)
    ));

    // The second connection queues in the listen backlog; it must not
    // receive anything while the first client holds the slot.
    let mut second = client::connect(&socket_path).await.unwrap();
    let waited = timeout(Duration::from_millis(300), client::read_message(&mut second)).await;
    assert!(waited.is_err(), "second client got data while first was connected");

    drop(first);

    match next_message(&mut second).await {
        SocketMessage::List(apps) => assert_eq!(apps[0].name, "Mail"),
        other => panic!("expected list, got {other:?}"),
    }

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_event_without_client_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let (server, events, shutdown, socket_path) =
        bind_server(&dir, vec![regular("Mail", 10, true)]);
    let handle = tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;

    // No client yet: this event has nobody to go to.
    events
        .send(event(
            WorkspaceEventKind::Launched,
            regular("Ghost", 99, false),
        ))
        .await
        .unwrap();
    sleep(Duration::from_millis(100)).await;

    let mut stream = client::connect(&socket_path).await.unwrap();
    assert!(matches!(
        next_message(&mut stream).await,
        SocketMessage::List(_)
    ));

    // The next message must be this one, not the dropped launch.
    events
        .send(event(
            WorkspaceEventKind::Activated,
            regular("Mail", 10, true),
        ))
        .await
        .unwrap();
    match next_message(&mut stream).await {
        SocketMessage::Activate(app) => assert_eq!(app.name, "Mail"),
        other => panic!("expected activate, got {other:?}"),
    }

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_background_process_events_are_silent() {
    let dir = tempfile::tempdir().unwrap();
    let (server, events, shutdown, socket_path) =
        bind_server(&dir, vec![regular("Mail", 10, true)]);
    let handle = tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;

    let mut stream = client::connect(&socket_path).await.unwrap();
    assert!(matches!(
        next_message(&mut stream).await,
        SocketMessage::List(_)
    ));

    let mut agent = regular("Spotlight", 40, false);
    agent.policy = ActivationPolicy::Accessory;
    events
        .send(event(WorkspaceEventKind::Terminated, agent))
        .await
        .unwrap();
    events
        .send(event(
            WorkspaceEventKind::Launched,
            regular("Safari", 20, false),
        ))
        .await
        .unwrap();

    // The agent termination produced no envelope; the launch is next.
    match next_message(&mut stream).await {
        SocketMessage::Launch(app) => assert_eq!(app.name, "Safari"),
        other => panic!("expected launch, got {other:?}"),
    }

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_reconnect_gets_fresh_list() {
    let dir = tempfile::tempdir().unwrap();
    let (server, _events, shutdown, socket_path) =
        bind_server(&dir, vec![regular("Mail", 10, true)]);
    let handle = tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;

    let mut stream = client::connect(&socket_path).await.unwrap();
    assert!(matches!(
        next_message(&mut stream).await,
        SocketMessage::List(_)
    ));
    drop(stream);
    sleep(Duration::from_millis(100)).await;

    let mut stream = client::connect(&socket_path).await.unwrap();
    match next_message(&mut stream).await {
        SocketMessage::List(apps) => assert_eq!(apps.len(), 1),
        other => panic!("expected list, got {other:?}"),
    }

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_stale_socket_file_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let socket_path = dir.path().join("roster.sock");
    std::fs::write(&socket_path, b"stale").unwrap();

    let (server, _events, shutdown, socket_path) =
        bind_server(&dir, vec![regular("Mail", 10, true)]);
    let handle = tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;

    let mut stream = client::connect(&socket_path).await.unwrap();
    assert!(matches!(
        next_message(&mut stream).await,
        SocketMessage::List(_)
    ));

    stop(shutdown, handle).await;
}

#[tokio::test]
async fn test_shutdown_removes_socket_file() {
    let dir = tempfile::tempdir().unwrap();
    let (server, _events, shutdown, socket_path) =
        bind_server(&dir, vec![regular("Mail", 10, true)]);
    let handle = tokio::spawn(server.run());
    sleep(Duration::from_millis(50)).await;
    assert!(socket_path.exists());

    stop(shutdown, handle).await;
    assert!(!socket_path.exists());
}
