//! Shared helpers: in-process services on real loopback sockets.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use waypoint::{dial, LineChannel, Listener, Registry, Station};

/// Upper bound on any single network step in a test.
pub const STEP: Duration = Duration::from_secs(5);

/// Start a registry and return its port.  The task lives until the test's
/// runtime shuts down.
pub async fn spawn_registry() -> (u16, JoinHandle<()>) {
    let listener = Listener::bind().await.expect("bind registry");
    let port = listener.port();
    let handle = tokio::spawn(async move {
        let _ = Arc::new(Registry::new())
            .run(listener, std::future::pending())
            .await;
    });
    (port, handle)
}

/// Start a station (not registered anywhere) and return its port.
pub async fn spawn_station(id: &str, info: &str) -> (u16, JoinHandle<()>) {
    let station = Arc::new(Station::new(id, info).expect("valid station"));
    let listener = Listener::bind().await.expect("bind station");
    let port = listener.port();
    let handle = tokio::spawn(async move {
        let _ = station.run(listener, None, std::future::pending()).await;
    });
    (port, handle)
}

/// A port with nothing listening on it: bound, then released on return.
pub async fn closed_port() -> u16 {
    let tmp = TcpListener::bind("127.0.0.1:0").await.expect("bind tmp");
    tmp.local_addr().expect("local addr").port()
}

pub async fn connect(port: u16) -> LineChannel {
    tokio::time::timeout(STEP, dial(port))
        .await
        .expect("dial timed out")
        .expect("dial failed")
}

/// Next line, failing the test on timeout, error or end-of-stream.
pub async fn recv(chan: &mut LineChannel) -> String {
    tokio::time::timeout(STEP, chan.receive_line())
        .await
        .expect("receive timed out")
        .expect("receive failed")
        .expect("unexpected end of stream")
}

/// Send `line` and read one reply line.
pub async fn request(chan: &mut LineChannel, line: &str) -> String {
    chan.send(line).await.expect("send failed");
    recv(chan).await
}

/// Poll the registry until `id` is mapped, returning its port.
pub async fn wait_for_mapping(registry_port: u16, id: &str) -> u16 {
    let mut chan = connect(registry_port).await;
    let query = format!("?{id}");
    let poll = async {
        loop {
            let reply = request(&mut chan, &query).await;
            if reply != ";" {
                return reply.parse::<u16>().expect("registry replied a non-port");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(STEP, poll)
        .await
        .expect("mapping never appeared")
}
