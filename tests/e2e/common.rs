// E2E test harness: spawns a real `ledis-engine` process against a scratch
// data directory and an ephemeral port, and hands back a `redis` client
// connected to it. Grounded on the teacher's `tests/e2e/common.rs` shape
// (`TestRedisServer::start`/`stop`), filled in with an actual process spawn
// since the teacher's version was a placeholder that assumed an
// already-running server.

use std::net::TcpListener;
use std::process::{Child, Command};
use std::time::Duration;

pub struct TestServer {
    process: Child,
    _data_dir: tempfile::TempDir,
    pub port: u16,
}

/// Grab an OS-assigned free port by binding then immediately releasing it.
/// Small race against another process winning the same port between our
/// drop and the server's bind, acceptable for single-threaded test runs.
fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind ephemeral port");
    listener.local_addr().unwrap().port()
}

impl TestServer {
    /// Start a fresh `ledis-engine` process bound to an ephemeral port with
    /// its own scratch data directory, and block until it accepts
    /// connections.
    pub async fn start() -> Self {
        let data_dir = tempfile::tempdir().expect("failed to create scratch data dir");
        let port = free_port();

        let config_path = data_dir.path().join("ledis.toml");
        std::fs::write(
            &config_path,
            format!(
                "data_dir = \"{}\"\nbind = \"127.0.0.1\"\nport = {}\nn_db = 16\n",
                data_dir.path().join("data").display(),
                port
            ),
        )
        .expect("failed to write test config");

        let bin = assert_cmd::cargo::cargo_bin("ledis-engine");
        let process = Command::new(bin)
            .arg(&config_path)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .expect("failed to spawn ledis-engine");

        let server = Self {
            process,
            _data_dir: data_dir,
            port,
        };
        server.wait_ready().await;
        server
    }

    async fn wait_ready(&self) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Ok(mut conn) = self.get_async_connection().await {
                let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
                if pong.is_ok() {
                    return;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("ledis-engine did not become ready within 5s");
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    fn client(&self) -> redis::Client {
        redis::Client::open(format!("redis://127.0.0.1:{}", self.port)).expect("failed to build redis client")
    }

    pub async fn get_async_connection(&self) -> redis::RedisResult<redis::aio::Connection> {
        self.client().get_async_connection().await
    }

    pub async fn stop(mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.process.kill();
    }
}

pub async fn setup() -> (TestServer, redis::aio::Connection) {
    let server = TestServer::start().await;
    let conn = server.get_async_connection().await.expect("failed to connect to ledis-engine");
    (server, conn)
}
