#![cfg(all(unix, feature = "cli"))]

use std::io::{BufRead, BufReader};
use std::io::Lines;
use std::process::{Child, ChildStderr, Command, Output, Stdio};

const BIN: &str = env!("CARGO_BIN_EXE_framewire");

fn framewire() -> Command {
    let mut cmd = Command::new(BIN);
    for var in [
        "FRAMEWIRE_SERVER_ADDRESS",
        "FRAMEWIRE_SERVER_PORT",
        "FRAMEWIRE_WIDTH",
        "FRAMEWIRE_HEIGHT",
        "FRAMEWIRE_PIPELINE",
        "FRAMEWIRE_FRAME_TIMEOUT_MS",
        "FRAMEWIRE_LOG_LEVEL",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

/// A `serve` child process, killed on drop.
struct Served {
    child: Child,
    port: u16,
    // Held open so late server writes to stderr do not hit a closed pipe.
    _stderr: Lines<BufReader<ChildStderr>>,
}

impl Served {
    fn start(extra: &[&str]) -> Self {
        let mut child = framewire()
            .args(["--log-level", "error", "serve", "--address", "127.0.0.1", "--port", "0"])
            .args(extra)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .expect("serve should start");

        let stderr = child.stderr.take().expect("stderr is piped");
        let mut lines = BufReader::new(stderr).lines();
        let port = loop {
            let line = lines
                .next()
                .expect("serve exited before announcing its endpoint")
                .expect("stderr should be readable");
            if let Some(endpoint) = line.strip_prefix("serving on ") {
                let (_, port) = endpoint.rsplit_once(':').expect("tcp endpoint has a port");
                break port.parse().expect("port is numeric");
            }
        };
        Self {
            child,
            port,
            _stderr: lines,
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        let port = self.port.to_string();
        framewire()
            .args(["--format", "json", "--log-level", "error"])
            .args(args)
            .args(["--address", "127.0.0.1", "--port", &port])
            .output()
            .expect("client command should run")
    }
}

impl Drop for Served {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn stdout_json_lines(output: &Output) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line is json"))
        .collect()
}

#[test]
fn version_prints_package_version() {
    let output = framewire().arg("version").output().expect("version should run");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("framewire {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn extended_version_as_json() {
    let output = framewire()
        .args(["--format", "json", "version", "--extended"])
        .output()
        .expect("version should run");
    assert!(output.status.success());

    let info = &stdout_json_lines(&output)[0];
    assert_eq!(info["name"], "framewire");
    assert_eq!(info["default_endpoint"], "127.0.0.1:51234");
    assert_eq!(info["transports"], serde_json::json!(["tcp", "unix"]));
}

#[test]
fn metadata_reports_served_format() {
    let served = Served::start(&["--width", "800", "--height", "600"]);
    let output = served.run(&["metadata"]);
    assert!(output.status.success(), "{output:?}");

    let lines = stdout_json_lines(&output);
    assert_eq!(lines.len(), 1);
    let metadata = &lines[0];
    assert_eq!(metadata["width"], 800);
    assert_eq!(metadata["height"], 600);
    assert_eq!(metadata["colorSpace"], "RGB");
    assert_eq!(metadata["layout"], "planar");
    assert_eq!(metadata["dataType"], "uint8");
}

#[test]
fn grab_prints_one_summary_per_frame() {
    let served = Served::start(&["--width", "32", "--height", "16"]);
    let output = served.run(&["grab", "--count", "3"]);
    assert!(output.status.success(), "{output:?}");

    let frames = stdout_json_lines(&output);
    assert_eq!(frames.len(), 3);
    for (index, frame) in frames.iter().enumerate() {
        assert_eq!(frame["index"], index as u64);
        assert_eq!(frame["size_bytes"], 32 * 16 * 3);
        assert_eq!(frame["complete"], true);
    }
    assert_ne!(frames[0]["checksum"], frames[1]["checksum"]);
}

#[test]
fn grab_stops_at_end_of_stream() {
    let served = Served::start(&["--width", "8", "--height", "8", "--frames", "2"]);
    let output = served.run(&["grab", "--count", "5"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_json_lines(&output).len(), 2);
}

#[test]
fn unsupported_action_is_a_usage_error() {
    let served = Served::start(&[]);

    let output = served.run(&["execute", "reset"]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_json_lines(&output)[0]["status"], "success");

    let output = served.run(&["execute", "zoom"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("zoom"));
}

#[test]
fn result_is_acknowledged() {
    let served = Served::start(&[]);
    let output = served.run(&["result", "--json", r#"{"status":"success"}"#]);
    assert!(output.status.success(), "{output:?}");
    assert_eq!(stdout_json_lines(&output)[0]["request"], "result");
}

#[test]
fn discover_lists_configured_server() {
    let output = framewire()
        .args(["--format", "json", "discover", "--address", "10.1.2.3", "--port", "4000"])
        .output()
        .expect("discover should run");
    assert!(output.status.success());

    let cameras = stdout_json_lines(&output);
    let camera = &cameras[0][0];
    assert_eq!(camera["sourceType"], "framewire");
    assert_eq!(camera["connection"], "10.1.2.3:4000");
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    let port = listener.local_addr().expect("probe addr").port().to_string();
    drop(listener);

    let output = framewire()
        .args(["--log-level", "error", "metadata", "--address", "127.0.0.1", "--port", &port])
        .output()
        .expect("metadata should run");
    assert_eq!(output.status.code(), Some(3));
}
