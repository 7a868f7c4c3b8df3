//! Integration tests for the transports, driven by stand-in `ssh` and `sftp`
//! programs.

mod common;

use common::*;
use hostexec::config::Transport;
use hostexec::connection::{
    connect, Connection, ConnectionConfig, ConnectionError, ExecuteOptions, SshConnection,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

fn ssh_config(ssh: &Path) -> ConnectionConfig {
    ConnectionConfig {
        ssh_executable: ssh.to_string_lossy().to_string(),
        remote_user: "deploy".to_string(),
        timeout: Duration::from_secs(5),
        ..ConnectionConfig::default()
    }
}

fn sftp_config(sftp: &Path) -> ConnectionConfig {
    ConnectionConfig {
        sftp_executable: sftp.to_string_lossy().to_string(),
        ..ConnectionConfig::default()
    }
}

// ============================================================================
// Command execution
// ============================================================================

#[tokio::test]
async fn test_plain_command_arguments() {
    let dir = TestDir::new();
    let (ssh, log) = dir.recording_ssh();
    let config = ConnectionConfig {
        extra_args: vec!["-C".to_string()],
        ..ssh_config(&ssh)
    };
    let conn = SshConnection::new("web1", Some(2222), Arc::new(config));

    let result = conn
        .execute("uptime", &ExecuteOptions::new())
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.stdout, "remote-output\n");

    let args = std::fs::read_to_string(log).unwrap();
    assert_eq!(
        args.lines().collect::<Vec<_>>(),
        vec![
            "-tt",
            "-o",
            "StrictHostKeyChecking=no",
            "-o",
            "Port=2222",
            "-C",
            "deploy@web1",
            "uptime",
        ]
    );
}

#[tokio::test]
async fn test_escalated_command_is_wrapped() {
    let dir = TestDir::new();
    let (ssh, log) = dir.recording_ssh();
    let conn = SshConnection::new("web1", None, Arc::new(ssh_config(&ssh)));

    let options = ExecuteOptions::new().with_escalation(Some("app".to_string()));
    let result = conn.execute("ls -l '/srv/a b'", &options).await.unwrap();
    assert!(result.success);

    let args = std::fs::read_to_string(log).unwrap();
    let remote = args.lines().last().unwrap();
    assert!(remote.starts_with("sudo -k && sudo -p \"[sudo via hostexec, key="));
    assert!(remote.contains("] password: \" -u app -- \"$SHELL\" -c "));
    assert!(remote.ends_with(r#"'ls -l '\''/srv/a b'\'''"#));
}

#[tokio::test]
async fn test_escalation_handshake() {
    let dir = TestDir::new();
    let ssh = dir.prompting_ssh();
    let config = ssh_config(&ssh).with_sudo_password("s3cret");
    let conn = SshConnection::new("web1", None, Arc::new(config));

    let options = ExecuteOptions::new().with_escalation(None);
    let result = conn.execute("id -u", &options).await.unwrap();

    assert!(result.success);
    assert!(result.stdout.contains("authenticated:s3cret\n"));
    // stderr is merged into stdout on the escalation path
    assert!(result.stdout.contains("diagnostics\n"));
    assert!(!result.stdout.contains("password:"));
    assert_eq!(result.stderr, "");
}

#[tokio::test]
async fn test_escalation_without_password_skips_handshake() {
    let dir = TestDir::new();
    let ssh = dir.prompting_ssh();
    let conn = SshConnection::new("web1", None, Arc::new(ssh_config(&ssh)));

    let options = ExecuteOptions::new().with_escalation(None);
    let result = conn.execute("id -u", &options).await.unwrap();

    assert!(result.stdout.contains("] password: "));
    assert!(result.stdout.contains("authenticated:\n"));
}

#[tokio::test]
async fn test_prompt_closed() {
    let dir = TestDir::new();
    let ssh = dir.script("closing-ssh", "echo 'Permission denied (publickey).' >&2\nexit 255");
    let config = ssh_config(&ssh).with_sudo_password("s3cret");
    let conn = SshConnection::new("web1", None, Arc::new(config));

    let err = conn
        .execute("id -u", &ExecuteOptions::new().with_escalation(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::PromptClosed { ref host } if host == "web1"));
}

#[tokio::test]
async fn test_prompt_timeout() {
    let dir = TestDir::new();
    let ssh = dir.script("silent-ssh", "exec sleep 5");
    let config = ConnectionConfig {
        timeout: Duration::from_millis(200),
        ..ssh_config(&ssh)
    }
    .with_sudo_password("s3cret");
    let conn = SshConnection::new("web1", None, Arc::new(config));

    let err = conn
        .execute("id -u", &ExecuteOptions::new().with_escalation(None))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::PromptTimeout { .. }));
}

#[tokio::test]
async fn test_missing_ssh_binary() {
    let config = ConnectionConfig {
        ssh_executable: "/nonexistent/hostexec-ssh".to_string(),
        ..ConnectionConfig::default()
    };
    let conn = SshConnection::new("web1", None, Arc::new(config));
    let err = conn
        .execute("true", &ExecuteOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::SpawnFailed { .. }));
}

#[tokio::test]
async fn test_stdin_handle_reaches_command() {
    use tokio::io::AsyncWriteExt;

    let dir = TestDir::new();
    let ssh = dir.script("cat-ssh", "cat");
    let conn = SshConnection::new("web1", None, Arc::new(ssh_config(&ssh)));

    let mut process = conn
        .exec_command("cat", &ExecuteOptions::new())
        .await
        .unwrap();
    let mut stdin = process.stdin.take().unwrap();
    stdin.write_all(b"piped input\n").await.unwrap();
    drop(stdin);

    let result = process.wait_with_output().await.unwrap();
    assert_eq!(result.stdout, "piped input\n");
}

// ============================================================================
// File transfer
// ============================================================================

#[tokio::test]
async fn test_put_writes_batch_script() {
    let dir = TestDir::new();
    let (sftp, batch) = dir.sftp(0);
    let src = dir.file("payload.txt", "data");
    let conn = SshConnection::new("web1", None, Arc::new(sftp_config(&sftp)));

    conn.put_file(&src, "/srv/my file.txt").await.unwrap();

    assert_eq!(
        std::fs::read_to_string(batch).unwrap(),
        format!("put {} \"/srv/my file.txt\"\nquit\n", src.display())
    );
}

#[tokio::test]
async fn test_put_failure_reports_output() {
    let dir = TestDir::new();
    let (sftp, _) = dir.sftp(1);
    let src = dir.file("payload.txt", "data");
    let conn = SshConnection::new("web1", None, Arc::new(sftp_config(&sftp)));

    let err = conn.put_file(&src, "/srv/payload.txt").await.unwrap_err();
    match err {
        ConnectionError::TransferFailed {
            path,
            stdout,
            stderr,
        } => {
            assert_eq!(path, "/srv/payload.txt");
            assert!(stdout.contains("transfer attempted"));
            assert!(stderr.contains("permission denied"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_fetch_checks_local_directory() {
    let dir = TestDir::new();
    let (sftp, batch) = dir.sftp(0);
    let conn = SshConnection::new("web1", None, Arc::new(sftp_config(&sftp)));

    let err = conn
        .fetch_file("/etc/motd", &dir.path().join("missing/motd"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::FileNotFound(_)));
    assert!(!batch.exists());

    let local = dir.path().join("motd");
    conn.fetch_file("/etc/motd", &local).await.unwrap();
    assert_eq!(
        std::fs::read_to_string(batch).unwrap(),
        format!("get /etc/motd {}\nquit\n", local.display())
    );
}

#[tokio::test]
async fn test_fetch_failure_names_remote_path() {
    let dir = TestDir::new();
    let (sftp, _) = dir.sftp(2);
    let conn = SshConnection::new("web1", None, Arc::new(sftp_config(&sftp)));

    let err = conn
        .fetch_file("/etc/shadow", &dir.path().join("shadow"))
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectionError::TransferFailed { ref path, .. } if path == "/etc/shadow"));
}

// ============================================================================
// Transport selection
// ============================================================================

#[tokio::test]
async fn test_connect_picks_transport() {
    let config = Arc::new(ConnectionConfig::default());

    let ssh = connect(Transport::Ssh, "web1", Some(22), Arc::clone(&config));
    assert_eq!(ssh.identifier(), "root@web1");

    let local = connect(Transport::Local, "web1", None, config);
    assert_eq!(local.identifier(), "web1");
    let result = local
        .execute("echo $((6 * 7))", &ExecuteOptions::new())
        .await
        .unwrap();
    assert_eq!(result.stdout, "42\n");
}
