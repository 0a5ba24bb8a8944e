use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread;
use tempfile::{tempdir, TempDir};

#[allow(deprecated)]
fn polyz(workdir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("polyz").expect("binary");
    cmd.current_dir(workdir).env("RUST_LOG", "warn");
    cmd
}

fn setup_project() -> TempDir {
    let temp = tempdir().unwrap();
    let root = temp.path();
    fs::write(
        root.join("project.godot"),
        "[application]\nconfig/name=\"Rocks\"\n",
    )
    .unwrap();
    fs::create_dir_all(root.join("actors")).unwrap();
    fs::write(
        root.join("actors/player.gd"),
        "extends CharacterBody2D\nclass_name Player\n\nfunc jump():\n\tpass\n",
    )
    .unwrap();
    fs::write(
        root.join("main.tscn"),
        "[gd_scene format=3]\n\n[node name=\"Main\" type=\"Node2D\"]\n",
    )
    .unwrap();
    temp
}

#[test]
fn index_writes_artifact_and_prints_document() {
    let temp = setup_project();
    let root = temp.path();

    let output = polyz(root).args(["index", "--json"]).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let printed: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(printed["project_name"], "Rocks");
    assert_eq!(printed["metadata"]["total_scripts"], 1);
    assert_eq!(printed["scripts"][0]["file_path"], "res://actors/player.gd");

    let saved = fs::read_to_string(root.join(".polyz/project_index.json")).unwrap();
    assert!(saved.contains("\n\t\"project_name\": \"Rocks\""));
}

#[test]
fn context_prints_enriched_prompt() {
    let temp = setup_project();
    polyz(temp.path())
        .args(["context", "player", "--scene", "res://main.tscn"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("player\n\nContext:\n"))
        .stdout(predicate::str::contains("Currently Edited Scene: res://main.tscn"))
        .stdout(predicate::str::contains("Script: res://actors/player.gd\nextends CharacterBody2D"));
}

#[test]
fn parse_reads_stdin() {
    let temp = tempdir().unwrap();
    polyz(temp.path())
        .arg("parse")
        .write_stdin(r#"{"result":{"response":"ok"}}"#)
        .assert()
        .success()
        .stdout("ok\n");

    polyz(temp.path())
        .arg("parse")
        .write_stdin("<html>502</html>")
        .assert()
        .failure();
}

#[test]
fn invalid_config_is_rejected() {
    let temp = setup_project();
    fs::write(temp.path().join("polyz.toml"), "[backend\n").unwrap();
    polyz(temp.path())
        .args(["context", "player"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config file"));
}

/// Backend stub: point the project's config at a one-shot server that replies
/// with `body` and hands back the raw request it received
fn serve_reply(project: &std::path::Path, body: &'static str) -> thread::JoinHandle<String> {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    fs::write(
        project.join("polyz.toml"),
        format!("[backend]\nhost = \"127.0.0.1\"\nport = {port}\n"),
    )
    .unwrap();

    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = stream.read(&mut buf).unwrap();
            raw.extend_from_slice(&buf[..n]);
            if n == 0 {
                break;
            }
            let text = String::from_utf8_lossy(&raw).to_string();
            let Some(end) = text.find("\r\n\r\n") else { continue };
            let length: usize = text[..end]
                .lines()
                .find_map(|l| l.strip_prefix("Content-Length: "))
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0);
            if raw.len() >= end + 4 + length {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).unwrap();
        String::from_utf8_lossy(&raw).to_string()
    })
}

#[test]
fn ask_round_trip_against_local_backend() {
    let temp = setup_project();
    let server = serve_reply(
        temp.path(),
        r#"{"content":"Call jump() from _physics_process."}"#,
    );

    polyz(temp.path())
        .args(["ask", "how", "do", "I", "jump"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Call jump() from _physics_process."));

    let request = server.join().unwrap();
    let body = &request[request.find("\r\n\r\n").unwrap() + 4..];
    let sent: Value = serde_json::from_str(body).unwrap();
    assert_eq!(sent["prompt"], "how do I jump");
    assert_eq!(sent["project_index"], "{}");
}

#[test]
fn piped_chat_echoes_prompts() {
    let temp = setup_project();
    let server = serve_reply(temp.path(), r#"{"response":"Use move_and_slide()."}"#);

    polyz(temp.path())
        .arg("chat")
        .write_stdin("how do I move\n/quit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("You:\nhow do I move\n"))
        .stdout(predicate::str::contains("Use move_and_slide()."));

    let request = server.join().unwrap();
    assert!(request.contains(r#""prompt":"how do I move""#));
}
