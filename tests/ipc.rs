// tests/ipc.rs
//! Drives the engine through the line protocol the binary speaks.

use serde_json::{json, Value};
use tearoff::app::events::{Reply, UserEvent};
use tearoff::app::handle_ipc_message;
use tearoff::app::state::AppState;
use tearoff::config::EngineConfig;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

struct Session {
    state: AppState,
    proxy: UnboundedSender<UserEvent>,
    replies: UnboundedReceiver<UserEvent>,
}

impl Session {
    fn new() -> Self {
        let (proxy, replies) = mpsc::unbounded_channel();
        Self {
            state: AppState::new(EngineConfig::default()),
            proxy,
            replies,
        }
    }

    fn send(&mut self, command: &str, payload: Value) -> Reply {
        let line = json!({ "command": command, "payload": payload }).to_string();
        self.send_raw(&line)
    }

    fn send_raw(&mut self, line: &str) -> Reply {
        handle_ipc_message(line, &self.proxy, &mut self.state);
        self.state.system.run_idle();
        let UserEvent::Reply(reply) = self.replies.try_recv().expect("one reply per message");
        assert!(self.replies.try_recv().is_err(), "more than one reply");
        reply
    }

    fn ok(&mut self, command: &str, payload: Value) -> Value {
        match self.send(command, payload) {
            Reply::Ok { result } => result,
            other => panic!("{command} failed: {other:?}"),
        }
    }

    fn error_kind(&mut self, command: &str, payload: Value) -> String {
        match self.send(command, payload) {
            Reply::Error { kind, .. } => kind,
            other => panic!("{command} unexpectedly succeeded: {other:?}"),
        }
    }
}

#[test]
fn test_tearoff_and_menubar_session() {
    let mut session = Session::new();
    session.ok("create", json!({ "name": ".m" }));
    session.ok("create", json!({ "name": ".m.file", "config": { "tearoff": false } }));
    session.ok("add", json!({ "name": ".m.file", "type": "command", "config": { "label": "Open" } }));
    session.ok("add", json!({ "name": ".m", "type": "cascade", "config": { "label": "File", "menu": ".m.file" } }));

    let torn = session.ok("invoke", json!({ "name": ".m", "index": "0" }));
    let tearoff = torn["tearoff"].as_str().expect("tear-off clone name").to_string();
    assert_eq!(tearoff, ".m.tearoff");

    let posts = session.ok("entrycget", json!({ "name": &tearoff, "index": "File" }));
    assert_eq!(posts["type"], "cascade");
    assert_ne!(posts["posts"], json!(".m.file"));

    let bar = session.ok("menubar", json!({ "window": ".top", "menu": ".m" }));
    assert_eq!(bar["clone"], ".top.#m");

    session.ok("delete", json!({ "name": ".m", "first": "File" }));
    let removed = session.ok("entrycget", json!({ "name": &tearoff, "index": "end" }));
    assert_eq!(removed["type"], "tearoff");

    session.ok("menubar", json!({ "window": ".top", "menu": null }));
    let violations = session.ok("verify", Value::Null);
    assert_eq!(violations["violations"], json!([]));
}

#[test]
fn test_errors_keep_their_kind() {
    let mut session = Session::new();
    session.ok("create", json!({ "name": ".m" }));

    assert_eq!(session.error_kind("create", json!({ "name": ".m" })), "name_collision");
    assert_eq!(session.error_kind("destroy", json!({ "name": ".nope" })), "unknown_menu");
    assert_eq!(
        session.error_kind("clone", json!({ "name": ".m", "new_name": ".m" })),
        "name_collision"
    );
    assert_eq!(
        session.error_kind("delete", json!({ "name": ".m", "first": "missing*" })),
        "invalid_index"
    );
    assert_eq!(session.error_kind("create", json!({ "nom": ".x" })), "invalid_payload");
    assert_eq!(session.error_kind("frobnicate", Value::Null), "invalid_payload");

    match session.send_raw("{not json") {
        Reply::Error { kind, .. } => assert_eq!(kind, "invalid_message"),
        other => panic!("expected a parse error, got {other:?}"),
    }
}

#[test]
fn test_post_command_callback_runs_and_reports_failure() {
    let mut session = Session::new();
    session.ok("bind", json!({ "command": "refresh" }));
    session.ok("bind", json!({ "command": "broken", "fail": "disk on fire" }));
    session.ok("create", json!({ "name": ".m", "config": { "post_command": "refresh" } }));
    session.ok("create", json!({ "name": ".n", "config": { "post_command": "broken" } }));

    session.ok("post", json!({ "name": ".m" }));
    assert_eq!(session.error_kind("post", json!({ "name": ".n" })), "callback");

    let ran = session.ok("callbacks", Value::Null);
    assert_eq!(ran["ran"], json!(["refresh", "broken"]));
}
