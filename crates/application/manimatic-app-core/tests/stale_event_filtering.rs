mod common;

use common::{generated_and_rendered, mounted, script_ok, video_ok, FakeBackend, SESSION};
use manimatic_app_core::dispatcher::RENDER_PENDING_MESSAGE;
use manimatic_app_core::{ClientSettings, SessionFilter, SessionOrchestrator, SessionPhase};
use manimatic_core::{CompileRequest, ErrorKind};

#[tokio::test]
async fn first_session_id_is_pinned_and_foreign_events_dropped() {
    let (backend, handle) = FakeBackend::new();
    let mut orch = mounted(backend).await;

    orch.set_prompt("one");
    orch.generate().await.unwrap();
    handle.push(script_ok(SESSION, "# one"));
    orch.process_next().await;
    assert_eq!(orch.state().session_id.as_deref(), Some(SESSION));

    orch.set_prompt("two");
    orch.generate().await.unwrap();
    handle.push(script_ok("session-b", "# foreign"));
    handle.push(script_ok(SESSION, "# two"));
    orch.process_next().await;
    assert_eq!(orch.state().phase, SessionPhase::AwaitingScript);
    orch.process_next().await;

    let state = orch.state();
    assert_eq!(state.script.as_deref(), Some("# two"));
    assert_eq!(state.session_id.as_deref(), Some(SESSION));
}

#[tokio::test]
async fn disabled_filter_applies_every_session() {
    let (backend, handle) = FakeBackend::new();
    let settings = ClientSettings {
        session_filter: SessionFilter::Off,
        ..ClientSettings::default()
    };
    let mut orch = SessionOrchestrator::new(backend, settings);
    orch.mount().await.unwrap();

    orch.set_prompt("one");
    orch.generate().await.unwrap();
    handle.push(script_ok(SESSION, "# one"));
    orch.process_next().await;

    orch.set_prompt("two");
    orch.generate().await.unwrap();
    handle.push(script_ok("session-b", "# foreign"));
    orch.process_next().await;

    assert_eq!(orch.state().script.as_deref(), Some("# foreign"));
}

#[tokio::test]
async fn late_render_from_previous_generation_is_dropped() {
    let (backend, handle) = FakeBackend::new();
    let mut orch = mounted(backend).await;

    orch.set_prompt("one");
    orch.generate().await.unwrap();
    handle.push(script_ok(SESSION, "# one"));
    orch.process_next().await;

    orch.set_prompt("two");
    orch.generate().await.unwrap();
    handle.push(video_ok(SESSION, "/videos/one.mp4"));
    orch.process_next().await;

    let state = orch.state();
    assert_eq!(state.phase, SessionPhase::AwaitingScript);
    assert!(state.video_url.is_none());
    assert!(state.video_loading());
}

#[tokio::test]
async fn late_script_during_user_compile_is_dropped() {
    let (backend, handle) = FakeBackend::new();
    let mut orch = mounted(backend).await;

    generated_and_rendered(&mut orch, &handle, "# one").await;

    orch.edit_script("# edited").unwrap();
    orch.compile().await.unwrap();
    handle.push(script_ok(SESSION, "# duplicate"));
    handle.push(video_ok(SESSION, "/videos/edited.mp4"));
    orch.process_next().await;
    orch.process_next().await;

    let state = orch.state();
    assert_eq!(state.phase, SessionPhase::VideoReady);
    assert_eq!(state.edited_script, "# edited");
    assert_eq!(state.script.as_deref(), Some("# one"));
}

#[tokio::test]
async fn unknown_and_malformed_events_are_skipped() {
    let (backend, handle) = FakeBackend::new();
    let mut orch = mounted(backend).await;

    orch.set_prompt("p");
    orch.generate().await.unwrap();
    handle.push_raw(r#"{"kind":"render_progress","sessionId":"session-a","data":{"pct":40}}"#);
    handle.push_raw("not json at all");
    handle.push_raw(r#"{"kind":"generate_succeeded","sessionId":"session-a","data":{"oops":1}}"#);
    handle.push(script_ok(SESSION, "# code"));
    orch.process_next().await;

    let state = orch.state();
    assert_eq!(state.phase, SessionPhase::ScriptReady);
    assert_eq!(state.script.as_deref(), Some("# code"));
}

#[tokio::test]
async fn snake_case_session_field_is_accepted() {
    let (backend, handle) = FakeBackend::new();
    let mut orch = mounted(backend).await;

    orch.set_prompt("p");
    orch.generate().await.unwrap();
    handle.push_raw(r##"{"kind":"generate_succeeded","session_id":"legacy","data":{"script":"# s"}}"##);
    orch.process_next().await;

    let state = orch.state();
    assert_eq!(state.session_id.as_deref(), Some("legacy"));
    assert_eq!(state.script.as_deref(), Some("# s"));
}

#[tokio::test]
async fn compile_waits_for_the_chained_render() {
    let (backend, handle) = FakeBackend::new();
    let mut orch = mounted(backend).await;

    orch.set_prompt("one");
    orch.generate().await.unwrap();
    handle.push(script_ok(SESSION, "# one"));
    orch.process_next().await;

    orch.edit_script("x = 1").unwrap();
    let err = orch.compile().await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(err.message, RENDER_PENDING_MESSAGE);
    assert!(handle.compile_calls().is_empty());

    let state = orch.state();
    assert_eq!(state.phase, SessionPhase::ScriptReady);
    assert!(!state.compiling);
    assert!(state.video_loading());

    handle.push(video_ok(SESSION, "/videos/old-script.mp4"));
    orch.process_next().await;
    assert_eq!(
        orch.state().video_url.as_deref(),
        Some("/videos/old-script.mp4")
    );

    orch.compile().await.unwrap();
    assert_eq!(
        handle.compile_calls(),
        vec![CompileRequest {
            script: "x = 1".into()
        }]
    );
    assert!(orch.state().compiling);

    handle.push(video_ok(SESSION, "/videos/edited.mp4"));
    orch.process_next().await;
    let state = orch.state();
    assert_eq!(state.phase, SessionPhase::VideoReady);
    assert!(!state.compiling);
    assert_eq!(state.video_url.as_deref(), Some("/videos/edited.mp4"));
}
