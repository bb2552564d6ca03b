mod common;

use common::{Call, MockDriver, test_config};
use hale_engine::{Session, SessionError, SessionState};
use std::path::PathBuf;
use std::sync::Arc;

fn session(dir: &std::path::Path) -> (Session, common::MockHandle) {
    let config = Arc::new(test_config(dir));
    let (driver, handle) = MockDriver::new();
    (Session::new(Box::new(driver), config), handle)
}

#[tokio::test]
async fn acquire_walks_the_full_resource_ladder() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, handle) = session(dir.path());

    session.acquire().await.unwrap();

    assert_eq!(session.state(), SessionState::PageReady);
    assert!(session.is_page_open());
    assert_eq!(
        handle.calls(),
        vec![
            Call::StartEngine,
            Call::LaunchBrowser("chromium".into()),
            Call::OpenContext,
            Call::OpenPage,
        ]
    );
}

#[tokio::test]
async fn acquire_is_idempotent_once_ready() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, handle) = session(dir.path());

    session.acquire().await.unwrap();
    let calls_after_first = handle.calls().len();
    session.acquire().await.unwrap();

    assert_eq!(handle.calls().len(), calls_after_first);
}

#[tokio::test]
async fn missing_browser_config_fails_before_anything_launches() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path());
    config.browser = None;
    let (driver, handle) = MockDriver::new();
    let mut session = Session::new(Box::new(driver), Arc::new(config));

    let err = session.acquire().await.unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));
    assert!(handle.calls().is_empty());
    assert_eq!(session.state(), SessionState::Unallocated);
}

#[tokio::test]
async fn launch_failure_leaves_the_session_resumable() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, handle) = session(dir.path());
    handle.state().fail_launch = true;

    assert!(session.acquire().await.is_err());
    assert_eq!(session.state(), SessionState::Allocated);

    // Engine is already up; the retry resumes from the browser rung.
    handle.state().fail_launch = false;
    session.acquire().await.unwrap();
    assert_eq!(session.state(), SessionState::PageReady);
    let engine_starts = handle
        .calls()
        .iter()
        .filter(|c| **c == Call::StartEngine)
        .count();
    assert_eq!(engine_starts, 1);
}

#[tokio::test]
async fn finalize_recording_reads_the_path_before_closing() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, handle) = session(dir.path());
    let video = PathBuf::from("videos/run.webm");
    handle.state().video = Some(video.clone());

    session.acquire().await.unwrap();
    let path = session.finalize_recording().await;

    assert_eq!(path, Some(video));
    assert_eq!(session.state(), SessionState::Finalizing);

    let calls = handle.calls();
    let video_at = calls.iter().position(|c| *c == Call::VideoPath).unwrap();
    let page_at = calls.iter().position(|c| *c == Call::ClosePage).unwrap();
    let context_at = calls.iter().position(|c| *c == Call::CloseContext).unwrap();
    assert!(video_at < page_at);
    assert!(page_at < context_at);
}

#[tokio::test]
async fn finalize_recording_is_a_noop_without_a_page() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, handle) = session(dir.path());

    assert_eq!(session.finalize_recording().await, None);
    assert!(handle.calls().is_empty());
}

#[tokio::test]
async fn release_tears_down_in_reverse_order() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, handle) = session(dir.path());

    session.acquire().await.unwrap();
    session.release().await;

    assert_eq!(session.state(), SessionState::Unallocated);
    let calls = handle.calls();
    let teardown: Vec<&Call> = calls
        .iter()
        .filter(|c| {
            matches!(
                c,
                Call::ClosePage | Call::CloseContext | Call::CloseBrowser | Call::ShutdownEngine
            )
        })
        .collect();
    assert_eq!(
        teardown,
        vec![
            &Call::ClosePage,
            &Call::CloseContext,
            &Call::CloseBrowser,
            &Call::ShutdownEngine,
        ]
    );
}

#[tokio::test]
async fn release_after_finalize_skips_page_and_context() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, handle) = session(dir.path());

    session.acquire().await.unwrap();
    session.finalize_recording().await;
    let before = handle.calls().len();
    session.release().await;

    let calls = handle.calls();
    assert_eq!(
        &calls[before..],
        &[Call::CloseBrowser, Call::ShutdownEngine]
    );
}

#[tokio::test]
async fn release_continues_past_dead_sub_resources() {
    let dir = tempfile::tempdir().unwrap();
    let (mut session, handle) = session(dir.path());
    {
        let mut state = handle.state();
        state.fail_close_page = true;
        state.fail_close_context = true;
    }

    session.acquire().await.unwrap();
    session.release().await;

    assert_eq!(session.state(), SessionState::Unallocated);
    let calls = handle.calls();
    assert!(calls.contains(&Call::CloseBrowser));
    assert!(calls.contains(&Call::ShutdownEngine));
}
