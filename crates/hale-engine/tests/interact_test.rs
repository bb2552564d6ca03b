mod common;

use common::{Call, MockDriver, test_config};
use hale_core::locator::LocatorSet;
use hale_engine::interact::InteractError;
use hale_engine::{Interactor, ScenarioCoordinator};
use std::sync::Arc;

fn setup(dir: &std::path::Path) -> (Arc<ScenarioCoordinator>, Arc<hale_core::config::HarnessConfig>) {
    let config = Arc::new(test_config(dir));
    (
        Arc::new(ScenarioCoordinator::new(Arc::clone(&config))),
        config,
    )
}

#[tokio::test]
async fn click_uses_primary_when_it_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    handle.make_available("#btn-a");
    let ctx = coordinator.begin("Primary click");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    let locators = LocatorSet::with_fallbacks("#btn-a", ["#btn-b", "#btn-c"]);
    ui.click(&locators).await.unwrap();

    let calls = handle.calls();
    assert!(calls.contains(&Call::Click("#btn-a".into())));
    assert!(!calls.iter().any(|c| matches!(c, Call::Click(s) if s == "#btn-b")));
    assert!(coordinator.ledger().is_empty());
}

#[tokio::test]
async fn click_falls_back_and_records_the_dead_locator() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    handle.make_available("#btn-b");
    let ctx = coordinator.begin("Fallback click");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    ui.click(&LocatorSet::with_fallbacks("#btn-a", ["#btn-b"]))
        .await
        .unwrap();

    assert!(handle.calls().contains(&Call::Click("#btn-b".into())));
    let records = coordinator.ledger().snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].locator, "#btn-a");
    assert_eq!(records[0].action, "click");
    assert_eq!(records[0].impacted_scenarios, vec!["Fallback click"]);
}

#[tokio::test]
async fn click_divides_the_global_budget_across_fallbacks() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    let ctx = coordinator.begin("Budget");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    let locators = LocatorSet::with_fallbacks("#a", ["#b", "#c", "#d"]);
    let err = ui.click(&locators).await.unwrap_err();
    assert!(matches!(
        err,
        InteractError::LocatorsExhausted { action: "click" }
    ));

    // 10s global wait over four selectors.
    let waits = handle.selector_waits();
    assert_eq!(
        waits,
        vec![
            ("#a".to_string(), 2500),
            ("#b".to_string(), 2500),
            ("#c".to_string(), 2500),
            ("#d".to_string(), 2500),
        ]
    );
    assert_eq!(coordinator.ledger().snapshot().len(), 4);
}

#[tokio::test]
async fn fill_does_not_wait_for_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    handle.make_available("#user");
    let ctx = coordinator.begin("Fill");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    ui.fill(&LocatorSet::new("#user"), "admin").await.unwrap();

    let calls = handle.calls();
    assert!(calls.contains(&Call::Fill("#user".into(), "admin".into())));
    assert!(!calls.contains(&Call::WaitForLoad));
}

#[tokio::test]
async fn read_text_is_trimmed() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    handle.set_text("#msg", "  welcome back  \n");
    let ctx = coordinator.begin("Read");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    let text = ui.read_text(&LocatorSet::new("#msg")).await.unwrap();
    assert_eq!(text, "welcome back");
}

#[tokio::test]
async fn visibility_uses_the_full_budget_per_attempt() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    let ctx = coordinator.begin("Visibility");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    let visible = ui
        .is_visible(&LocatorSet::with_fallbacks("#banner", ["#banner-alt"]))
        .await;

    assert!(!visible);
    let waits = handle.selector_waits();
    assert_eq!(
        waits,
        vec![
            ("#banner".to_string(), 10_000),
            ("#banner-alt".to_string(), 10_000),
        ]
    );
    // Exhaustion is an answer, not an error, but it still feeds the ledger.
    let records = coordinator.ledger().snapshot();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].action, "check_visible");
}

#[tokio::test]
async fn visibility_short_circuits_on_first_hit() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    handle.make_available("#banner");
    let ctx = coordinator.begin("Visible");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    assert!(
        ui.is_visible(&LocatorSet::with_fallbacks("#banner", ["#banner-alt"]))
            .await
    );
    assert_eq!(handle.selector_waits().len(), 1);
    assert!(coordinator.ledger().is_empty());
}

#[tokio::test]
async fn ledger_keeps_the_first_action_for_a_locator() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    handle.make_available("#fallback");
    let ctx = coordinator.begin("Mixed actions");

    let locators = LocatorSet::with_fallbacks("#primary", ["#fallback"]);
    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    ui.click(&locators).await.unwrap();
    ui.fill(&locators, "x").await.unwrap();

    let records = coordinator.ledger().snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "click");
}

#[tokio::test(start_paused = true)]
async fn url_wait_polls_until_the_fragment_appears() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    {
        let mut state = handle.state();
        state.urls.push_back("https://app.test/login".into());
        state.urls.push_back("https://app.test/login".into());
        state.urls.push_back("https://app.test/Dashboard".into());
    }
    let ctx = coordinator.begin("Url wait");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    ui.wait_for_url_contains("dashboard").await.unwrap();

    let polls = handle
        .calls()
        .iter()
        .filter(|c| **c == Call::CurrentUrl)
        .count();
    assert_eq!(polls, 3);
}

#[tokio::test(start_paused = true)]
async fn url_wait_times_out_with_the_current_url() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    handle
        .state()
        .urls
        .push_back("https://app.test/login".into());
    let ctx = coordinator.begin("Url timeout");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    let err = ui.wait_for_url_contains("dashboard").await.unwrap_err();
    match err {
        InteractError::UrlTimeout { expected, actual } => {
            assert_eq!(expected, "dashboard");
            assert_eq!(actual, "https://app.test/login");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test(start_paused = true)]
async fn page_stable_survives_a_missing_body_and_busy_network() {
    let dir = tempfile::tempdir().unwrap();
    let (coordinator, config) = setup(dir.path());
    let (mut driver, handle) = MockDriver::new();
    let ctx = coordinator.begin("Stability");

    let mut ui = Interactor::new(&mut driver, &ctx, &config);
    ui.wait_for_page_stable().await;

    let calls = handle.calls();
    assert!(calls.iter().any(
        |c| matches!(c, Call::WaitForSelector { selector, .. } if selector == "body")
    ));
    assert!(calls.contains(&Call::WaitForNetworkIdle));
}
