//! Collections and configuration surviving a restart.

use crate::helpers::{ArcadeWindow, engine_over, test_config};
use autogame::config::AutomationConfig;
use autogame::engine::{CommandStatus, Iteration, Stores};
use autogame::executor::ExecutorRegistry;
use autogame::vision::parse_cooldown;
use autogame::{Account, EngineCommand, GameTask, TaskCategory, TaskPriority};
use chrono::DateTime;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn edits_survive_an_engine_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let window = Arc::new(ArcadeWindow::new("LDPlayer-1"));

    let task = GameTask::new("Guild donate", TaskCategory::Guild).with_priority(TaskPriority::High);
    let task_id = task.id.clone();
    let account = Account::new("alt", "LDPlayer-1").with_scale_factor(1.5);
    let account_id = account.id.clone();
    {
        let (mut engine, _rx) = engine_over(window.clone(), &config, ExecutorRegistry::new());
        assert_eq!(
            engine.submit(EngineCommand::AddTask(task)).unwrap(),
            CommandStatus::Applied
        );
        engine.submit(EngineCommand::AddAccount(account)).unwrap();
        engine
            .submit(EngineCommand::SetAccountActive {
                id: account_id.clone(),
                active: false,
            })
            .unwrap();
    }

    let (mut engine, _rx) = engine_over(window, &config, ExecutorRegistry::new());
    engine.load_data().unwrap();
    let stores = engine.stores().unwrap();
    let task = stores.scheduler.get(&task_id).unwrap();
    assert_eq!(task.name, "Guild donate");
    assert_eq!(task.priority, TaskPriority::High);
    let account = stores.rotator.get(&account_id).unwrap();
    assert!(!account.active);
    assert!((account.scale_factor - 1.5).abs() < f64::EPSILON);
}

#[test]
fn failure_streak_is_persisted_and_disables_the_task() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    // No window with this title exists, so every attempt fails.
    let window = Arc::new(ArcadeWindow::new("somewhere else"));
    let (mut engine, _rx) = engine_over(window, &config, ExecutorRegistry::with_defaults(&config));

    let task = GameTask::new("Gift", TaskCategory::Gift).with_next_run(DateTime::UNIX_EPOCH);
    let task_id = task.id.clone();
    let max_retries = task.max_retries;
    engine.submit(EngineCommand::AddTask(task)).unwrap();
    engine
        .submit(EngineCommand::AddAccount(Account::new("main", "LDPlayer-1")))
        .unwrap();

    for _ in 0..max_retries {
        let iteration = engine.run_once().unwrap();
        assert!(matches!(iteration, Iteration::Attempted { success: false, .. }));
    }
    drop(engine);

    let mut stores = Stores::open(&config.storage);
    stores.load_all();
    let task = stores.scheduler.get(&task_id).unwrap();
    assert_eq!(task.retry_count, max_retries);
    assert!(!task.enabled);
    assert!(stores.rotator.accounts()[0].has_run());
}

#[test]
fn corrupt_task_file_loads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    std::fs::create_dir_all(config.storage.data_root()).unwrap();
    std::fs::write(config.storage.tasks_path(), "{ not json").unwrap();

    let mut stores = Stores::open(&config.storage);
    stores.load_all();
    assert!(stores.scheduler.tasks().is_empty());
    assert!(stores.rotator.accounts().is_empty());
}

#[test]
fn config_round_trips_through_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let mut config = test_config(dir.path());
    config.popup.max_attempts = 7;
    config.gift.padding_max_secs = 20;
    config.save_to_file(&path).unwrap();

    let loaded = AutomationConfig::from_file(&path).unwrap();
    assert_eq!(loaded.popup.max_attempts, 7);
    assert_eq!(loaded.gift.padding_max_secs, 20);
    assert_eq!(loaded.engine.idle_poll(), Duration::from_millis(5));
    assert_eq!(loaded.storage.data_dir, config.storage.data_dir);
    assert!(loaded.validate().is_ok());
}

#[test]
fn partial_config_fills_defaults_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[vision]\nmatch_threshold = 1.5\n").unwrap();

    let loaded = AutomationConfig::from_file(&path).unwrap();
    assert_eq!(loaded.popup.max_attempts, 5);
    assert!(loaded.validate().is_err());

    let missing = AutomationConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert!(missing.validate().is_ok());
}

#[test]
fn cooldown_text_is_parsed_like_the_screen_reader_does() {
    assert_eq!(parse_cooldown("01:02:03"), Duration::from_secs(3723));
    assert_eq!(parse_cooldown(" 1d2h "), Duration::from_secs(93_600));
    assert_eq!(parse_cooldown("Claim!"), Duration::ZERO);
}
