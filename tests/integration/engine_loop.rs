//! End-to-end engine iterations against a scripted emulator window.

use crate::helpers::{ArcadeWindow, drain_events, engine_over, files_under, test_config};
use autogame::engine::{EngineEvent, IdleReason, Iteration};
use autogame::executor::{ExecutionContext, ExecutionOutcome, ExecutorRegistry, TaskExecutor};
use autogame::vision::Point;
use autogame::{Account, EngineCommand, GameTask, TaskCategory};
use chrono::DateTime;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records which account each attempt ran for.
#[derive(Default)]
struct Recorder {
    accounts: Mutex<Vec<String>>,
}

impl TaskExecutor for Recorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    fn execute(&self, ctx: &mut ExecutionContext<'_>) -> autogame::Result<ExecutionOutcome> {
        self.accounts
            .lock()
            .unwrap()
            .push(ctx.account.name.clone());
        Ok(ExecutionOutcome::Completed { reschedule: None })
    }
}

fn due_task(name: &str, category: TaskCategory) -> GameTask {
    GameTask::new(name, category).with_next_run(DateTime::UNIX_EPOCH)
}

#[test]
fn stuck_popup_fails_the_task_and_saves_a_screenshot() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let window = Arc::new(
        ArcadeWindow::new("LDPlayer-1").with_overlay("Popup/CloseX.png", Point::new(5, 5), true),
    );
    let (mut engine, mut rx) =
        engine_over(window.clone(), &config, ExecutorRegistry::with_defaults(&config));

    let task = due_task("Daily gift", TaskCategory::Gift);
    let task_id = task.id.clone();
    engine.submit(EngineCommand::AddTask(task)).unwrap();
    engine
        .submit(EngineCommand::AddAccount(Account::new("main", "LDPlayer-1")))
        .unwrap();

    let iteration = engine.run_once().unwrap();
    assert_eq!(
        iteration,
        Iteration::Attempted {
            task_name: "Daily gift".to_owned(),
            success: false
        }
    );
    assert_eq!(window.clicks().len(), config.popup.max_attempts as usize);

    let shots = files_under(&dir.path().join("shots"));
    assert_eq!(shots.len(), 1, "one debug screenshot expected: {shots:?}");
    let shot = &shots[0];
    assert!(shot.to_string_lossy().ends_with("_popup_fail.png"));
    assert!(image::open(shot).is_ok());

    let stores = engine.stores().unwrap();
    assert_eq!(stores.scheduler.get(&task_id).unwrap().retry_count, 1);
    assert!(drain_events(&mut rx).iter().any(|e| matches!(
        e,
        EngineEvent::Log { message, .. } if message.contains("failed to handle popups")
    )));
}

#[test]
fn popups_are_cleared_before_the_executor_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let window = Arc::new(
        ArcadeWindow::new("LDPlayer-1")
            .with_button("Admin/collect.png", Point::new(20, 20))
            .with_overlay("Popup/Ok.png", Point::new(1, 1), false)
            .with_overlay("Popup/Claim.png", Point::new(2, 2), false),
    );
    let (mut engine, _rx) =
        engine_over(window.clone(), &config, ExecutorRegistry::with_defaults(&config));

    let task = due_task("Collect", TaskCategory::Admin)
        .with_templates(vec![PathBuf::from("Admin/collect.png")]);
    let task_id = task.id.clone();
    engine.submit(EngineCommand::AddTask(task)).unwrap();
    engine
        .submit(EngineCommand::AddAccount(Account::new("main", "LDPlayer-1")))
        .unwrap();

    let iteration = engine.run_once().unwrap();
    assert!(matches!(iteration, Iteration::Attempted { success: true, .. }));
    assert_eq!(window.overlays_left(), 0);
    assert_eq!(
        window.clicks(),
        vec![Point::new(1, 1), Point::new(2, 2), Point::new(20, 20)]
    );

    let task = engine.stores().unwrap().scheduler.get(&task_id).unwrap();
    assert!(task.has_run());
    assert!(task.next_run > task.last_run);
}

#[test]
fn accounts_take_turns_across_iterations() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let window = Arc::new(ArcadeWindow::new("LDPlayer-1"));
    let recorder = Arc::new(Recorder::default());
    let mut executors = ExecutorRegistry::new();
    executors.register(TaskCategory::Quest, recorder.clone());
    let (mut engine, _rx) = engine_over(window, &config, executors);

    for name in ["q1", "q2", "q3"] {
        engine
            .submit(EngineCommand::AddTask(due_task(name, TaskCategory::Quest)))
            .unwrap();
    }
    for name in ["alpha", "beta"] {
        engine
            .submit(EngineCommand::AddAccount(Account::new(name, "LDPlayer-1")))
            .unwrap();
    }

    for _ in 0..3 {
        let iteration = engine.run_once().unwrap();
        assert!(matches!(iteration, Iteration::Attempted { success: true, .. }));
    }
    assert_eq!(
        engine.run_once().unwrap(),
        Iteration::Idle(IdleReason::NoEligibleTask)
    );

    let seen = recorder.accounts.lock().unwrap().clone();
    assert_eq!(seen.len(), 3);
    assert_ne!(seen[0], seen[1]);
    assert_eq!(seen[0], seen[2]);
}

#[tokio::test(flavor = "multi_thread")]
async fn background_worker_runs_tasks_until_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let window = Arc::new(ArcadeWindow::new("LDPlayer-1"));
    let recorder = Arc::new(Recorder::default());
    let mut executors = ExecutorRegistry::new();
    executors.register(TaskCategory::Quest, recorder.clone());
    let (mut engine, mut rx) = engine_over(window, &config, executors);

    let task = due_task("Patrol", TaskCategory::Quest);
    let task_id = task.id.clone();
    engine.submit(EngineCommand::AddTask(task)).unwrap();
    engine
        .submit(EngineCommand::AddAccount(Account::new("main", "LDPlayer-1")))
        .unwrap();

    engine.start().unwrap();
    assert!(engine.is_running());
    let completed = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(event) = rx.recv().await {
            if let EngineEvent::TaskCompleted { task_name, success } = event {
                return Some((task_name, success));
            }
        }
        None
    })
    .await
    .expect("engine did not report a completed task");
    assert_eq!(completed, Some(("Patrol".to_owned(), true)));

    tokio::task::block_in_place(|| engine.stop());
    assert!(!engine.is_running());

    let stores = engine.stores().unwrap();
    assert!(stores.scheduler.get(&task_id).unwrap().has_run());
    assert_eq!(recorder.accounts.lock().unwrap().as_slice(), ["main"]);
}
