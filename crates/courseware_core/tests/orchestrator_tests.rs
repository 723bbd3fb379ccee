mod common;

use common::{generated_text, week, MemoryRepo, ScriptedGenerator};
use courseware_core::{
    BatchProgress, ContentType, ContextField, CoreError, ModuleOutline, Orchestrator, Pacing,
    PortError, Workspace,
};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

async fn workspace_with(repo: Arc<MemoryRepo>, weeks: u32) -> Mutex<Workspace> {
    let mut ws = Workspace::open(repo).await.unwrap();
    ws.replace_modules((1..=weeks).map(week).collect());
    Mutex::new(ws)
}

fn recorder() -> (Arc<StdMutex<Vec<BatchProgress>>>, impl Fn(BatchProgress) + Send + Sync) {
    let seen = Arc::new(StdMutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |p| sink.lock().unwrap().push(p))
}

fn filled_slots(ws: &Workspace) -> Vec<(uuid::Uuid, ContentType)> {
    ws.modules()
        .iter()
        .flat_map(|m| {
            ContentType::ALL
                .into_iter()
                .filter(|t| m.content.is_filled(*t))
                .map(move |t| (m.id, t))
        })
        .collect()
}

#[tokio::test(start_paused = true)]
async fn fills_only_missing_slots_and_saves_once() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo.clone(), 2).await;
    let (first, second) = {
        let mut guard = ws.lock().await;
        let ids: Vec<_> = guard.modules().iter().map(|m| m.id).collect();
        guard.set_module_content(ids[0], ContentType::LessonPlan, "my lesson").unwrap();
        guard.set_module_content(ids[0], ContentType::Assessment, "[]").unwrap();
        guard.set_module_content(ids[1], ContentType::StudyGuide, "my guide").unwrap();
        (ids[0], ids[1])
    };
    let saves_before = repo.saves();

    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());
    let (seen, progress) = recorder();

    let report = orchestrator
        .fill_remaining(&ws, &CancellationToken::new(), progress)
        .await
        .unwrap();

    assert_eq!(generator.call_count(), 9);
    assert_eq!(report.completed, 9);
    assert_eq!(report.total, 9);
    assert!(!report.cancelled);

    let mut expected: Vec<BatchProgress> = (0..=9).map(|completed| BatchProgress { completed, total: 9 }).collect();
    expected.push(BatchProgress::default());
    assert_eq!(*seen.lock().unwrap(), expected);
    assert_eq!(repo.saves(), saves_before + 1);

    let guard = ws.lock().await;
    let m1 = guard.module(first).unwrap();
    let m2 = guard.module(second).unwrap();
    assert_eq!(m1.content.get(ContentType::LessonPlan), Some("my lesson"));
    assert_eq!(m1.content.get(ContentType::Assessment), Some("[]"));
    assert_eq!(m2.content.get(ContentType::StudyGuide), Some("my guide"));
    assert_eq!(
        m2.content.get(ContentType::LessonPlan),
        Some(generated_text(ContentType::LessonPlan, m2).as_str())
    );
    assert_eq!(filled_slots(&guard).len(), 12);

    let stored = repo.stored();
    assert_eq!(stored[0].modules, guard.modules().to_vec());
}

#[tokio::test(start_paused = true)]
async fn fills_every_slot_in_module_then_type_order() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 3).await;
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());

    let report = orchestrator
        .fill_remaining(&ws, &CancellationToken::new(), |_| {})
        .await
        .unwrap();

    assert_eq!((report.completed, report.total), (18, 18));
    let guard = ws.lock().await;
    assert_eq!(generator.calls(), filled_slots(&guard));
    assert_eq!(guard.active_module_id(), Some(guard.modules()[2].id));
}

#[tokio::test(start_paused = true)]
async fn rerunning_a_complete_project_generates_nothing() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 1).await;
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());
    let cancel = CancellationToken::new();

    orchestrator.fill_remaining(&ws, &cancel, |_| {}).await.unwrap();
    let report = orchestrator.fill_remaining(&ws, &cancel, |_| {}).await.unwrap();

    assert_eq!((report.completed, report.total), (0, 0));
    assert_eq!(generator.call_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn cancellation_keeps_a_prefix_of_the_fill_order() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo.clone(), 2).await;
    let saves_before = repo.saves();
    let cancel = CancellationToken::new();
    let generator = Arc::new(ScriptedGenerator {
        cancel_after: Some((4, cancel.clone())),
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());

    let report = orchestrator.fill_remaining(&ws, &cancel, |_| {}).await.unwrap();

    assert!(report.cancelled);
    assert_eq!((report.completed, report.total), (4, 12));
    assert_eq!(generator.call_count(), 4);

    let guard = ws.lock().await;
    let first = guard.modules()[0].id;
    let expected: Vec<_> = ContentType::ALL[..4].iter().map(|t| (first, *t)).collect();
    assert_eq!(filled_slots(&guard), expected);
    assert_eq!(repo.saves(), saves_before + 1, "cancelled runs are still saved");
}

#[tokio::test(start_paused = true)]
async fn cancelling_before_start_generates_nothing() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 2).await;
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = orchestrator.fill_remaining(&ws, &cancel, |_| {}).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.completed, 0);
    assert_eq!(generator.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn a_failed_generation_stops_the_batch_without_saving() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo.clone(), 2).await;
    let saves_before = repo.saves();
    let generator = Arc::new(ScriptedGenerator {
        fail_on_call: Some(3),
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());
    let (seen, progress) = recorder();

    let result = orchestrator
        .fill_remaining(&ws, &CancellationToken::new(), progress)
        .await;

    assert!(matches!(result, Err(CoreError::Port(PortError::Unexpected(_)))));
    assert_eq!(generator.call_count(), 3);
    assert_eq!(seen.lock().unwrap().last(), Some(&BatchProgress::default()));
    assert_eq!(filled_slots(&*ws.lock().await).len(), 2, "partial progress is retained");
    assert_eq!(repo.saves(), saves_before);
    assert!(!orchestrator.is_running());
}

#[tokio::test(start_paused = true)]
async fn only_one_batch_runs_at_a_time() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 1).await;
    let generator = Arc::new(ScriptedGenerator {
        latency: Some(Duration::from_secs(1)),
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        orchestrator.fill_remaining(&ws, &cancel, |_| {}),
        orchestrator.fill_remaining(&ws, &cancel, |_| {}),
    );

    assert_eq!(first.unwrap().completed, 6);
    assert!(matches!(second, Err(CoreError::BatchInProgress)));
    assert_eq!(generator.call_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn pacing_delays_follow_each_task() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 2).await;
    let module = ws.lock().await.modules()[1].id;
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());

    let started = Instant::now();
    let report = orchestrator
        .fill_module(&ws, module, &CancellationToken::new(), |_| {})
        .await
        .unwrap();
    assert_eq!(report.completed, 6);
    assert!(generator.calls().iter().all(|(id, _)| *id == module));
    assert!(started.elapsed() >= Duration::from_millis(6 * 800));
    assert!(started.elapsed() < Duration::from_millis(6 * 1200));

    let started = Instant::now();
    orchestrator
        .fill_remaining(&ws, &CancellationToken::new(), |_| {})
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(6 * 1200));
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_a_pacing_delay_stops_at_once() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 2).await;
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());
    let cancel = CancellationToken::new();

    let started = Instant::now();
    let (report, _) = tokio::join!(orchestrator.fill_remaining(&ws, &cancel, |_| {}), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let report = report.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.completed, 1);
    assert!(started.elapsed() < Duration::from_millis(1200));
}

#[tokio::test(start_paused = true)]
async fn a_slot_written_during_the_call_is_kept() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 1).await;
    let module = ws.lock().await.modules()[0].id;
    let generator = Arc::new(ScriptedGenerator {
        latency: Some(Duration::from_secs(1)),
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());

    let cancel = CancellationToken::new();
    let (report, _) = tokio::join!(
        orchestrator.fill_module(&ws, module, &cancel, |_| {}),
        async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            ws.lock()
                .await
                .set_module_content(module, ContentType::ALL[0], "written by hand")
                .unwrap();
        }
    );

    assert_eq!(report.unwrap().total, 6);
    assert_eq!(generator.call_count(), 6);
    let guard = ws.lock().await;
    let content = &guard.module(module).unwrap().content;
    assert_eq!(content.get(ContentType::ALL[0]), Some("written by hand"));
    assert_eq!(content.filled_count(), 6);
}

#[tokio::test(start_paused = true)]
async fn switching_projects_stops_the_batch_without_saving_into_the_new_one() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo.clone(), 2).await;
    let generator = Arc::new(ScriptedGenerator {
        latency: Some(Duration::from_secs(1)),
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());
    let saves_before = repo.saves();

    let cancel = CancellationToken::new();
    let (report, created) = tokio::join!(
        orchestrator.fill_remaining(&ws, &cancel, |_| {}),
        async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            ws.lock().await.create_project().await.unwrap()
        }
    );

    let report = report.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.completed, 0);
    assert_eq!(generator.call_count(), 1);
    let guard = ws.lock().await;
    assert_eq!(guard.current_project_id(), Some(created));
    assert!(guard.modules().is_empty());
    assert_eq!(repo.saves(), saves_before + 1, "only the new project itself was persisted");
    assert!(repo.stored().iter().all(|p| p.modules.iter().all(|m| m.content.filled_count() == 0)));
}

#[tokio::test(start_paused = true)]
async fn fill_module_rejects_unknown_modules() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 1).await;
    let orchestrator = Orchestrator::new(Arc::new(ScriptedGenerator::default()), Pacing::default());
    let missing = uuid::Uuid::now_v7();

    let result = orchestrator
        .fill_module(&ws, missing, &CancellationToken::new(), |_| {})
        .await;

    assert!(matches!(result, Err(CoreError::ModuleNotFound(id)) if id == missing));
}

#[tokio::test]
async fn fill_one_always_overwrites_and_does_not_save() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo.clone(), 1).await;
    let module = ws.lock().await.modules()[0].id;
    ws.lock()
        .await
        .set_module_content(module, ContentType::SlideOutline, "old slides")
        .unwrap();
    let saves_before = repo.saves();
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());

    let text = orchestrator
        .fill_one(&ws, module, ContentType::SlideOutline)
        .await
        .unwrap();

    assert_eq!(text, "SLIDE_OUTLINE for Week 1");
    let guard = ws.lock().await;
    assert_eq!(
        guard.module(module).unwrap().content.get(ContentType::SlideOutline),
        Some("SLIDE_OUTLINE for Week 1")
    );
    assert_eq!(repo.saves(), saves_before);
}

#[tokio::test]
async fn refine_sends_existing_content_and_feedback() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 1).await;
    let module = ws.lock().await.modules()[0].id;
    ws.lock()
        .await
        .set_module_content(module, ContentType::LessonPlan, "draft ![Cell](ai-generated:cell)")
        .unwrap();
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());

    let revised = orchestrator
        .refine(&ws, module, ContentType::LessonPlan, "add an example")
        .await
        .unwrap();

    assert_eq!(revised, "draft ![Cell](ai-generated:cell) (revised: add an example)");
    assert_eq!(
        *generator.refinements.lock().unwrap(),
        vec![("draft ![Cell](ai-generated:cell)".to_string(), "add an example".to_string())]
    );
    assert_eq!(
        ws.lock().await.module(module).unwrap().content.get(ContentType::LessonPlan),
        Some(revised.as_str())
    );
}

#[tokio::test]
async fn refining_an_empty_slot_fails_before_calling_the_model() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo, 1).await;
    let module = ws.lock().await.modules()[0].id;
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());

    let result = orchestrator
        .refine(&ws, module, ContentType::VisualAids, "more images")
        .await;

    assert!(matches!(result, Err(CoreError::NothingToRefine { .. })));
    assert!(generator.refinements.lock().unwrap().is_empty());
}

#[tokio::test]
async fn structure_generation_requires_materials() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = Mutex::new(Workspace::open(repo).await.unwrap());
    let generator = Arc::new(ScriptedGenerator::default());
    let orchestrator = Orchestrator::new(generator.clone(), Pacing::default());

    let result = orchestrator.generate_structure(&ws).await;

    assert!(matches!(result, Err(CoreError::MissingMaterials)));
    assert_eq!(*generator.structure_calls.lock().unwrap(), 0);
}

#[tokio::test]
async fn structure_generation_replaces_modules_and_saves() {
    let repo = Arc::new(MemoryRepo::default());
    let ws = workspace_with(repo.clone(), 2).await;
    let old_ids: Vec<_> = ws.lock().await.modules().iter().map(|m| m.id).collect();
    ws.lock()
        .await
        .context_field_mut(ContextField::PptMaterials)
        .push_str("--- FILE: deck.pptx ---\n[Slide 1]: Vectors");
    let generator = Arc::new(ScriptedGenerator {
        outline: (1..=3)
            .map(|n| ModuleOutline {
                title: format!("Unit {}", n),
                week: n,
                topics: vec!["vectors".to_string()],
            })
            .collect(),
        ..Default::default()
    });
    let orchestrator = Orchestrator::new(generator, Pacing::default());

    let modules = orchestrator.generate_structure(&ws).await.unwrap();

    assert_eq!(modules.len(), 3);
    assert!(modules.iter().all(|m| m.content.filled_count() == 0));
    assert!(modules.iter().all(|m| !old_ids.contains(&m.id)));
    let guard = ws.lock().await;
    assert_eq!(guard.modules(), modules.as_slice());
    assert_eq!(guard.active_module_id(), Some(modules[0].id));
    assert!(!guard.is_context_open());
    assert_eq!(repo.stored()[0].modules, modules);
}
