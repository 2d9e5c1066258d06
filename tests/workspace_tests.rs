// Workspace integration tests
// Commit-then-persist ordering, sink failures, and the JSON lines page log

use anyhow::Result;
use pagetree::*;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use tempfile::TempDir;

fn workspace_with_sink(sink: Arc<dyn PersistenceSink>) -> Workspace {
    Workspace::new(EngineConfig::default())
        .with_id_generator(Arc::new(SequentialIdGenerator::new()))
        .with_sink(sink)
}

#[tokio::test]
async fn test_created_pages_reach_the_sink() -> Result<()> {
    let sink = MemorySink::new();
    let ws = workspace_with_sink(Arc::new(sink.clone()));

    let added = ws
        .dispatch_and_persist(&PageAction::add_page("Notes", ParentSelector::Root))
        .await?;
    assert!(added.persistence_failures.is_empty());
    ws.dispatch_and_persist(&PageAction::DuplicateCurrentPage)
        .await?;
    ws.dispatch_and_persist(&PageAction::rename("Renamed copy"))
        .await?;

    let persisted = sink.pages().await;
    let names: Vec<&str> = persisted.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Notes", "Notes Copy"]);
    assert_eq!(persisted[0].id, added.transition.created[0].id);
    Ok(())
}

#[tokio::test]
async fn test_sink_failure_keeps_commit() -> Result<()> {
    let sink = MemorySink::new();
    sink.fail_next().await;
    let ws = workspace_with_sink(Arc::new(sink.clone()));

    let committed = ws
        .dispatch_and_persist(&PageAction::add_page("Unsaved", ParentSelector::Root))
        .await?;
    assert_eq!(committed.persistence_failures.len(), 1);
    assert!(matches!(
        committed.persistence_failures[0],
        PersistenceError::Rejected { .. }
    ));

    // The in-memory commit stands
    let snapshot = ws.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(
        snapshot.selected_page(),
        Some(committed.transition.created[0].id)
    );
    assert!(sink.pages().await.is_empty());

    ws.dispatch_and_persist(&PageAction::add_page("Saved", ParentSelector::Root))
        .await?;
    assert_eq!(sink.pages().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_rejected_action_persists_nothing() -> Result<()> {
    let sink = MemorySink::new();
    let ws = workspace_with_sink(Arc::new(sink.clone()));

    let err = ws
        .dispatch_and_persist(&PageAction::DuplicateCurrentPage)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(ws.snapshot().is_empty());
    assert!(sink.pages().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_workspace_without_sink() -> Result<()> {
    let ws = Workspace::new(EngineConfig::default());
    let committed = ws
        .dispatch_and_persist(&PageAction::add_page("Local", ParentSelector::Root))
        .await?;
    assert!(committed.persistence_failures.is_empty());
    assert_eq!(ws.snapshot().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_json_lines_sink_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("logs").join("pages.jsonl");
    let sink = create_file_sink(&path).await?;
    let ws = workspace_with_sink(Arc::new(sink));

    ws.dispatch_and_persist(&PageAction::AddPage {
        name: "Readme".to_string(),
        parent: ParentSelector::Root,
        initial: Some(Template::new("Readme", "# Hello")),
    })
    .await?;
    ws.dispatch_and_persist(&PageAction::add_page("Child", ParentSelector::Current))
        .await?;

    let stored = JsonLinesSink::read_all(&path).await?;
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].document.content, "# Hello");
    assert_eq!(stored[1].parent, ParentId::Page(stored[0].id));

    let snapshot = ws.snapshot();
    let live: Vec<Page> = snapshot.pages().iter().map(|p| (**p).clone()).collect();
    assert_eq!(stored, live);
    Ok(())
}

#[tokio::test]
async fn test_json_lines_sink_appends_across_opens() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("pages.jsonl");
    let page = PageBuilder::new().name("First")?.build();

    JsonLinesSink::open(&path).await?.add(&page).await?;
    let second = PageBuilder::new().name("Second")?.sort(2).build();
    JsonLinesSink::open(&path).await?.add(&second).await?;

    let stored = JsonLinesSink::read_all(&path).await?;
    assert_eq!(stored, vec![page, second]);
    Ok(())
}

#[tokio::test]
async fn test_readers_see_whole_snapshots_under_concurrent_writes() -> Result<()> {
    let ws = Arc::new(Workspace::new(EngineConfig::default()));

    let mut writers = Vec::new();
    for n in 0..8 {
        let ws = Arc::clone(&ws);
        writers.push(tokio::spawn(async move {
            ws.dispatch(&PageAction::add_page(format!("Page {n}"), ParentSelector::Root))
        }));
    }
    for writer in writers {
        writer.await??;
        let snapshot = ws.snapshot();
        assert!(snapshot.validate().is_ok());
    }

    let snapshot = ws.snapshot();
    assert_eq!(snapshot.len(), 8);
    let mut sorts: Vec<SortKey> = snapshot.siblings(ParentId::Root).iter().map(|p| p.sort).collect();
    sorts.dedup();
    assert_eq!(sorts, (1..=8).collect::<Vec<_>>());
    Ok(())
}
