use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use draftloops_agent::{
    CompletionError, CompletionOutput, CompletionProvider, CompletionRequest,
};
use draftloops_core::{DocumentState, PipelineError, RevisionLoop, RunStatus};
use draftloops_editor::EditorAgent;
use draftloops_judge::JudgeAgent;
use draftloops_logging::{LogFormat, Logger};
use draftloops_research::{
    CollectionError, RawSearchResult, ResearchCollector, SearchDepth, SearchProvider,
};
use draftloops_store::{read_meta, Approval, SnapshotStore, Stage};
use tempfile::TempDir;

/// Search stub that replays one scripted result set per call.
struct ScriptedSearch {
    replies: Mutex<Vec<Vec<RawSearchResult>>>,
    calls: AtomicU32,
}

impl ScriptedSearch {
    fn new(replies: Vec<Vec<RawSearchResult>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    fn name(&self) -> &str {
        "scripted-search"
    }

    async fn search(
        &self,
        _query: &str,
        _depth: SearchDepth,
    ) -> Result<Vec<RawSearchResult>, CollectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            return Ok(Vec::new());
        }
        Ok(replies.remove(0))
    }
}

/// Completion stub that replays scripted replies in order.
struct ScriptedCompletions {
    replies: Mutex<Vec<Result<String, CompletionError>>>,
    calls: AtomicU32,
}

impl ScriptedCompletions {
    fn new(replies: Vec<Result<String, CompletionError>>) -> Self {
        Self {
            replies: Mutex::new(replies),
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletions {
    fn name(&self) -> &str {
        "scripted-completions"
    }

    async fn complete(
        &self,
        _request: &CompletionRequest,
    ) -> Result<CompletionOutput, CompletionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self.replies.lock().unwrap();
        let reply = if replies.is_empty() {
            Err(CompletionError::Empty)
        } else {
            replies.remove(0)
        };
        reply.map(|content| CompletionOutput {
            content,
            model: "scripted".to_string(),
            duration: Duration::from_millis(5),
        })
    }
}

fn hit(title: &str, url: &str, content: &str) -> RawSearchResult {
    RawSearchResult {
        title: Some(title.to_string()),
        url: Some(url.to_string()),
        content: Some(content.to_string()),
        score: Some(0.9),
        ..Default::default()
    }
}

fn editor_reply(content: &str, notes: &[&str]) -> Result<String, CompletionError> {
    Ok(serde_json::json!({
        "improved_content": content,
        "revision_notes": notes,
    })
    .to_string())
}

fn judge_reply(
    decision: &str,
    feedback: &str,
    recommendations: &[&str],
) -> Result<String, CompletionError> {
    Ok(serde_json::json!({
        "feedback": feedback,
        "recommendations": recommendations,
        "decision": decision,
    })
    .to_string())
}

struct Harness {
    pipeline: RevisionLoop,
    search: Arc<ScriptedSearch>,
    editor_provider: Arc<ScriptedCompletions>,
    judge_provider: Arc<ScriptedCompletions>,
    workproduct: PathBuf,
    output: PathBuf,
    _tmp: TempDir,
}

/// Helper: wire a pipeline from scripted providers over a temp store.
///
/// Agents run with a zero retry budget so every scripted reply maps to
/// exactly one provider call.
fn build_harness(
    search_replies: Vec<Vec<RawSearchResult>>,
    editor_replies: Vec<Result<String, CompletionError>>,
    judge_replies: Vec<Result<String, CompletionError>>,
    max_iterations: usize,
) -> Harness {
    let tmp = TempDir::new().unwrap();
    let workproduct = tmp.path().join("_workproduct");
    let output = tmp.path().join("output");
    let store = SnapshotStore::open(workproduct.clone(), output.clone()).unwrap();

    let search = Arc::new(ScriptedSearch::new(search_replies));
    let editor_provider = Arc::new(ScriptedCompletions::new(editor_replies));
    let judge_provider = Arc::new(ScriptedCompletions::new(judge_replies));

    let collector = ResearchCollector::new(search.clone());
    let editor =
        EditorAgent::new(editor_provider.clone()).with_retry_budget(0, Duration::from_millis(1));
    let judge =
        JudgeAgent::new(judge_provider.clone()).with_retry_budget(0, Duration::from_millis(1));
    let logger = Arc::new(Logger::new(LogFormat::Json));

    let pipeline = RevisionLoop::new(collector, editor, judge, store, logger)
        .with_max_iterations(max_iterations);

    Harness {
        pipeline,
        search,
        editor_provider,
        judge_provider,
        workproduct,
        output,
        _tmp: tmp,
    }
}

fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map_or(false, |name| name.starts_with(prefix))
        })
        .collect();
    files.sort();
    files
}

// ============================================================
// Seeding
// ============================================================

#[tokio::test]
async fn test_seeding_discards_unusable_hits() {
    // Three hits, one with no content at all; only two survive collection.
    let hits = vec![
        hit("First", "https://a.example/1", "Body one."),
        RawSearchResult {
            title: Some("Empty".to_string()),
            url: Some("https://b.example/2".to_string()),
            ..Default::default()
        },
        hit("Third", "https://c.example/3", "Body three."),
    ];
    let harness = build_harness(
        vec![hits],
        vec![editor_reply("Improved.", &["pass"])],
        vec![judge_reply("approve", "Solid.", &[])],
        3,
    );

    let report = harness.pipeline.run("Rust async", &[]).await.unwrap();

    let doc = &report.document;
    assert_eq!(doc.topics, vec!["Rust async".to_string()]);
    assert_eq!(doc.sources.len(), 2);
    assert!(doc.sources.contains("https://a.example/1"));
    assert!(doc.sources.contains("https://c.example/3"));
    assert!(!doc.sources.contains("https://b.example/2"));
}

#[tokio::test]
async fn test_empty_search_results_fail_seeding() {
    let harness = build_harness(vec![Vec::new()], Vec::new(), Vec::new(), 3);

    let err = harness.pipeline.run("Obscure topic", &[]).await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Collection(CollectionError::NoUsableResults { .. })
    ));
    assert_eq!(harness.editor_provider.calls(), 0);
    assert_eq!(harness.judge_provider.calls(), 0);
    // Nothing persisted beyond logs.
    assert!(fs::read_dir(&harness.workproduct).unwrap().next().is_none());
    assert!(fs::read_dir(&harness.output).unwrap().next().is_none());
}

// ============================================================
// Approval and exhaustion
// ============================================================

#[tokio::test]
async fn test_approval_on_first_pass() {
    let harness = build_harness(
        vec![vec![hit("Only", "https://a.example/1", "Body.")]],
        vec![editor_reply("Much improved body.", &["restructured"])],
        vec![judge_reply("approve", "Reads well.", &[])],
        3,
    );

    let report = harness.pipeline.run("Test topic", &[]).await.unwrap();

    assert_eq!(report.status, RunStatus::Approved);
    assert!(report.is_approved());
    assert_eq!(report.exit_code(), 0);
    assert_eq!(report.iterations, 1);
    assert_eq!(report.document.version, 2);
    assert_eq!(report.document.content, "Much improved body.");
    assert_eq!(harness.editor_provider.calls(), 1);
    assert_eq!(harness.judge_provider.calls(), 1);

    // One snapshot per stage: research and both agent stages in the
    // workproduct dir, the approved final in the output dir.
    assert_eq!(files_with_prefix(&harness.workproduct, "01_").len(), 1);
    assert_eq!(files_with_prefix(&harness.workproduct, "03_").len(), 1);
    assert_eq!(files_with_prefix(&harness.workproduct, "04_").len(), 1);
    let finals = files_with_prefix(&harness.output, "final_");
    assert_eq!(finals.len(), 1);

    let meta = read_meta(&finals[0]).unwrap();
    assert_eq!(meta.approval, Approval::Approved);
    assert_eq!(meta.stage, Some(Stage::Final));
    assert_eq!(meta.version, 2);
}

#[tokio::test]
async fn test_always_revise_judge_exhausts_budget() {
    let harness = build_harness(
        vec![vec![hit("Only", "https://a.example/1", "Body.")]],
        vec![
            editor_reply("Draft two.", &[]),
            editor_reply("Draft three.", &[]),
            editor_reply("Draft four.", &[]),
        ],
        vec![
            judge_reply("revise", "Weak intro.", &["Rework the opening"]),
            judge_reply("revise", "Still thin.", &["Add detail"]),
            judge_reply("revise", "Not there yet.", &["Expand the close"]),
        ],
        3,
    );

    let report = harness.pipeline.run("Stubborn topic", &[]).await.unwrap();

    assert_eq!(report.status, RunStatus::Exhausted);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.iterations, 3);
    // Exactly the budget: three editor calls, three judge calls.
    assert_eq!(harness.editor_provider.calls(), 3);
    assert_eq!(harness.judge_provider.calls(), 3);
    // Seed at 1 plus three accepted revisions.
    assert_eq!(report.document.version, 4);
    assert_eq!(report.recommendations, vec!["Expand the close".to_string()]);

    let finals = files_with_prefix(&harness.output, "final_");
    assert_eq!(finals.len(), 1);
    let meta = read_meta(&finals[0]).unwrap();
    assert_eq!(meta.approval, Approval::Unapproved);
    assert_eq!(meta.version, 4);
}

#[tokio::test]
async fn test_approval_on_second_iteration() {
    let harness = build_harness(
        vec![vec![hit("Only", "https://a.example/1", "Body.")]],
        vec![
            editor_reply("Draft two.", &["first pass"]),
            editor_reply("Draft three.", &["second pass"]),
        ],
        vec![
            judge_reply("revise", "Close.", &["Tighten the middle"]),
            judge_reply("approve", "Good now.", &[]),
        ],
        3,
    );

    let report = harness.pipeline.run("Test topic", &[]).await.unwrap();

    assert_eq!(report.status, RunStatus::Approved);
    assert_eq!(report.iterations, 2);
    assert_eq!(harness.editor_provider.calls(), 2);
    assert_eq!(harness.judge_provider.calls(), 2);
    assert_eq!(report.document.version, 3);
    assert_eq!(files_with_prefix(&harness.workproduct, "03_").len(), 2);
    assert_eq!(files_with_prefix(&harness.workproduct, "04_").len(), 2);
}

// ============================================================
// Judge feedback persistence
// ============================================================

#[tokio::test]
async fn test_judge_feedback_recorded_in_snapshots() {
    let harness = build_harness(
        vec![vec![hit("Only", "https://a.example/1", "Body.")]],
        vec![editor_reply("Improved.", &[])],
        vec![judge_reply(
            "approve",
            "Strong draft.",
            &["Consider a glossary"],
        )],
        3,
    );

    let report = harness.pipeline.run("Test topic", &[]).await.unwrap();

    assert_eq!(
        report.document.metadata.get("judge_verdict").unwrap(),
        "approve"
    );
    assert_eq!(
        report.document.metadata.get("judge_feedback").unwrap(),
        "Strong draft."
    );

    let reviews = files_with_prefix(&harness.workproduct, "04_");
    let meta = read_meta(&reviews[0]).unwrap();
    assert_eq!(meta.metadata.get("judge_feedback").unwrap(), "Strong draft.");
    assert_eq!(
        meta.metadata.get("judge_recommendations").unwrap(),
        "Consider a glossary"
    );
    // The approval marker lives on its dedicated header line, mirrored into
    // the document metadata only at the terminal stage.
    assert_eq!(meta.approval, Approval::Pending);
    assert_eq!(
        report.document.metadata.get("approval").unwrap(),
        "approved"
    );
}

// ============================================================
// Expansion
// ============================================================

#[tokio::test]
async fn test_expansion_appends_topic_and_bumps_version() {
    let harness = build_harness(
        vec![
            vec![hit("Main", "https://a.example/1", "Main body.")],
            vec![hit("Side", "https://b.example/2", "Side body.")],
        ],
        vec![editor_reply("Merged and improved.", &[])],
        vec![judge_reply("approve", "Fine.", &[])],
        3,
    );

    let expansions = vec!["Side topic".to_string()];
    let report = harness.pipeline.run("Main topic", &expansions).await.unwrap();

    assert_eq!(harness.search.calls(), 2);
    assert_eq!(
        report.document.topics,
        vec!["Main topic".to_string(), "Side topic".to_string()]
    );
    // Seed at 1, expansion to 2, one revision to 3.
    assert_eq!(report.document.version, 3);
    assert!(report.document.sources.contains("https://b.example/2"));
    assert_eq!(files_with_prefix(&harness.workproduct, "02_").len(), 1);
}

#[tokio::test]
async fn test_expansion_without_results_is_skipped() {
    let harness = build_harness(
        vec![
            vec![hit("Main", "https://a.example/1", "Main body.")],
            Vec::new(),
        ],
        vec![editor_reply("Improved.", &[])],
        vec![judge_reply("approve", "Fine.", &[])],
        3,
    );

    let expansions = vec!["Fruitless topic".to_string()];
    let report = harness.pipeline.run("Main topic", &expansions).await.unwrap();

    assert_eq!(report.status, RunStatus::Approved);
    assert_eq!(report.document.topics, vec!["Main topic".to_string()]);
    assert_eq!(report.document.version, 2);
    assert!(files_with_prefix(&harness.workproduct, "02_").is_empty());
}

// ============================================================
// Failure propagation
// ============================================================

#[tokio::test]
async fn test_editor_failure_leaves_prior_snapshots_intact() {
    let harness = build_harness(
        vec![vec![hit("Only", "https://a.example/1", "Body.")]],
        vec![Err(CompletionError::Api {
            status: 500,
            body: "backend down".to_string(),
        })],
        Vec::new(),
        3,
    );

    let err = harness.pipeline.run("Test topic", &[]).await.unwrap_err();

    assert!(matches!(err, PipelineError::Revision(_)));
    assert_eq!(harness.judge_provider.calls(), 0);
    // The research snapshot survives the fatal error.
    assert_eq!(files_with_prefix(&harness.workproduct, "01_").len(), 1);
    assert!(files_with_prefix(&harness.workproduct, "03_").is_empty());
    assert!(fs::read_dir(&harness.output).unwrap().next().is_none());
}

// ============================================================
// Resume
// ============================================================

#[tokio::test]
async fn test_resume_continues_version_numbering() {
    // First run exhausts its single-iteration budget at version 2.
    let first = build_harness(
        vec![vec![hit("Only", "https://a.example/1", "Body.")]],
        vec![editor_reply("Draft two.", &[])],
        vec![judge_reply("revise", "Not yet.", &["More depth"])],
        1,
    );
    let report = first.pipeline.run("Durable topic", &[]).await.unwrap();
    assert_eq!(report.status, RunStatus::Exhausted);
    assert_eq!(report.document.version, 2);

    // Recover the latest snapshot: the unapproved final.
    let store = SnapshotStore::with_dirs(first.workproduct.clone(), first.output.clone());
    let stored = store.latest(Some("Durable topic")).unwrap().unwrap();
    assert_eq!(stored.meta.approval, Approval::Unapproved);
    let document = DocumentState::from_snapshot(stored);
    assert_eq!(document.version, 2);
    assert_eq!(document.content, "Draft two.");

    // Resume over the same store with a fresh judge; no new research runs.
    let search = Arc::new(ScriptedSearch::new(Vec::new()));
    let editor_provider = Arc::new(ScriptedCompletions::new(vec![editor_reply(
        "Final draft.",
        &["addressed feedback"],
    )]));
    let judge_provider = Arc::new(ScriptedCompletions::new(vec![judge_reply(
        "approve", "Done.", &[],
    )]));
    let pipeline = RevisionLoop::new(
        ResearchCollector::new(search.clone()),
        EditorAgent::new(editor_provider.clone()).with_retry_budget(0, Duration::from_millis(1)),
        JudgeAgent::new(judge_provider.clone()).with_retry_budget(0, Duration::from_millis(1)),
        SnapshotStore::with_dirs(first.workproduct.clone(), first.output.clone()),
        Arc::new(Logger::new(LogFormat::Json)),
    );

    let resumed = pipeline.resume(document).await.unwrap();

    assert_eq!(resumed.status, RunStatus::Approved);
    assert_eq!(resumed.document.version, 3);
    assert_eq!(resumed.document.topics, vec!["Durable topic".to_string()]);
    assert_eq!(search.calls(), 0);
    assert_eq!(editor_provider.calls(), 1);
    assert_eq!(judge_provider.calls(), 1);
    // Both runs share the store; the approved final joins the unapproved one.
    assert_eq!(files_with_prefix(&first.output, "final_").len(), 2);
}
