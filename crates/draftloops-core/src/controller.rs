use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use draftloops_editor::{EditorAgent, RevisionInput};
use draftloops_judge::{CritiqueInput, CritiqueResult, JudgeAgent};
use draftloops_logging::{Logger, PipelineEvent};
use draftloops_research::{CollectionError, ResearchCollector};
use draftloops_store::{Approval, SnapshotInput, SnapshotStore, Stage};

use crate::document::DocumentState;
use crate::error::PipelineError;
use crate::outcome::{RunReport, RunStatus};

const DEFAULT_MAX_ITERATIONS: usize = 3;

/// Orchestrates the research → seed → editor/judge revision pipeline.
///
/// Owns the document for the duration of a run and persists a snapshot at
/// every stage boundary, so a failed or exhausted run leaves its trail on
/// disk.
pub struct RevisionLoop {
    collector: ResearchCollector,
    editor: EditorAgent,
    judge: JudgeAgent,
    store: SnapshotStore,
    logger: Arc<Logger>,
    max_iterations: usize,
}

impl RevisionLoop {
    pub fn new(
        collector: ResearchCollector,
        editor: EditorAgent,
        judge: JudgeAgent,
        store: SnapshotStore,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            collector,
            editor,
            judge,
            store,
            logger,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    /// Override the revision budget. Budgets below 1 are clamped to 1.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    /// The snapshot store this pipeline persists through.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Run the full pipeline for a topic: collect research, seed the
    /// document, fold in any expansion topics, then revise until the judge
    /// approves or the iteration budget runs out.
    pub async fn run(&self, topic: &str, expansions: &[String]) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        self.logger.log(&PipelineEvent::RunStarted {
            topic: topic.to_string(),
            max_iterations: self.max_iterations,
        });

        match self.run_inner(topic, expansions, started).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.log_failure(&e);
                Err(e)
            }
        }
    }

    /// Continue revising a document recovered from a stored snapshot.
    ///
    /// Skips research and seeding entirely; version numbering continues
    /// from the stored value.
    pub async fn resume(&self, document: DocumentState) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let topic = document
            .topics
            .first()
            .cloned()
            .unwrap_or_else(|| "untitled".to_string());
        self.logger.log(&PipelineEvent::RunStarted {
            topic,
            max_iterations: self.max_iterations,
        });

        match self.iterate(document, started).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.log_failure(&e);
                Err(e)
            }
        }
    }

    async fn run_inner(
        &self,
        topic: &str,
        expansions: &[String],
        started: Instant,
    ) -> Result<RunReport, PipelineError> {
        let mut document = self.seed(topic).await?;
        self.persist(&document, Stage::InitialResearch, Approval::Pending)?;

        for expansion in expansions {
            self.expand(&mut document, expansion).await?;
        }

        self.iterate(document, started).await
    }

    /// Collect research for the originating topic and build the document.
    async fn seed(&self, topic: &str) -> Result<DocumentState, PipelineError> {
        self.logger.log(&PipelineEvent::ResearchStarted {
            topic: topic.to_string(),
        });

        let research_started = Instant::now();
        let records = self.collector.collect(topic).await?;
        self.logger.log(&PipelineEvent::ResearchCompleted {
            topic: topic.to_string(),
            sources: records.len(),
            duration_secs: research_started.elapsed().as_secs_f64(),
        });

        let document = DocumentState::seed(topic, &records)?;
        self.logger.log(&PipelineEvent::DocumentSeeded {
            topic: topic.to_string(),
            version: document.version,
            sources: document.sources.len(),
        });
        Ok(document)
    }

    /// Research one expansion topic and fold it into the document.
    ///
    /// A topic with no usable results is skipped with a warning event;
    /// transport failures stay fatal.
    async fn expand(&self, document: &mut DocumentState, topic: &str) -> Result<(), PipelineError> {
        self.logger.log(&PipelineEvent::ResearchStarted {
            topic: topic.to_string(),
        });

        let research_started = Instant::now();
        let records = match self.collector.collect(topic).await {
            Ok(records) => records,
            Err(CollectionError::NoUsableResults { .. }) => {
                self.logger.log(&PipelineEvent::ExpansionSkipped {
                    topic: topic.to_string(),
                    reason: "no usable search results".to_string(),
                });
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        self.logger.log(&PipelineEvent::ResearchCompleted {
            topic: topic.to_string(),
            sources: records.len(),
            duration_secs: research_started.elapsed().as_secs_f64(),
        });

        document.append_section(topic, &records)?;
        self.persist(document, Stage::Expansion, Approval::Pending)?;
        Ok(())
    }

    /// Revise until the judge approves or the budget runs out.
    async fn iterate(
        &self,
        mut document: DocumentState,
        started: Instant,
    ) -> Result<RunReport, PipelineError> {
        let mut iteration = 0usize;

        loop {
            let critique = self.run_cycle(&mut document, iteration).await?;

            if critique.approved() {
                document.record_approval(Approval::Approved);
                self.persist(&document, Stage::Final, Approval::Approved)?;
                self.logger.log(&PipelineEvent::DocumentApproved {
                    iterations: iteration + 1,
                    version: document.version,
                    duration_secs: started.elapsed().as_secs_f64(),
                });
                return Ok(RunReport {
                    status: RunStatus::Approved,
                    iterations: iteration + 1,
                    recommendations: critique.recommendations,
                    duration: started.elapsed(),
                    document,
                });
            }

            iteration += 1;
            if iteration >= self.max_iterations {
                document.record_approval(Approval::Unapproved);
                self.persist(&document, Stage::Final, Approval::Unapproved)?;
                self.logger.log(&PipelineEvent::IterationsExhausted {
                    iterations: iteration,
                    version: document.version,
                });
                return Ok(RunReport {
                    status: RunStatus::Exhausted,
                    iterations: iteration,
                    recommendations: critique.recommendations,
                    duration: started.elapsed(),
                    document,
                });
            }

            info!(
                iteration,
                remaining = self.max_iterations - iteration,
                "Revision requested, continuing"
            );
        }
    }

    /// Run one editor/judge cycle and return the judge's ruling.
    async fn run_cycle(
        &self,
        document: &mut DocumentState,
        iteration: usize,
    ) -> Result<CritiqueResult, PipelineError> {
        self.logger.log(&PipelineEvent::EditorStarted { iteration });

        debug!(iteration, version = document.version, "Running editor");
        let editor_started = Instant::now();
        let revision = self
            .editor
            .revise(RevisionInput {
                content: &document.content,
                topics: &document.topics,
                version: document.version,
            })
            .await?;

        // The judge compares against the pre-edit draft.
        let previous_content = document.content.clone();
        let previous_version = document.version;

        document.apply_revision(&revision)?;
        self.persist(document, Stage::EditorDraft, Approval::Pending)?;
        self.logger.log(&PipelineEvent::EditorCompleted {
            iteration,
            version: document.version,
            notes: revision.revision_notes.len(),
            duration_secs: editor_started.elapsed().as_secs_f64(),
        });

        self.logger.log(&PipelineEvent::JudgeStarted { iteration });
        debug!(iteration, version = document.version, "Running judge");
        let critique = self
            .judge
            .review(CritiqueInput {
                original_content: &previous_content,
                topics: &document.topics,
                original_version: previous_version,
                revised_content: &document.content,
                revised_version: document.version,
                revision_notes: &revision.revision_notes,
            })
            .await?;

        document.record_review(&critique);
        self.persist(document, Stage::JudgeReview, Approval::Pending)?;
        self.logger.log(&PipelineEvent::JudgeCompleted {
            iteration,
            verdict: critique.short_description(),
            recommendations: critique.recommendations.clone(),
        });

        Ok(critique)
    }

    fn persist(
        &self,
        document: &DocumentState,
        stage: Stage,
        approval: Approval,
    ) -> Result<(), PipelineError> {
        let path = self.store.save(SnapshotInput {
            content: &document.content,
            topics: &document.topics,
            version: document.version,
            stage,
            approval,
            metadata: &document.metadata,
        })?;
        self.logger.log(&PipelineEvent::SnapshotSaved {
            stage: stage.to_string(),
            version: document.version,
            path,
        });
        Ok(())
    }

    fn log_failure(&self, e: &PipelineError) {
        self.logger.log(&PipelineEvent::RunFailed {
            stage: e.stage().to_string(),
            error: e.to_string(),
        });
    }
}
