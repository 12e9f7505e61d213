use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured log events for the research and revision pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    RunStarted {
        topic: String,
        max_iterations: usize,
    },
    ResearchStarted {
        topic: String,
    },
    ResearchCompleted {
        topic: String,
        sources: usize,
        duration_secs: f64,
    },
    DocumentSeeded {
        topic: String,
        version: u32,
        sources: usize,
    },
    /// An expansion topic produced nothing usable and was dropped
    ExpansionSkipped {
        topic: String,
        reason: String,
    },
    SnapshotSaved {
        stage: String,
        version: u32,
        path: PathBuf,
    },
    EditorStarted {
        iteration: usize,
    },
    EditorCompleted {
        iteration: usize,
        version: u32,
        notes: usize,
        duration_secs: f64,
    },
    JudgeStarted {
        iteration: usize,
    },
    JudgeCompleted {
        iteration: usize,
        verdict: String,
        recommendations: Vec<String>,
    },
    DocumentApproved {
        iterations: usize,
        version: u32,
        duration_secs: f64,
    },
    IterationsExhausted {
        iterations: usize,
        version: u32,
    },
    RunFailed {
        stage: String,
        error: String,
    },
}

impl PipelineEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for pipeline events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with JSONL file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &PipelineEvent) {
        // Log to file if configured (always JSON format for file)
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        // Log to console based on format
        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &PipelineEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &PipelineEvent) {
        let mut stderr = std::io::stderr();
        match event {
            PipelineEvent::RunStarted {
                topic,
                max_iterations,
            } => {
                // Top banner
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "draftloops".bold().bright_white(),
                    " ".repeat(57) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Topic:".dimmed(),
                    Self::truncate_with_padding(topic, 60, 68).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Budget:".dimmed(),
                    Self::truncate_with_padding(
                        &format!("{} revision passes", max_iterations),
                        59,
                        67
                    )
                    .dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            PipelineEvent::ResearchStarted { topic } => {
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_blue(),
                    "RESEARCH".bright_blue().bold(),
                    topic.dimmed()
                );
            }
            PipelineEvent::ResearchCompleted {
                sources,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} {} ({:.1}s)",
                    "✓".bright_green(),
                    sources,
                    if *sources == 1 { "source" } else { "sources" },
                    duration_secs
                );
            }
            PipelineEvent::DocumentSeeded {
                version, sources, ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Seeded draft v{} from {} {}",
                    "✓".bright_green(),
                    version,
                    sources,
                    if *sources == 1 { "source" } else { "sources" }
                );
                let _ = writeln!(stderr);
            }
            PipelineEvent::ExpansionSkipped { topic, reason } => {
                let _ = writeln!(
                    stderr,
                    "    {} Skipped expansion '{}': {}",
                    "⚠".bright_yellow(),
                    topic,
                    reason.dimmed()
                );
            }
            PipelineEvent::SnapshotSaved { stage, path, .. } => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "📄".dimmed(),
                    format!("{}: {}", stage, filename).dimmed()
                );
            }
            PipelineEvent::EditorStarted { iteration } => {
                // Iteration header
                let iter_text = format!("─ Revision pass {} ", iteration + 1);
                let padding = "─".repeat(67usize.saturating_sub(iter_text.chars().count()));
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    iter_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);

                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_cyan(),
                    "EDITOR".bright_cyan().bold()
                );
            }
            PipelineEvent::EditorCompleted {
                version,
                notes,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Draft v{} ({} {}, {:.1}s)",
                    "✓".bright_green(),
                    version,
                    notes,
                    if *notes == 1 { "note" } else { "notes" },
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            PipelineEvent::JudgeStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "JUDGE".bright_magenta().bold()
                );
            }
            PipelineEvent::JudgeCompleted {
                verdict,
                recommendations,
                ..
            } => {
                let styled_verdict = if verdict.contains("APPROVE") {
                    format!("✓ Verdict: {}", verdict).bright_green().to_string()
                } else {
                    format!("→ Verdict: {}", verdict).bright_yellow().to_string()
                };
                let _ = writeln!(stderr, "    {}", styled_verdict);
                for rec in recommendations {
                    let _ = writeln!(stderr, "      {} {}", "-".dimmed(), rec.dimmed());
                }
                let _ = writeln!(stderr);

                // Iteration footer
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            PipelineEvent::DocumentApproved { .. } => {
                // The final outcome banner is printed by main; skip here to
                // avoid duplication
            }
            PipelineEvent::IterationsExhausted { iterations, .. } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Maximum revision passes reached ({})",
                    "⚠".bright_yellow(),
                    iterations
                );
            }
            PipelineEvent::RunFailed { stage, error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Error during {}: {}",
                    "✗".bright_red(),
                    stage,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &PipelineEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            PipelineEvent::RunStarted { topic, .. } => {
                format!("[{}] run:start {}", timestamp, topic)
            }
            PipelineEvent::ResearchStarted { topic } => {
                format!("[{}] research:start {}", timestamp, topic)
            }
            PipelineEvent::ResearchCompleted {
                sources,
                duration_secs,
                ..
            } => format!(
                "[{}] research:done {} sources {:.1}s",
                timestamp, sources, duration_secs
            ),
            PipelineEvent::DocumentSeeded { version, .. } => {
                format!("[{}] seed:v{}", timestamp, version)
            }
            PipelineEvent::ExpansionSkipped { topic, .. } => {
                format!("[{}] expand:skip {}", timestamp, topic)
            }
            PipelineEvent::SnapshotSaved { stage, version, .. } => {
                format!("[{}] snapshot:{} v{}", timestamp, stage, version)
            }
            PipelineEvent::EditorStarted { iteration } => {
                format!("[{}] editor:start:{}", timestamp, iteration + 1)
            }
            PipelineEvent::EditorCompleted {
                iteration,
                version,
                duration_secs,
                ..
            } => format!(
                "[{}] editor:done:{} v{} {:.1}s",
                timestamp,
                iteration + 1,
                version,
                duration_secs
            ),
            PipelineEvent::JudgeStarted { iteration } => {
                format!("[{}] judge:start:{}", timestamp, iteration + 1)
            }
            PipelineEvent::JudgeCompleted {
                iteration, verdict, ..
            } => format!("[{}] judge:done:{} {}", timestamp, iteration + 1, verdict),
            PipelineEvent::DocumentApproved {
                iterations,
                duration_secs,
                ..
            } => format!(
                "[{}] run:approved:{} {:.1}s",
                timestamp, iterations, duration_secs
            ),
            PipelineEvent::IterationsExhausted { iterations, .. } => {
                format!("[{}] run:limit:{}", timestamp, iterations)
            }
            PipelineEvent::RunFailed { stage, error } => {
                format!("[{}] error:{}:{}", timestamp, stage, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width. Counts chars rather than
    /// bytes so multibyte topics never split mid-character.
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1); // +1 for trailing │
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}
