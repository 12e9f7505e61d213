use std::fmt::Write as _;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write as _};
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use tracing::{info, warn};

use crate::parser::read_snapshot;
use crate::types::{
    topic_slug, PersistenceError, SnapshotInput, Stage, StoredSnapshot,
};

// Header keys with dedicated lines; metadata entries under these names
// would otherwise appear twice.
const RESERVED_KEYS: [&str; 4] = ["version", "stage", "topics", "approval"];

// Upper bound on same-second sequence markers before a save gives up.
const MAX_SEQUENCE: u32 = 100;

/// Append-only snapshot files across two directories: intermediate stages in
/// the workproduct dir, finals in the output dir.
pub struct SnapshotStore {
    workproduct_dir: PathBuf,
    output_dir: PathBuf,
}

impl SnapshotStore {
    /// Open a store, creating both directories if needed.
    pub fn open(workproduct_dir: PathBuf, output_dir: PathBuf) -> Result<Self, PersistenceError> {
        for dir in [&workproduct_dir, &output_dir] {
            fs::create_dir_all(dir).map_err(|source| PersistenceError::Io {
                action: "create",
                path: dir.clone(),
                source,
            })?;
        }
        Ok(Self {
            workproduct_dir,
            output_dir,
        })
    }

    /// Build a store over existing directories (useful for testing).
    pub fn with_dirs(workproduct_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            workproduct_dir,
            output_dir,
        }
    }

    pub fn workproduct_dir(&self) -> &Path {
        &self.workproduct_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Persist one snapshot as a fresh file, never overwriting.
    ///
    /// Filename: `{prefix}_{stage}_{topic_slug}_{YYYYmmdd_HHMMSS}.md`. The
    /// `final` stage lands in the output dir, every other stage in the
    /// workproduct dir. Saves of the same stage and topic within one second
    /// take a sequence marker (`_r2`, `_r3`, ...) before the timestamp, so a
    /// later save never clobbers an earlier one.
    pub fn save(&self, input: SnapshotInput<'_>) -> Result<PathBuf, PersistenceError> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let slug = topic_slug(input.topics.first().map(String::as_str).unwrap_or("untitled"));
        let base = format!("{}_{}_{}", input.stage.prefix(), input.stage, slug);

        let target_dir = if input.stage == Stage::Final {
            &self.output_dir
        } else {
            &self.workproduct_dir
        };

        let mut sequence = 1u32;
        let (path, mut file) = loop {
            let filename = if sequence == 1 {
                format!("{base}_{timestamp}.md")
            } else {
                format!("{base}_r{sequence}_{timestamp}.md")
            };
            let candidate = target_dir.join(filename);

            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => break (candidate, file),
                Err(source)
                    if source.kind() == ErrorKind::AlreadyExists && sequence < MAX_SEQUENCE =>
                {
                    sequence += 1;
                }
                Err(source) => {
                    return Err(PersistenceError::Io {
                        action: "create",
                        path: candidate,
                        source,
                    });
                }
            }
        };

        let header = render_header(&input);
        file.write_all(header.as_bytes())
            .and_then(|_| file.write_all(input.content.as_bytes()))
            .map_err(|source| PersistenceError::Io {
                action: "write",
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), stage = %input.stage, version = input.version, "Saved snapshot");
        Ok(path)
    }

    /// Find the newest snapshot across both directories.
    ///
    /// `topic_filter` narrows by case-insensitive slug match against the
    /// filename. Ordering uses the full date+time stamp parsed from the
    /// filename, with same-second ties resolved by run position (see
    /// `SnapshotOrder`); files that do not follow the naming scheme are
    /// skipped.
    pub fn latest(
        &self,
        topic_filter: Option<&str>,
    ) -> Result<Option<StoredSnapshot>, PersistenceError> {
        let filter_slug = topic_filter.map(topic_slug);
        let mut candidates: Vec<(SnapshotOrder, PathBuf)> = Vec::new();

        for dir in [&self.workproduct_dir, &self.output_dir] {
            if !dir.exists() {
                continue;
            }
            let entries = fs::read_dir(dir).map_err(|source| PersistenceError::Io {
                action: "read",
                path: dir.to_path_buf(),
                source,
            })?;

            for entry in entries {
                let entry = entry.map_err(|source| PersistenceError::Io {
                    action: "read",
                    path: dir.to_path_buf(),
                    source,
                })?;
                let path = entry.path();

                if path.extension().and_then(|s| s.to_str()) != Some("md") {
                    continue;
                }

                let order = match order_from_filename(&path) {
                    Some(order) => order,
                    None => {
                        warn!(path = %path.display(), "Skipping file without a snapshot timestamp");
                        continue;
                    }
                };

                if let Some(ref slug) = filter_slug {
                    let stem = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .unwrap_or("")
                        .to_lowercase();
                    if !stem.contains(slug.as_str()) {
                        continue;
                    }
                }

                candidates.push((order, path));
            }
        }

        // The filename fallback keeps ordering deterministic when unrelated
        // topics land in the same second.
        candidates.sort_by(|a, b| {
            a.0.cmp(&b.0)
                .then_with(|| a.1.file_name().cmp(&b.1.file_name()))
        });

        match candidates.pop() {
            Some((_, path)) => Ok(Some(read_snapshot(&path)?)),
            None => Ok(None),
        }
    }
}

fn render_header(input: &SnapshotInput<'_>) -> String {
    let mut header = String::from("---\n");
    let _ = writeln!(header, "version: {}", input.version);
    let _ = writeln!(header, "stage: {}", input.stage);
    let _ = writeln!(header, "topics: {}", input.topics.join(", "));
    let _ = writeln!(header, "approval: {}", input.approval);
    for (key, value) in input.metadata {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        let _ = writeln!(header, "{key}: {value}");
    }
    header.push_str("---\n\n");
    header
}

/// Filename-derived ordering for `latest`.
///
/// The stamp orders across seconds. Within one second, a final outranks the
/// workproduct stages of the run it closed; after that, the sequence marker
/// orders re-saves of one stage and the stage prefix orders stages within
/// one pass. Field order carries the comparison.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct SnapshotOrder {
    stamp: NaiveDateTime,
    closes_run: bool,
    sequence: u32,
    stage_rank: u8,
}

/// Parse ordering out of a `{prefix}_{stage}_{slug}[_r{n}]_{YYYYmmdd_HHMMSS}`
/// filename.
fn order_from_filename(path: &Path) -> Option<SnapshotOrder> {
    let stem = path.file_stem()?.to_str()?;
    let mut parts = stem.rsplitn(3, '_');
    let time = parts.next()?;
    let date = parts.next()?;
    let rest = parts.next()?;
    let stamp = NaiveDateTime::parse_from_str(&format!("{date}_{time}"), "%Y%m%d_%H%M%S").ok()?;

    let sequence = rest
        .rsplit('_')
        .next()
        .and_then(sequence_marker)
        .unwrap_or(1);
    let prefix = rest.split('_').next().unwrap_or("");
    let stage_rank = match prefix {
        "01" => 1,
        "02" => 2,
        "03" => 3,
        "04" => 4,
        "final" => 5,
        _ => 0,
    };

    Some(SnapshotOrder {
        stamp,
        closes_run: prefix == "final",
        sequence,
        stage_rank,
    })
}

/// Read an `r{n}` sequence marker, the piece `save` inserts before the
/// timestamp on same-second collisions.
fn sequence_marker(part: &str) -> Option<u32> {
    let digits = part.strip_prefix('r')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}
