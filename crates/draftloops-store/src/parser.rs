use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::types::{Approval, PersistenceError, SnapshotMeta, StoredSnapshot};

/// Parse just the front-matter header of a snapshot (fast listing path).
pub fn read_meta(path: &Path) -> Result<SnapshotMeta, PersistenceError> {
    let file = File::open(path).map_err(|source| PersistenceError::Io {
        action: "open",
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    let mut lines = reader.lines();

    let first = next_line(&mut lines, path)?;
    if first.as_deref().map(str::trim) != Some("---") {
        return Err(malformed(path, "missing opening front-matter delimiter"));
    }

    let mut header_lines: Vec<String> = Vec::new();
    loop {
        match next_line(&mut lines, path)? {
            Some(line) if line.trim() == "---" => break,
            Some(line) => header_lines.push(line),
            None => return Err(malformed(path, "missing closing front-matter delimiter")),
        }
    }

    parse_header(header_lines.iter().map(String::as_str), path)
}

/// Load a full snapshot: header plus document body.
pub fn read_snapshot(path: &Path) -> Result<StoredSnapshot, PersistenceError> {
    let text = std::fs::read_to_string(path).map_err(|source| PersistenceError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })?;

    let rest = text
        .strip_prefix("---\n")
        .ok_or_else(|| malformed(path, "missing opening front-matter delimiter"))?;
    let end = rest
        .find("\n---\n")
        .ok_or_else(|| malformed(path, "missing closing front-matter delimiter"))?;

    let meta = parse_header(rest[..end].lines(), path)?;
    let after = &rest[end + 5..];
    let content = after.strip_prefix('\n').unwrap_or(after).to_string();

    Ok(StoredSnapshot {
        path: path.to_path_buf(),
        meta,
        content,
    })
}

fn parse_header<'a, I>(lines: I, path: &Path) -> Result<SnapshotMeta, PersistenceError>
where
    I: Iterator<Item = &'a str>,
{
    let mut version: Option<u32> = None;
    let mut stage = None;
    let mut topics: Vec<String> = Vec::new();
    let mut approval = Approval::default();
    let mut metadata: BTreeMap<String, String> = BTreeMap::new();

    for line in lines {
        let (key, value) = match line.split_once(':') {
            Some((key, value)) => (key.trim(), value.trim()),
            None => continue,
        };

        match key {
            "version" => {
                version = Some(value.parse().map_err(|_| {
                    malformed(path, &format!("unparseable version '{value}'"))
                })?);
            }
            "stage" => stage = value.parse().ok(),
            "topics" => {
                topics = value
                    .split(", ")
                    .map(str::to_string)
                    .filter(|t| !t.is_empty())
                    .collect();
            }
            "approval" => {
                approval = value
                    .parse()
                    .map_err(|e: String| malformed(path, &e))?;
            }
            _ => {
                metadata.insert(key.to_string(), value.to_string());
            }
        }
    }

    Ok(SnapshotMeta {
        version: version.unwrap_or(1),
        stage,
        topics,
        approval,
        metadata,
    })
}

fn next_line(
    lines: &mut std::io::Lines<BufReader<File>>,
    path: &Path,
) -> Result<Option<String>, PersistenceError> {
    match lines.next() {
        Some(Ok(line)) => Ok(Some(line)),
        Some(Err(source)) => Err(PersistenceError::Io {
            action: "read",
            path: path.to_path_buf(),
            source,
        }),
        None => Ok(None),
    }
}

fn malformed(path: &Path, reason: &str) -> PersistenceError {
    PersistenceError::MalformedHeader {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}
