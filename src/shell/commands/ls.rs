use anyhow::Result;
use async_trait::async_trait;
use colored::*;

use super::{Command, ShellState};
use crate::error::BrowseError;
use crate::vfs::{DirEntry, FileKind};

pub struct LsCommand;

#[async_trait]
impl Command for LsCommand {
    fn name(&self) -> &str {
        "ls"
    }

    fn usage(&self) -> &str {
        "ls [-l] [PATH|PATTERN] - List directory contents"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let long_format = args.iter().any(|a| a == "-l");
        let path_arg = args.iter().find(|a| !a.starts_with('-'));

        // A trailing segment with wildcards filters the parent directory
        let (target, pattern) = match path_arg {
            Some(path) if path.contains(['*', '?']) => {
                let (dir, pattern) = match path.rfind('/') {
                    Some(pos) => (&path[..=pos], &path[pos + 1..]),
                    None => ("", path.as_str()),
                };
                (state.resolve(dir), Some(pattern.to_string()))
            }
            Some(path) => (state.resolve(path), None),
            None => (state.current_path().clone(), None),
        };

        let entries = match state.fs().read_directory(&target).await {
            Ok(entries) => entries,
            Err(BrowseError::NotFound { .. }) if pattern.is_none() && !target.is_root() => {
                // `ls FILE` prints the file itself
                let stat = state.fs().stat(&target).await?;
                if stat.kind == FileKind::Directory {
                    Vec::new()
                } else {
                    vec![DirEntry {
                        name: target.filename().unwrap_or_default().to_string(),
                        kind: stat.kind,
                        size: stat.size,
                        last_modified: stat.last_modified,
                    }]
                }
            }
            Err(e) => return Err(e.into()),
        };

        if target.is_root() {
            state
                .completion_cache()
                .set_buckets(entries.iter().map(|e| e.name.clone()).collect());
        }

        let entries = entries
            .into_iter()
            .filter(|e| pattern.as_deref().is_none_or(|p| matches_pattern(&e.name, p)));

        if long_format {
            println!("{:<50} {:>12} MODIFIED", "NAME", "SIZE");
            println!("{}", "-".repeat(80));
            for entry in entries {
                let modified = entry
                    .last_modified
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                match entry.kind {
                    FileKind::Directory => println!(
                        "{:<50} {:>12} {modified}",
                        format!("{}/", entry.name).blue().bold(),
                        "-"
                    ),
                    FileKind::File => println!(
                        "{:<50} {:>12} {modified}",
                        entry.name,
                        humansize::format_size(entry.size, humansize::BINARY)
                    ),
                }
            }
        } else {
            for entry in entries {
                match entry.kind {
                    FileKind::Directory => println!("{}/", entry.name.blue().bold()),
                    FileKind::File => println!("{}", entry.name),
                }
            }
        }

        Ok(())
    }
}

/// Match a name against a shell wildcard pattern (`*` and `?`)
fn matches_pattern(name: &str, pattern: &str) -> bool {
    fn matches(name: &[char], pattern: &[char]) -> bool {
        match (pattern.split_first(), name.split_first()) {
            (None, None) => true,
            (Some(('*', rest)), _) => {
                matches(name, rest) || (!name.is_empty() && matches(&name[1..], pattern))
            }
            (Some(('?', rest)), Some((_, name_rest))) => matches(name_rest, rest),
            (Some((p, rest)), Some((n, name_rest))) if p == n => matches(name_rest, rest),
            _ => false,
        }
    }
    let name: Vec<char> = name.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    matches(&name, &pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matches_pattern() {
        assert!(matches_pattern("report.csv", "*.csv"));
        assert!(matches_pattern("report.csv", "rep?rt.*"));
        assert!(matches_pattern("a", "*"));
        assert!(matches_pattern("", "*"));
        assert!(!matches_pattern("report.csv", "*.json"));
        assert!(!matches_pattern("ab", "a"));
        assert!(!matches_pattern("a", "a?"));
    }
}
