//! Tab completion served from the listing cache.
//!
//! Completion never touches the network: a directory that has no fresh
//! cache entry simply offers nothing until a command lists it.

use rustyline::Context;
use rustyline::completion::{Completer, Pair};
use std::sync::{Arc, RwLock};

use crate::cache::ListingCache;
use crate::vfs::fs::direct_children;
use crate::vfs::{FileKind, VirtualPath, materialize};

const COMMANDS: &[&str] = &[
    "cat", "cd", "exit", "get", "help", "ls", "mkdir", "more", "mv", "put", "pwd", "refresh",
    "rm", "stats", "tree",
];

/// Entry in completion cache with metadata
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionEntry {
    pub name: String,
    pub is_dir: bool,
}

/// What the completer knows: the listing cache, the bucket names seen at
/// the root and the shell's current directory
#[derive(Clone)]
pub struct CompletionCache {
    listings: ListingCache,
    buckets: Arc<RwLock<Vec<String>>>,
    current_path: Arc<RwLock<VirtualPath>>,
}

impl CompletionCache {
    pub fn new(listings: ListingCache) -> Self {
        CompletionCache {
            listings,
            buckets: Arc::new(RwLock::new(Vec::new())),
            current_path: Arc::new(RwLock::new(VirtualPath::root())),
        }
    }

    pub fn set_current_path(&self, path: VirtualPath) {
        if let Ok(mut current) = self.current_path.write() {
            *current = path;
        }
    }

    pub fn current_path(&self) -> VirtualPath {
        self.current_path
            .read()
            .map(|p| p.clone())
            .unwrap_or_else(|_| VirtualPath::root())
    }

    /// Remember the bucket names last listed at the root
    pub fn set_buckets(&self, names: Vec<String>) {
        if let Ok(mut buckets) = self.buckets.write() {
            *buckets = names;
        }
    }

    /// Entries of a directory, if its listing is cached and fresh
    pub fn entries(&self, dir: &VirtualPath) -> Vec<CompletionEntry> {
        let Some(bucket) = dir.bucket() else {
            return self
                .buckets
                .read()
                .map(|names| {
                    names
                        .iter()
                        .map(|name| CompletionEntry {
                            name: name.clone(),
                            is_dir: true,
                        })
                        .collect()
                })
                .unwrap_or_default();
        };

        let prefix = dir.dir_prefix();
        let scope = Some(prefix.as_str()).filter(|p| !p.is_empty());
        let Some(entry) = self.listings.get(bucket, scope) else {
            return Vec::new();
        };

        direct_children(&prefix, &materialize(bucket, scope, &entry))
            .into_iter()
            .map(|e| CompletionEntry {
                name: e.name,
                is_dir: e.kind == FileKind::Directory,
            })
            .collect()
    }
}

/// Tab completion helper for the shell
pub struct ShellCompleter {
    cache: CompletionCache,
}

impl ShellCompleter {
    pub fn new(cache: CompletionCache) -> Self {
        ShellCompleter { cache }
    }

    fn complete_command(&self, word: &str) -> Vec<Pair> {
        COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(word))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect()
    }

    /// Complete the path argument `word`; `cd` is offered directories only
    fn complete_path(&self, word: &str, command: &str) -> Vec<Pair> {
        let (dir_part, name_prefix) = match word.rfind('/') {
            Some(pos) => word.split_at(pos + 1),
            None => ("", word),
        };
        let dir = self.cache.current_path().resolve(dir_part);

        self.cache
            .entries(&dir)
            .into_iter()
            .filter(|entry| entry.name.starts_with(name_prefix))
            .filter(|entry| command != "cd" || entry.is_dir)
            .map(|entry| {
                let suffix = if entry.is_dir { "/" } else { "" };
                Pair {
                    replacement: format!("{dir_part}{}{suffix}", entry.name),
                    display: format!("{}{suffix}", entry.name),
                }
            })
            .collect()
    }
}

impl Completer for ShellCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some(command) = words.first() else {
            return Ok((0, Vec::new()));
        };

        if words.len() == 1 && !line.ends_with(char::is_whitespace) {
            return Ok((pos - command.len(), self.complete_command(command)));
        }

        let word = if line.ends_with(char::is_whitespace) {
            ""
        } else {
            words.last().copied().unwrap_or("")
        };
        Ok((pos - word.len(), self.complete_path(word, command)))
    }
}

impl rustyline::Helper for ShellCompleter {}
impl rustyline::highlight::Highlighter for ShellCompleter {}
impl rustyline::hint::Hinter for ShellCompleter {
    type Hint = String;
}
impl rustyline::validate::Validator for ShellCompleter {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_TTL, ListingPage, ObjectEntry, PrefixEntry};

    fn completer() -> (ShellCompleter, CompletionCache) {
        let listings = ListingCache::new(DEFAULT_TTL);
        listings.set(
            "bkt",
            None,
            ListingPage::complete(
                vec![ObjectEntry::new("notes.txt", 3)],
                vec![PrefixEntry::new("data/"), PrefixEntry::new("docs/")],
            ),
        );
        let cache = CompletionCache::new(listings);
        cache.set_buckets(vec!["bkt".to_string(), "other".to_string()]);
        (ShellCompleter::new(cache.clone()), cache)
    }

    fn replacements(pairs: Vec<Pair>) -> Vec<String> {
        pairs.into_iter().map(|p| p.replacement).collect()
    }

    #[test]
    fn test_complete_commands() {
        let (completer, _) = completer();
        assert_eq!(replacements(completer.complete_command("m")), vec!["mkdir", "more", "mv"]);
    }

    #[test]
    fn test_complete_from_cached_listing() {
        let (completer, cache) = completer();
        cache.set_current_path(VirtualPath::parse("/bkt"));

        assert_eq!(
            replacements(completer.complete_path("d", "ls")),
            vec!["data/", "docs/"]
        );
        assert_eq!(
            replacements(completer.complete_path("", "cd")),
            vec!["data/", "docs/"]
        );
        assert_eq!(
            replacements(completer.complete_path("/bkt/no", "cat")),
            vec!["/bkt/notes.txt"]
        );
    }

    #[test]
    fn test_uncached_directory_offers_nothing() {
        let (completer, cache) = completer();
        assert_eq!(replacements(completer.complete_path("o", "cd")), vec!["other/"]);

        cache.set_current_path(VirtualPath::parse("/bkt/data"));
        assert!(completer.complete_path("", "ls").is_empty());
    }
}
