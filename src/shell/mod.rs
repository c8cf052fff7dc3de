pub mod commands;
pub mod completion;

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Arc;

use crate::listing::ListingService;
use crate::tree::BucketTree;
use crate::vfs::{DisplayNode, VirtualFs, VirtualPath};
use commands::Command;
pub use completion::{CompletionCache, ShellCompleter};

/// Shell state - tracks current location and provides command execution
pub struct ShellState {
    /// Current directory in the virtual filesystem
    cwd: VirtualPath,
    service: Arc<ListingService>,
    fs: VirtualFs,
    tree: BucketTree,
    /// Load-more node left over from the last `tree` listing
    pending_more: Option<DisplayNode>,
    /// Tab completion cache
    completion_cache: CompletionCache,
    /// Registered commands
    commands: HashMap<String, Arc<dyn Command>>,
}

impl ShellState {
    /// Create shell state on top of a listing service
    pub fn new(service: Arc<ListingService>, bucket_filter: Vec<String>) -> Self {
        let mut state = ShellState {
            cwd: VirtualPath::root(),
            fs: VirtualFs::new(Arc::clone(&service)),
            tree: BucketTree::new(Arc::clone(&service), bucket_filter),
            completion_cache: CompletionCache::new(service.cache().clone()),
            pending_more: None,
            service,
            commands: HashMap::new(),
        };

        state.register_command(Arc::new(commands::ls::LsCommand));
        state.register_command(Arc::new(commands::cd::CdCommand));
        state.register_command(Arc::new(commands::cat::CatCommand));
        state.register_command(Arc::new(commands::tree::TreeCommand));
        state.register_command(Arc::new(commands::more::MoreCommand));
        state.register_command(Arc::new(commands::put::PutCommand));
        state.register_command(Arc::new(commands::get::GetCommand));
        state.register_command(Arc::new(commands::rm::RmCommand));
        state.register_command(Arc::new(commands::mkdir::MkdirCommand));
        state.register_command(Arc::new(commands::mv::MvCommand));
        state.register_command(Arc::new(commands::refresh::RefreshCommand));
        state.register_command(Arc::new(commands::stats::StatsCommand));

        state
    }

    fn register_command(&mut self, command: Arc<dyn Command>) {
        self.commands.insert(command.name().to_string(), command);
    }

    /// Execute a command line
    pub async fn execute(&mut self, line: &str) -> Result<()> {
        let parts = Self::parse_command_line(line.trim())?;
        let Some((cmd_name, args)) = parts.split_first() else {
            return Ok(());
        };

        match cmd_name.as_str() {
            "exit" | "quit" => return Err(anyhow!("exit")),
            "help" => {
                self.print_help();
                return Ok(());
            }
            "pwd" => {
                println!("{}", self.cwd);
                return Ok(());
            }
            _ => {}
        }

        match self.commands.get(cmd_name) {
            Some(command) => {
                let cmd = Arc::clone(command);
                cmd.execute(self, args).await
            }
            None => Err(anyhow!("Unknown command: {cmd_name}")),
        }
    }

    pub fn current_path(&self) -> &VirtualPath {
        &self.cwd
    }

    pub fn set_current_path(&mut self, path: VirtualPath) {
        self.completion_cache.set_current_path(path.clone());
        self.cwd = path;
    }

    /// Resolve a command argument against the current directory
    pub fn resolve(&self, arg: &str) -> VirtualPath {
        self.cwd.resolve(arg)
    }

    pub fn service(&self) -> &Arc<ListingService> {
        &self.service
    }

    pub fn fs(&self) -> &VirtualFs {
        &self.fs
    }

    pub fn tree(&self) -> &BucketTree {
        &self.tree
    }

    pub fn take_pending_more(&mut self) -> Option<DisplayNode> {
        self.pending_more.take()
    }

    pub fn set_pending_more(&mut self, node: Option<DisplayNode>) {
        self.pending_more = node;
    }

    pub fn completion_cache(&self) -> &CompletionCache {
        &self.completion_cache
    }

    fn print_help(&self) {
        let mut names: Vec<_> = self.commands.keys().collect();
        names.sort();
        println!("Available commands:");
        for name in names {
            println!("  {}", self.commands[name].usage());
        }
        println!("  pwd - Print working directory");
        println!("  help - Show this help");
        println!("  exit/quit - Exit the shell");
    }

    /// Get the prompt string
    pub fn prompt(&self) -> String {
        format!("s3tree:{} $ ", self.cwd)
    }

    /// Split a command line into words, honouring quotes and backslash escapes
    fn parse_command_line(line: &str) -> Result<Vec<String>> {
        let mut args = Vec::new();
        let mut current = String::new();
        let mut quote: Option<char> = None;
        let mut escaped = false;

        for ch in line.chars() {
            if escaped {
                current.push(ch);
                escaped = false;
                continue;
            }
            match (ch, quote) {
                ('\\', Some('"') | None) => escaped = true,
                ('\'' | '"', None) => quote = Some(ch),
                (c, Some(q)) if c == q => quote = None,
                (' ' | '\t', None) => {
                    if !current.is_empty() {
                        args.push(std::mem::take(&mut current));
                    }
                }
                _ => current.push(ch),
            }
        }

        if let Some(q) = quote {
            return Err(anyhow!("Unclosed quote: {q}"));
        }
        if !current.is_empty() {
            args.push(current);
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{DEFAULT_TTL, ListingCache};
    use crate::s3::MemoryBackend;

    fn shell() -> (ShellState, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new(100));
        backend.insert("bkt", "docs/readme.md", "hello");
        backend.insert("bkt", "top.txt", "top");
        let service = Arc::new(ListingService::new(
            backend.clone(),
            ListingCache::new(DEFAULT_TTL),
        ));
        (ShellState::new(service, Vec::new()), backend)
    }

    #[test]
    fn test_parse_command_line() {
        assert_eq!(
            ShellState::parse_command_line(r#"cat "my file.txt" 'a b' c\ d"#).unwrap(),
            vec!["cat", "my file.txt", "a b", "c d"]
        );
        assert!(ShellState::parse_command_line("cat \"open").is_err());
        assert!(ShellState::parse_command_line("   ").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cd_and_prompt() {
        let (mut state, _backend) = shell();
        state.execute("cd /bkt/docs").await.unwrap();
        assert_eq!(state.prompt(), "s3tree:/bkt/docs $ ");

        state.execute("cd ..").await.unwrap();
        assert_eq!(state.current_path().to_string(), "/bkt");

        let err = state.execute("cd top.txt").await.unwrap_err();
        assert!(err.to_string().contains("not a directory"));
        assert_eq!(state.current_path().to_string(), "/bkt");
    }

    #[tokio::test]
    async fn test_mkdir_then_rm() {
        let (mut state, backend) = shell();
        state.execute("cd /bkt").await.unwrap();
        state.execute("mkdir photos").await.unwrap();
        assert!(backend.keys("bkt").contains(&"photos/".to_string()));

        state.execute("rm photos").await.unwrap();
        assert!(!backend.keys("bkt").contains(&"photos/".to_string()));
    }

    #[tokio::test]
    async fn test_exit_and_unknown() {
        let (mut state, _backend) = shell();
        assert_eq!(state.execute("exit").await.unwrap_err().to_string(), "exit");
        assert!(state.execute("frobnicate").await.is_err());
        assert!(state.execute("").await.is_ok());
    }
}
