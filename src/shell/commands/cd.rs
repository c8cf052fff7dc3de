use anyhow::Result;
use async_trait::async_trait;

use super::{Command, ShellState};
use crate::error::BrowseError;
use crate::vfs::FileKind;

pub struct CdCommand;

#[async_trait]
impl Command for CdCommand {
    fn name(&self) -> &str {
        "cd"
    }

    fn usage(&self) -> &str {
        "cd [PATH] - Change current directory"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        // cd with no args goes to root
        let target = state.resolve(args.first().map(String::as_str).unwrap_or("/"));

        if state.fs().stat(&target).await?.kind != FileKind::Directory {
            return Err(BrowseError::NotADirectory(target.to_string()).into());
        }

        state.set_current_path(target);
        Ok(())
    }
}
