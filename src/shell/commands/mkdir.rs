use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};

pub struct MkdirCommand;

#[async_trait]
impl Command for MkdirCommand {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn usage(&self) -> &str {
        "mkdir DIR... - Create folders (empty marker objects)"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: mkdir DIR..."));
        }
        for arg in args {
            let path = state.resolve(arg);
            state.fs().create_directory(&path).await?;
        }
        Ok(())
    }
}
