use anyhow::Result;
use async_trait::async_trait;

use super::tree::node_for;
use super::{Command, ShellState};

pub struct RefreshCommand;

#[async_trait]
impl Command for RefreshCommand {
    fn name(&self) -> &str {
        "refresh"
    }

    fn usage(&self) -> &str {
        "refresh [-a] [PATH] - Re-fetch a listing; -a drops every cached listing"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let all = args.iter().any(|a| a == "-a");
        let target = match args.iter().find(|a| !a.starts_with('-')) {
            Some(p) => state.resolve(p),
            None => state.current_path().clone(),
        };

        state.set_pending_more(None);
        match node_for(&target).filter(|_| !all) {
            Some(node) => {
                let nodes = state.tree().refresh(&node).await?;
                println!("Refreshed {target} ({} entries)", nodes.len());
            }
            None => {
                state.tree().refresh_all();
                println!("Dropped all cached listings");
            }
        }
        Ok(())
    }
}
