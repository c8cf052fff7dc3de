use anyhow::{Result, anyhow};
use async_trait::async_trait;
use colored::*;

use super::tree::node_for;
use super::{Command, ShellState, render_node};
use crate::error::BrowseError;
use crate::vfs::{DisplayNode, VirtualPath};

pub struct MoreCommand;

#[async_trait]
impl Command for MoreCommand {
    fn name(&self) -> &str {
        "more"
    }

    fn usage(&self) -> &str {
        "more - Load the next page of the last `tree` listing"
    }

    async fn execute(&self, state: &mut ShellState, _args: &[String]) -> Result<()> {
        let Some(node) = state.take_pending_more() else {
            return Err(anyhow!("Nothing more to load; run `tree` first"));
        };

        let nodes = match state.tree().children(&node).await {
            Ok(nodes) => nodes,
            Err(err @ BrowseError::MalformedContinuationToken { .. }) => {
                eprintln!("{} {err}", "Warning:".yellow().bold());
                // The listing was reloaded from its first page
                let parent = node
                    .listing_key()
                    .and_then(|key| node_for(&VirtualPath::from_listing(&key.bucket, &key.prefix)))
                    .ok_or(err)?;
                state.tree().children(&parent).await?
            }
            Err(err) => {
                // Keep the sentinel so a retryable failure can be retried
                if err.is_retryable() {
                    state.set_pending_more(Some(node));
                }
                return Err(err.into());
            }
        };

        for node in &nodes {
            println!("{}", render_node(node, 0));
        }
        state.set_pending_more(
            nodes
                .into_iter()
                .find(|n| matches!(n, DisplayNode::LoadMore { .. })),
        );
        Ok(())
    }
}
