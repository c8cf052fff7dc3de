use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState, render_node};
use crate::vfs::{DisplayNode, VirtualPath};

pub struct TreeCommand;

#[async_trait]
impl Command for TreeCommand {
    fn name(&self) -> &str {
        "tree"
    }

    fn usage(&self) -> &str {
        "tree [-d DEPTH] [PATH] - Show one page per folder; `more` loads the next"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let mut depth = 1usize;
        let mut path_arg = None;
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            if arg == "-d" {
                let value = iter.next().ok_or_else(|| anyhow!("Usage: tree [-d DEPTH] [PATH]"))?;
                depth = value.parse().map_err(|_| anyhow!("Invalid depth: {value}"))?;
            } else {
                path_arg = Some(arg.as_str());
            }
        }

        let target = match path_arg {
            Some(p) => state.resolve(p),
            None => state.current_path().clone(),
        };

        let top = match node_for(&target) {
            Some(node) => state.tree().children(&node).await?,
            None => state.tree().roots().await?,
        };

        let mut pending = None;
        let mut stack: Vec<(DisplayNode, usize)> = top.into_iter().rev().map(|n| (n, 0)).collect();
        while let Some((node, level)) = stack.pop() {
            println!("{}", render_node(&node, level));
            if node.is_expandable() && level + 1 < depth {
                let children = state.tree().children(&node).await?;
                stack.extend(children.into_iter().rev().map(|n| (n, level + 1)));
            } else if level == 0 && matches!(node, DisplayNode::LoadMore { .. }) {
                pending = Some(node);
            }
        }

        state.set_pending_more(pending);
        Ok(())
    }
}

/// Tree node shown for a directory path; `None` at the root
pub(crate) fn node_for(path: &VirtualPath) -> Option<DisplayNode> {
    let bucket = path.bucket()?.to_string();
    let prefix = path.dir_prefix();
    Some(if prefix.is_empty() {
        DisplayNode::Bucket { bucket }
    } else {
        DisplayNode::Folder { bucket, prefix }
    })
}
