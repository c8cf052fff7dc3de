use anyhow::Result;
use async_trait::async_trait;
use colored::*;

pub mod cat;
pub mod cd;
pub mod get;
pub mod ls;
pub mod mkdir;
pub mod more;
pub mod mv;
pub mod put;
pub mod refresh;
pub mod rm;
pub mod stats;
pub mod tree;

use super::ShellState;
use crate::vfs::DisplayNode;

/// Trait for shell commands
#[async_trait]
pub trait Command: Send + Sync {
    /// Get the command name
    fn name(&self) -> &str;

    /// Get command usage help
    fn usage(&self) -> &str;

    /// Execute the command
    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()>;
}

/// One line of tree output for a display node
pub(crate) fn render_node(node: &DisplayNode, depth: usize) -> String {
    let indent = "  ".repeat(depth);
    match node {
        DisplayNode::Bucket { .. } | DisplayNode::Folder { .. } => {
            format!("{indent}{}", node.label().blue().bold())
        }
        DisplayNode::Object { size, .. } => format!(
            "{indent}{} {}",
            node.label(),
            humansize::format_size(*size, humansize::BINARY).dimmed()
        ),
        DisplayNode::LoadMore { .. } => format!("{indent}{}", node.label().yellow()),
    }
}
