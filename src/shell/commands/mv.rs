use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};
use crate::vfs::FileKind;

pub struct MvCommand;

#[async_trait]
impl Command for MvCommand {
    fn name(&self) -> &str {
        "mv"
    }

    fn usage(&self) -> &str {
        "mv SRC DEST - Rename an object within its bucket"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let [src, dest] = args else {
            return Err(anyhow!("Usage: mv SRC DEST"));
        };
        let from = state.resolve(src);
        let mut to = state.resolve(dest);

        // Moving onto an existing directory keeps the file name
        if let Ok(stat) = state.fs().stat(&to).await
            && stat.kind == FileKind::Directory
            && let Some(name) = from.filename()
        {
            to = to.join(name);
        }

        state
            .fs()
            .rename(&from, &to)
            .await
            .with_context(|| format!("mv {from} {to}"))
    }
}
