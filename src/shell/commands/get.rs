use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::path::PathBuf;

use super::{Command, ShellState};
use crate::error::BrowseError;
use crate::ui::{cancel_on_ctrl_c, create_spinner};

pub struct GetCommand;

#[async_trait]
impl Command for GetCommand {
    fn name(&self) -> &str {
        "get"
    }

    fn usage(&self) -> &str {
        "get FILE [LOCAL] - Download an object (Ctrl-C cancels)"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let (remote, local) = match args {
            [remote] => (remote, None),
            [remote, local] => (remote, Some(local)),
            _ => return Err(anyhow!("Usage: get FILE [LOCAL]")),
        };

        let path = state.resolve(remote);
        let (Some(bucket), Some(name)) = (path.bucket(), path.filename()) else {
            return Err(BrowseError::IsADirectory(path.to_string()).into());
        };
        let key = path.key();
        if key.is_empty() {
            return Err(BrowseError::IsADirectory(path.to_string()).into());
        }

        let mut dest = local.map(PathBuf::from).unwrap_or_else(|| PathBuf::from(name));
        if dest.is_dir() {
            dest.push(name);
        }

        let spinner = create_spinner(&format!("Downloading {name}..."));
        let (cancel, _guard) = cancel_on_ctrl_c();
        let result = state.fs().ops().download(bucket, &key, &dest, &cancel).await;
        spinner.finish_and_clear();

        match result {
            Ok(bytes) => {
                println!(
                    "{} -> {} ({})",
                    path,
                    dest.display(),
                    humansize::format_size(bytes, humansize::BINARY)
                );
                Ok(())
            }
            Err(BrowseError::Cancelled { .. }) => {
                println!("Download cancelled");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
