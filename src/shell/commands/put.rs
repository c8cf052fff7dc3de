use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use std::path::PathBuf;

use super::{Command, ShellState};
use crate::error::BrowseError;
use crate::ui::{cancel_on_ctrl_c, create_progress_bar};
use crate::vfs::FileKind;

pub struct PutCommand;

#[async_trait]
impl Command for PutCommand {
    fn name(&self) -> &str {
        "put"
    }

    fn usage(&self) -> &str {
        "put LOCAL... [DEST] - Upload local files (Ctrl-C stops between files)"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        let (sources, dest) = match args {
            [] => return Err(anyhow!("Usage: put LOCAL... [DEST]")),
            [single] => (std::slice::from_ref(single), None),
            [sources @ .., dest] => (sources, Some(dest.as_str())),
        };

        let dest_path = state.resolve(dest.unwrap_or("."));
        let bucket = dest_path
            .bucket()
            .ok_or_else(|| anyhow!("Cannot upload to the root; cd into a bucket first"))?
            .to_string();

        // A single source may be renamed; otherwise DEST is a directory
        let into_dir = sources.len() > 1
            || dest.is_none_or(|d| d.ends_with('/'))
            || dest_path.key().is_empty()
            || matches!(state.fs().stat(&dest_path).await, Ok(s) if s.kind == FileKind::Directory);

        let mut files = Vec::with_capacity(sources.len());
        for source in sources {
            let local = PathBuf::from(source);
            if !local.is_file() {
                return Err(anyhow!("{source}: not a regular file"));
            }
            let key = if into_dir {
                let name = local
                    .file_name()
                    .and_then(|n| n.to_str())
                    .ok_or_else(|| anyhow!("{source}: unusable file name"))?;
                format!("{}{name}", dest_path.dir_prefix())
            } else {
                dest_path.key()
            };
            files.push((local, key));
        }

        let bar = create_progress_bar(files.len(), "Uploading");
        let (cancel, _guard) = cancel_on_ctrl_c();
        let result = state
            .fs()
            .ops()
            .upload_many(&bucket, &files, &cancel, |done, _| bar.set_position(done as u64))
            .await;
        bar.finish_and_clear();

        match result {
            Ok(count) => {
                println!("Uploaded {count} file(s) to s3://{bucket}/{}", dest_path.dir_prefix());
                Ok(())
            }
            Err(BrowseError::Cancelled { completed, total }) => {
                println!("Cancelled: {completed} of {total} file(s) uploaded");
                Ok(())
            }
            Err(e) => Err(e).context("upload failed"),
        }
    }
}
