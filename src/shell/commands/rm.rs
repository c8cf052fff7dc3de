use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{Command, ShellState};
use crate::error::BrowseError;
use crate::ui::{cancel_on_ctrl_c, create_progress_bar};

pub struct RmCommand;

#[async_trait]
impl Command for RmCommand {
    fn name(&self) -> &str {
        "rm"
    }

    fn usage(&self) -> &str {
        "rm PATH... - Delete objects or empty folders (Ctrl-C stops a batch)"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        match args {
            [] => Err(anyhow!("Usage: rm PATH...")),
            [single] => {
                let path = state.resolve(single);
                state.fs().delete(&path).await?;
                Ok(())
            }
            many => {
                let paths: Vec<_> = many.iter().map(|a| state.resolve(a)).collect();
                let bucket = paths[0]
                    .bucket()
                    .ok_or_else(|| anyhow!("Cannot delete buckets"))?
                    .to_string();
                if paths.iter().any(|p| p.bucket() != Some(bucket.as_str())) {
                    return Err(BrowseError::Unsupported(
                        "batch delete across buckets".to_string(),
                    )
                    .into());
                }
                let keys: Vec<String> = paths.iter().map(|p| p.key()).collect();
                if keys.iter().any(|k| k.is_empty()) {
                    return Err(anyhow!("Cannot delete buckets"));
                }

                let bar = create_progress_bar(keys.len(), "Deleting");
                let (cancel, _guard) = cancel_on_ctrl_c();
                let result = state
                    .fs()
                    .ops()
                    .delete_many(&bucket, &keys, &cancel, |done, _| bar.set_position(done as u64))
                    .await;
                bar.finish_and_clear();

                match result {
                    Ok(count) => {
                        println!("Deleted {count} object(s)");
                        Ok(())
                    }
                    Err(BrowseError::Cancelled { completed, total }) => {
                        println!("Cancelled: {completed} of {total} object(s) deleted");
                        Ok(())
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }
}
