use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::io::Write;

use super::{Command, ShellState};

/// Bytes shown as hex when an object is not UTF-8
const HEX_PREVIEW_LEN: usize = 1024;

pub struct CatCommand;

#[async_trait]
impl Command for CatCommand {
    fn name(&self) -> &str {
        "cat"
    }

    fn usage(&self) -> &str {
        "cat FILE... - Display file contents"
    }

    async fn execute(&self, state: &mut ShellState, args: &[String]) -> Result<()> {
        if args.is_empty() {
            return Err(anyhow!("Usage: cat FILE..."));
        }

        for arg in args {
            let path = state.resolve(arg);
            let bytes = state.fs().read_file(&path).await?;

            match std::str::from_utf8(&bytes) {
                Ok(text) => print!("{text}"),
                Err(_) => {
                    eprintln!("Warning: {path} contains binary data");
                    let shown = &bytes[..bytes.len().min(HEX_PREVIEW_LEN)];
                    for (row, chunk) in shown.chunks(16).enumerate() {
                        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
                        println!("{:08x}: {}", row * 16, hex.join(" "));
                    }
                    if bytes.len() > HEX_PREVIEW_LEN {
                        eprintln!("... ({} more bytes)", bytes.len() - HEX_PREVIEW_LEN);
                    }
                }
            }
        }
        std::io::stdout().flush()?;
        Ok(())
    }
}
