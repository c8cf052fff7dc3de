use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;

use super::{Command, ShellState};

pub struct StatsCommand;

#[async_trait]
impl Command for StatsCommand {
    fn name(&self) -> &str {
        "stats"
    }

    fn usage(&self) -> &str {
        "stats - Show listing cache and request statistics as JSON"
    }

    async fn execute(&self, state: &mut ShellState, _args: &[String]) -> Result<()> {
        let cache = state.service().cache();
        let stats = cache.stats();
        let metrics = state.service().metrics();

        let report = json!({
            "cache": {
                "ttl_secs": cache.ttl().as_secs(),
                "size": stats.size,
                "keys": stats.keys.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
                "hits": stats.hits,
                "misses": stats.misses,
                "evictions": stats.evictions,
            },
            "requests": {
                "count": metrics.request_count(),
                "errors": metrics.error_count(),
                "items": metrics.total_items(),
                "total_ms": metrics.total_request_time().as_millis() as u64,
            },
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }
}
