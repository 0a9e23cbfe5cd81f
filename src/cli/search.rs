use anyhow::{bail, Result};
use serde_json::json;

use tessera::config::TesseraConfig;
use tessera::dispatch;

/// Search options accepted on the command line.
pub struct SearchArgs {
    pub query: Option<String>,
    pub jira: Option<String>,
    pub branch: Option<String>,
    pub limit: usize,
    pub any: bool,
}

/// Run a frame search from the terminal through the same path MCP clients use.
pub async fn search(config: &TesseraConfig, args: SearchArgs) -> Result<()> {
    let ctx = tessera::server::build_engine(config)?;

    let arguments = json!({
        "reference_point": args.query,
        "jira": args.jira,
        "branch": args.branch,
        "limit": args.limit,
        "mode": if args.any { "any" } else { "all" },
    });

    match dispatch::call_tool(&ctx, "frame_search", arguments).await {
        Ok(output) => {
            println!("{}", output.joined_text());
            Ok(())
        }
        Err(error) => {
            eprintln!("{}: {}", error.code, error.message);
            for action in error.next_actions.iter().flatten() {
                eprintln!("  - {action}");
            }
            bail!("search failed")
        }
    }
}
