pub mod search;
pub mod stats;

use anyhow::Result;

use tessera::tools;

/// Print the tool catalog and the deprecated aliases.
pub fn list_tools() -> Result<()> {
    println!("Tools");
    println!("{}", "=".repeat(40));
    for tool in tools::catalog() {
        let aliases = tools::aliases_for(tool.name);
        if aliases.is_empty() {
            println!("  {:<22} {}", tool.name, tool.description);
        } else {
            println!(
                "  {:<22} {} (aliases: {})",
                tool.name,
                tool.description,
                aliases.join(", ")
            );
        }
    }
    Ok(())
}
