//! xui-bulk command-line entry point.
//!
//! - `xui-bulk` / `xui-bulk shell` - interactive menu
//! - `xui-bulk inbounds`, `xui-bulk clients` - listings
//! - `xui-bulk bulk`, `xui-bulk client` - one-shot edits
//! - `xui-bulk restart` - restart the panel service

use std::process::ExitCode;

use clap::Parser;
use xui_manager::ManagerArgs;

#[tokio::main]
async fn main() -> ExitCode {
    let args = ManagerArgs::parse();

    match xui_manager::run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
