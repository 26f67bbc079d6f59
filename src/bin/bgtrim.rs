//! bgtrim CLI tool
//!
//! Command-line interface for erasing near-white backgrounds and cropping
//! images to their content.

#[cfg(feature = "cli")]
use bgtrim::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Please rebuild with --features cli");
    std::process::exit(2);
}
