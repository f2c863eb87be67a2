//! Nexus teleport rail service
//!
//! Entry point for the Nexus mock ecosystem HTTP service.

use nexus_rails_teleport::main_entry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    main_entry::run_server().await
}
