//! Tracing setup. Disk logging sinks are an external collaborator (spec
//! §1); this installs an `EnvFilter`-driven subscriber writing to stderr
//! so stdout stays clean for the MCP stdio transport.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
