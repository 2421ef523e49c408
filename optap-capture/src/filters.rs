//! BPF (Berkeley Packet Filter) validation

use optap_core::{Error, Result};
use pcap::{Capture, Linktype};

/// Compile `expr` against a dead handle of the given datalink
///
/// Lets a source reject a bad expression before touching any device.
pub fn validate_filter(expr: &str, link: Linktype) -> Result<()> {
    let capture = Capture::dead(link)
        .map_err(|e| Error::setup(format!("Failed to create filter handle: {}", e)))?;
    capture
        .compile(expr, true)
        .map_err(|e| Error::setup(format!("Invalid BPF filter '{}': {}", expr, e)))?;
    Ok(())
}
