//! Debug-level hex dump of request and reply buffers

/// Log `data` as hex lines of 16 bytes under the given label
pub(crate) fn hex_dump(label: &str, data: &[u8]) {
    if !log::log_enabled!(log::Level::Debug) {
        return;
    }
    log::debug!("{} ({} bytes)", label, data.len());
    for (i, chunk) in data.chunks(16).enumerate() {
        let line: Vec<String> = chunk.iter().map(|b| format!("{:02x}", b)).collect();
        log::debug!("{:04x}: {}", i * 16, line.join(" "));
    }
}
