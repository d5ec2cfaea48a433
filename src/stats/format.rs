//! Human-readable labels for traffic figures.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Binary-prefixed size with a fixed-width number, e.g. `001.50 KB`.
pub fn human_readable_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:06.2} {}", value, UNITS[unit])
}

/// Rate label in the unit the rate was scaled to.
pub fn speed_label(rate: f64) -> String {
    format!("{:05.2} KB/s", rate)
}
