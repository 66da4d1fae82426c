//! Volume coverage pattern descriptions.

/// Human-readable description of a volume coverage pattern number.
pub fn vcp_description(vcp: u16) -> &'static str {
    match vcp {
        0 => "Unknown",
        11 | 12 | 21 | 112 | 121 | 211 | 212 | 215 | 221 => "Precipitation Mode",
        31 | 32 | 35 => "Clear Air Mode",
        80 | 90 => "Maintenance Mode",
        _ => "Unknown",
    }
}

/// Whether the pattern is one of the clear air scanning strategies.
pub fn is_clear_air(vcp: u16) -> bool {
    matches!(vcp, 31 | 32 | 35)
}
