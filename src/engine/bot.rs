/// Automation-tool markers checked as case-insensitive substrings of the
/// user-agent. Order matters only for the reported reason string.
const BOT_UA_MARKERS: [&str; 8] = [
    "bot",
    "crawl",
    "spider",
    "python-requests",
    "curl",
    "wget",
    "go-http",
    "postman",
];

/// Stateless bot-signature check over client-declared metadata. Returns the
/// rejection reason of the first matching rule, or `None` for a plausibly
/// human client.
pub fn classify(user_agent: &str, battery_level: Option<f64>) -> Option<String> {
    if user_agent.len() < 10 {
        return Some("Missing UA".to_string());
    }
    let ua_lower = user_agent.to_lowercase();
    for marker in BOT_UA_MARKERS {
        if ua_lower.contains(marker) {
            return Some(format!("UA: {marker}"));
        }
    }
    // Real devices almost never report an exact full charge.
    if battery_level == Some(1.0) {
        return Some("Perfect 100% battery (synthetic)".to_string());
    }
    None
}

/// Loopback and private ranges. Local submissions skip the bot check
/// entirely; on a LAN/hotspot deployment they are the expected traffic.
pub fn is_local_addr(addr: &str) -> bool {
    addr == "127.0.0.1"
        || addr == "::1"
        || addr.starts_with("192.168.")
        || addr.starts_with("10.")
        || addr.starts_with("172.")
}
