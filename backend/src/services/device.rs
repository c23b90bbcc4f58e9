//! User-agent classification for activity records

use regex::Regex;
use std::sync::LazyLock;
use vitals_shared::DeviceInfo;

const UNKNOWN: &str = "unknown";

static BOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)bot|crawl|spider|slurp|curl|wget|python-requests|httpclient|kube-probe|monitor")
        .expect("bot pattern")
});

static TABLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)ipad|tablet|kindle|silk|playbook").expect("tablet pattern"));

static MOBILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)mobile|iphone|ipod|android|blackberry|opera mini|iemobile|windows phone")
        .expect("mobile pattern")
});

/// Ordered: the first match wins, so more specific families come first
static PLATFORMS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("iOS", r"(?i)iphone|ipad|ipod"),
        ("Android", r"(?i)android"),
        ("Windows", r"(?i)windows"),
        ("ChromeOS", r"(?i)cros"),
        ("macOS", r"(?i)macintosh|mac os x"),
        ("Linux", r"(?i)linux|x11"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("platform pattern")))
    .collect()
});

static BROWSERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    [
        ("Edge", r"(?i)edg(e|a|ios)?/"),
        ("Opera", r"(?i)opr/|opera"),
        ("Firefox", r"(?i)firefox|fxios"),
        ("Chrome", r"(?i)chrome|crios|chromium"),
        ("Safari", r"(?i)safari"),
        ("IE", r"(?i)msie|trident/"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).expect("browser pattern")))
    .collect()
});

fn first_match(table: &[(&'static str, Regex)], user_agent: &str) -> &'static str {
    table
        .iter()
        .find(|(_, re)| re.is_match(user_agent))
        .map(|(name, _)| *name)
        .unwrap_or(UNKNOWN)
}

/// Classify a user agent. Missing or empty agents classify as unknown,
/// neither mobile nor desktop.
pub fn classify(user_agent: Option<&str>) -> DeviceInfo {
    let Some(ua) = user_agent.map(str::trim).filter(|ua| !ua.is_empty()) else {
        return DeviceInfo {
            platform: UNKNOWN.to_string(),
            browser: UNKNOWN.to_string(),
            device: UNKNOWN.to_string(),
            is_mobile: false,
            is_desktop: false,
        };
    };

    let platform = first_match(&PLATFORMS, ua);
    let browser = first_match(&BROWSERS, ua);

    let device = if BOT.is_match(ua) {
        "bot"
    } else if is_tablet(ua) {
        "tablet"
    } else if MOBILE.is_match(ua) {
        "mobile"
    } else if matches!(platform, "Windows" | "macOS" | "Linux" | "ChromeOS") {
        "desktop"
    } else {
        UNKNOWN
    };

    DeviceInfo {
        platform: platform.to_string(),
        browser: browser.to_string(),
        device: device.to_string(),
        is_mobile: matches!(device, "mobile" | "tablet"),
        is_desktop: device == "desktop",
    }
}

/// Android tablets are Android agents that do not advertise "Mobile"
fn is_tablet(ua: &str) -> bool {
    let lower = ua.to_ascii_lowercase();
    TABLET.is_match(ua) || (lower.contains("android") && !lower.contains("mobile"))
}
