use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum DeviceType {
    Desktop,
    Mobile,
    Tablet,
    Unknown,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceType::Desktop => write!(f, "Desktop"),
            DeviceType::Mobile => write!(f, "Mobile"),
            DeviceType::Tablet => write!(f, "Tablet"),
            DeviceType::Unknown => write!(f, "Unknown"),
        }
    }
}

const TABLET_MARKERS: &[&str] = &["ipad", "tablet", "playbook", "silk", "kindle"];
const MOBILE_MARKERS: &[&str] = &[
    "mobi",
    "iphone",
    "ipod",
    "android",
    "blackberry",
    "opera mini",
    "iemobile",
    "windows phone",
];
const DESKTOP_MARKERS: &[&str] = &["windows nt", "macintosh", "x11", "linux", "cros"];

impl DeviceType {
    pub fn all() -> [DeviceType; 4] {
        [
            DeviceType::Desktop,
            DeviceType::Mobile,
            DeviceType::Tablet,
            DeviceType::Unknown,
        ]
    }

    /// Coarse device class from a User-Agent header.
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_ascii_lowercase();
        if ua.trim().is_empty() {
            return DeviceType::Unknown;
        }

        // Android tablets omit "mobile" from their UA
        let android_tablet = ua.contains("android") && !ua.contains("mobile");
        if android_tablet || TABLET_MARKERS.iter().any(|m| ua.contains(m)) {
            return DeviceType::Tablet;
        }
        if MOBILE_MARKERS.iter().any(|m| ua.contains(m)) {
            return DeviceType::Mobile;
        }
        if DESKTOP_MARKERS.iter().any(|m| ua.contains(m)) {
            return DeviceType::Desktop;
        }
        DeviceType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_user_agents() {
        let cases = [
            (
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/124.0 Safari/537.36",
                DeviceType::Desktop,
            ),
            (
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 Version/17.4 Safari/605.1.15",
                DeviceType::Desktop,
            ),
            (
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148",
                DeviceType::Mobile,
            ),
            (
                "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 Chrome/124.0 Mobile Safari/537.36",
                DeviceType::Mobile,
            ),
            (
                "Mozilla/5.0 (iPad; CPU OS 17_4 like Mac OS X) AppleWebKit/605.1.15 Mobile/15E148",
                DeviceType::Tablet,
            ),
            (
                "Mozilla/5.0 (Linux; Android 13; SM-X700) AppleWebKit/537.36 Chrome/124.0 Safari/537.36",
                DeviceType::Tablet,
            ),
            ("curl/8.5.0", DeviceType::Unknown),
            ("", DeviceType::Unknown),
        ];

        for (ua, expected) in cases {
            assert_eq!(DeviceType::from_user_agent(ua), expected, "{ua}");
        }
    }

    #[test]
    fn serializes_as_uppercase_tag() {
        let json = serde_json::to_string(&DeviceType::Tablet).unwrap();
        assert_eq!(json, "\"TABLET\"");
    }
}
