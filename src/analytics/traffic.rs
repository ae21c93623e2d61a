use serde::Serialize;
use std::fmt;
use url::Url;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficSource {
    #[serde(rename = "Direct")]
    Direct,
    #[serde(rename = "Organic Search")]
    OrganicSearch,
    #[serde(rename = "Social Media")]
    SocialMedia,
    #[serde(rename = "Email")]
    Email,
    #[serde(rename = "Referral")]
    Referral,
}

impl fmt::Display for TrafficSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficSource::Direct => write!(f, "Direct"),
            TrafficSource::OrganicSearch => write!(f, "Organic Search"),
            TrafficSource::SocialMedia => write!(f, "Social Media"),
            TrafficSource::Email => write!(f, "Email"),
            TrafficSource::Referral => write!(f, "Referral"),
        }
    }
}

// Matched against any label of the referrer host, so regional domains count too
const SEARCH_ENGINE_LABELS: &[&str] = &[
    "google",
    "bing",
    "yahoo",
    "duckduckgo",
    "baidu",
    "yandex",
    "ecosia",
    "startpage",
];

// Matched as the host or a parent domain of it
const SOCIAL_DOMAINS: &[&str] = &[
    "facebook.com",
    "fb.com",
    "instagram.com",
    "twitter.com",
    "x.com",
    "t.co",
    "linkedin.com",
    "lnkd.in",
    "pinterest.com",
    "reddit.com",
    "tiktok.com",
    "youtube.com",
    "youtu.be",
    "threads.net",
];

const EMAIL_MEDIUMS: &[&str] = &["email", "e-mail", "newsletter"];

impl TrafficSource {
    pub fn all() -> [TrafficSource; 5] {
        [
            TrafficSource::Direct,
            TrafficSource::OrganicSearch,
            TrafficSource::SocialMedia,
            TrafficSource::Email,
            TrafficSource::Referral,
        ]
    }

    pub fn classify(referrer: Option<&str>) -> Self {
        let referrer = match referrer.map(str::trim) {
            Some(r) if !r.is_empty() => r,
            _ => return TrafficSource::Direct,
        };

        let parsed = Url::parse(referrer).ok();
        let host = match parsed.as_ref().and_then(|u| u.host_str()) {
            Some(host) => host.to_ascii_lowercase(),
            None => referrer
                .split('/')
                .find(|part| !part.is_empty() && !part.ends_with(':'))
                .unwrap_or_default()
                .to_ascii_lowercase(),
        };
        let host = host.trim_start_matches("www.");

        let email_medium = parsed.as_ref().is_some_and(|u| {
            u.query_pairs().any(|(key, value)| {
                key == "utm_medium" && EMAIL_MEDIUMS.contains(&value.to_ascii_lowercase().as_str())
            })
        });
        let mail_host = host
            .split('.')
            .any(|label| label.contains("mail") || label == "outlook");
        if email_medium || mail_host {
            return TrafficSource::Email;
        }

        if host
            .split('.')
            .any(|label| SEARCH_ENGINE_LABELS.contains(&label))
        {
            return TrafficSource::OrganicSearch;
        }

        let social = SOCIAL_DOMAINS
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)));
        if social {
            return TrafficSource::SocialMedia;
        }

        TrafficSource::Referral
    }
}
