use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbuseType {
    Phishing,
    Malware,
    #[serde(rename = "BOTNET_C2")]
    BotnetC2,
    Csam,
    Spam,
    Other,
}

impl AbuseType {
    pub const ALL: [AbuseType; 6] = [
        AbuseType::Phishing,
        AbuseType::Malware,
        AbuseType::BotnetC2,
        AbuseType::Csam,
        AbuseType::Spam,
        AbuseType::Other,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            AbuseType::Phishing => "PHISHING",
            AbuseType::Malware => "MALWARE",
            AbuseType::BotnetC2 => "BOTNET_C2",
            AbuseType::Csam => "CSAM",
            AbuseType::Spam => "SPAM",
            AbuseType::Other => "OTHER",
        }
    }

    /// Next variant in declaration order, wrapping around.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for AbuseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AbuseType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let upper = s.to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == upper)
            .ok_or_else(|| {
                format!(
                    "invalid abuse type: {s} (expected PHISHING|MALWARE|BOTNET_C2|CSAM|SPAM|OTHER)"
                )
            })
    }
}
