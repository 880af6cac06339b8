//! Video quality definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Video resolution requested from the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    /// Low definition.
    Ld,
    /// Standard definition (default).
    #[default]
    Sd,
    /// High definition.
    Hd,
}

impl VideoQuality {
    /// Short key used by the API and in output filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoQuality::Ld => "ld",
            VideoQuality::Sd => "sd",
            VideoQuality::Hd => "hd",
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ld" | "low" => Ok(VideoQuality::Ld),
            "sd" | "standard" => Ok(VideoQuality::Sd),
            "hd" | "high" => Ok(VideoQuality::Hd),
            _ => Err(format!("Unknown video quality: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quality() {
        assert_eq!("hd".parse::<VideoQuality>().unwrap(), VideoQuality::Hd);
        assert_eq!("Low".parse::<VideoQuality>().unwrap(), VideoQuality::Ld);
        assert!("4k".parse::<VideoQuality>().is_err());
    }
}
