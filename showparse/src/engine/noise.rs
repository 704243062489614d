//! Noise line filtering applied before template matching.

use regex::Regex;

/// Decides which input lines never reach the state machine.
///
/// By default blank lines are dropped. Device banners, pagination
/// leftovers and similar chatter can be added as regexes.
#[derive(Debug, Clone)]
pub struct NoiseFilter {
    /// Drop lines that are empty or whitespace only.
    skip_blank_lines: bool,

    /// Lines matching any of these are dropped.
    banners: Vec<Regex>,
}

impl NoiseFilter {
    /// Create the default filter (blank lines only).
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter that lets every line through.
    pub fn none() -> Self {
        Self {
            skip_blank_lines: false,
            banners: Vec::new(),
        }
    }

    /// Enable or disable dropping blank lines.
    pub fn skip_blank_lines(mut self, skip: bool) -> Self {
        self.skip_blank_lines = skip;
        self
    }

    /// Drop lines matching a banner pattern.
    pub fn with_banner(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.banners.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Check whether a line is noise.
    pub fn is_noise(&self, line: &str) -> bool {
        if self.skip_blank_lines && line.trim().is_empty() {
            return true;
        }
        self.banners.iter().any(|banner| banner.is_match(line))
    }

    /// Get the banner patterns.
    pub fn banners(&self) -> &[Regex] {
        &self.banners
    }
}

impl Default for NoiseFilter {
    fn default() -> Self {
        Self {
            skip_blank_lines: true,
            banners: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_drops_blank_lines() {
        let filter = NoiseFilter::default();
        assert!(filter.is_noise(""));
        assert!(filter.is_noise("   \t"));
        assert!(!filter.is_noise("Vlan1 active"));
    }

    #[test]
    fn test_none_keeps_everything() {
        let filter = NoiseFilter::none();
        assert!(!filter.is_noise(""));
        assert!(!filter.is_noise("--More--"));
    }

    #[test]
    fn test_banner_patterns() {
        let filter = NoiseFilter::new()
            .with_banner(r"^\s*--More--")
            .unwrap()
            .with_banner(r"^Last login:")
            .unwrap();

        assert_eq!(filter.banners().len(), 2);
        assert!(filter.is_noise(" --More-- "));
        assert!(filter.is_noise("Last login: Mon Oct 19 10:00:00 2026"));
        assert!(!filter.is_noise("Gi0/1 up up"));
    }

    #[test]
    fn test_keep_blank_lines() {
        let filter = NoiseFilter::new().skip_blank_lines(false);
        assert!(!filter.is_noise(""));
    }
}
