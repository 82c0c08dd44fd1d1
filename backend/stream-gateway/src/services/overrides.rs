/// Scheduled content overrides and the missing-media fallback
///
/// Rules are loaded once at startup and never change. Calendar rules are
/// checked in configuration order and the first match wins; the
/// `MediaMissing` rule is only consulted when the origin lookup fails.
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Utc};
use tracing::{info, warn};

use crate::config::{CalendarConfig, SpecialMediaConfig};
use crate::services::calendar::CalendarTrigger;

/// Configuration key of the fallback rule
pub const MEDIA_MISSING_KEY: &str = "MediaMissing";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideKey {
    Calendar(CalendarTrigger),
    MediaMissing,
}

impl OverrideKey {
    pub fn parse(key: &str) -> Option<Self> {
        if key == MEDIA_MISSING_KEY {
            return Some(Self::MediaMissing);
        }
        CalendarTrigger::from_key(key).map(Self::Calendar)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calendar(trigger) => trigger.key(),
            Self::MediaMissing => MEDIA_MISSING_KEY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideRule {
    pub key: OverrideKey,
    pub name: String,
    pub item_id: String,
    pub media_source_id: String,
    pub media_path: String,
}

impl OverrideRule {
    /// Usable only when every identifying field is filled in
    pub fn is_valid(&self) -> bool {
        !self.item_id.is_empty() && !self.media_source_id.is_empty() && !self.media_path.is_empty()
    }
}

/// Time zone the calendar windows are read in
#[derive(Debug, Clone, Copy)]
enum WallClock {
    Local,
    Fixed(FixedOffset),
}

#[derive(Debug, Clone)]
pub struct OverrideResolver {
    rules: Vec<OverrideRule>,
    wall_clock: WallClock,
}

impl OverrideResolver {
    /// `offset` pins calendar evaluation to a UTC offset; `None` uses host local time.
    pub fn new(rules: Vec<OverrideRule>, offset: Option<FixedOffset>) -> Self {
        Self {
            rules,
            wall_clock: offset.map_or(WallClock::Local, WallClock::Fixed),
        }
    }

    pub fn from_config(medias: &[SpecialMediaConfig], calendar: &CalendarConfig) -> Self {
        let rules: Vec<OverrideRule> = medias
            .iter()
            .filter_map(|media| {
                let Some(key) = OverrideKey::parse(&media.key) else {
                    warn!(key = %media.key, name = %media.name, "Unknown special media key, rule ignored");
                    return None;
                };
                let rule = OverrideRule {
                    key,
                    name: media.name.clone(),
                    item_id: media.item_id.clone(),
                    media_source_id: media.media_source_id.clone(),
                    media_path: media.media_path.clone(),
                };
                if !rule.is_valid() {
                    warn!(key = %media.key, "Special media rule is incomplete and will not be applied");
                }
                Some(rule)
            })
            .collect();

        let offset = calendar.utc_offset_minutes.and_then(|minutes| {
            let offset = FixedOffset::east_opt(minutes.saturating_mul(60));
            if offset.is_none() {
                warn!(minutes, "calendar.utc_offset_minutes out of range, using local time");
            }
            offset
        });

        info!(
            rules = rules.len(),
            fallback = rules.iter().any(|r| r.key == OverrideKey::MediaMissing),
            "Override rules loaded"
        );

        Self::new(rules, offset)
    }

    pub fn rules(&self) -> &[OverrideRule] {
        &self.rules
    }

    /// First valid calendar rule active at `now`
    pub fn resolve_override(&self, now: DateTime<Utc>) -> Option<&OverrideRule> {
        let local = self.wall_time(now);
        self.rules.iter().find(|rule| match rule.key {
            OverrideKey::Calendar(trigger) => rule.is_valid() && trigger.matches(&local),
            OverrideKey::MediaMissing => false,
        })
    }

    /// The `MediaMissing` rule, whatever the time
    pub fn resolve_missing_media_fallback(&self) -> Option<&OverrideRule> {
        self.rules
            .iter()
            .find(|rule| rule.key == OverrideKey::MediaMissing)
    }

    fn wall_time(&self, now: DateTime<Utc>) -> NaiveDateTime {
        match self.wall_clock {
            WallClock::Local => now.with_timezone(&Local).naive_local(),
            WallClock::Fixed(offset) => now.with_timezone(&offset).naive_local(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn media(key: &str, id: &str) -> SpecialMediaConfig {
        SpecialMediaConfig {
            key: key.to_string(),
            name: format!("{} rule", key),
            item_id: id.to_string(),
            media_source_id: format!("mediasource_{}", id),
            media_path: format!("special/{}.mp4", id),
        }
    }

    fn utc8() -> CalendarConfig {
        CalendarConfig {
            utc_offset_minutes: Some(8 * 60),
        }
    }

    #[test]
    fn test_no_match_outside_windows() {
        let resolver = OverrideResolver::from_config(&[media("October1", "1")], &utc8());
        // 2024-10-01 12:00 +08:00
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 4, 0, 0).unwrap();
        assert!(resolver.resolve_override(now).is_none());
    }

    #[test]
    fn test_offset_applied_before_matching() {
        let resolver = OverrideResolver::from_config(&[media("October1", "1")], &utc8());
        // 01:30 UTC is 09:30 at +08:00
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 1, 30, 0).unwrap();
        let rule = resolver.resolve_override(now).expect("override active");
        assert_eq!(rule.item_id, "1");
        assert_eq!(rule.key, OverrideKey::Calendar(CalendarTrigger::October1));
    }

    #[test]
    fn test_earlier_rule_wins() {
        let resolver = OverrideResolver::from_config(
            &[media("October1", "first"), media("October1", "second")],
            &utc8(),
        );
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 1, 30, 0).unwrap();
        for _ in 0..3 {
            assert_eq!(resolver.resolve_override(now).unwrap().item_id, "first");
        }
    }

    #[test]
    fn test_invalid_rule_skipped() {
        let mut incomplete = media("October1", "broken");
        incomplete.media_path.clear();
        let resolver =
            OverrideResolver::from_config(&[incomplete, media("October1", "ok")], &utc8());
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 1, 30, 0).unwrap();
        assert_eq!(resolver.resolve_override(now).unwrap().item_id, "ok");
    }

    #[test]
    fn test_unknown_keys_dropped() {
        let resolver =
            OverrideResolver::from_config(&[media("Halloween", "x"), media("October1", "1")], &utc8());
        assert_eq!(resolver.rules().len(), 1);
    }

    #[test]
    fn test_fallback_ignores_time_and_never_overrides() {
        let resolver = OverrideResolver::from_config(
            &[media("MediaMissing", "missing"), media("December13", "dec")],
            &utc8(),
        );
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        assert!(resolver.resolve_override(now).is_none());
        assert_eq!(
            resolver.resolve_missing_media_fallback().unwrap().item_id,
            "missing"
        );
    }

    #[test]
    fn test_no_fallback_configured() {
        let resolver = OverrideResolver::from_config(&[media("October1", "1")], &utc8());
        assert!(resolver.resolve_missing_media_fallback().is_none());
    }

    #[test]
    fn test_override_key_parse() {
        assert_eq!(OverrideKey::parse("MediaMissing"), Some(OverrideKey::MediaMissing));
        assert_eq!(
            OverrideKey::parse("ChineseNewYearEve"),
            Some(OverrideKey::Calendar(CalendarTrigger::ChineseNewYearEve))
        );
        assert_eq!(OverrideKey::parse(""), None);
        assert_eq!(OverrideKey::MediaMissing.as_str(), "MediaMissing");
    }
}
