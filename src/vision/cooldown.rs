//! Parsing of on-screen countdown text such as `01:02:03` or `1d2h3m4s`.

use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Clone, Copy)]
enum Unit {
    Days,
    Hours,
    Minutes,
    Seconds,
}

impl Unit {
    fn secs(self) -> u64 {
        match self {
            Self::Days => 86_400,
            Self::Hours => 3_600,
            Self::Minutes => 60,
            Self::Seconds => 1,
        }
    }
}

struct CooldownPattern {
    regex: Regex,
    units: &'static [Unit],
}

// Most specific first; the first pattern found anywhere in the text wins.
const PATTERNS: &[(&str, &[Unit])] = {
    use Unit::{Days as D, Hours as H, Minutes as M, Seconds as S};
    &[
        (r"(\d+):(\d+):(\d+)", &[H, M, S]),
        (r"(\d+)d(\d+)h(\d+)m(\d+)s", &[D, H, M, S]),
        (r"(\d+)d(\d+)h(\d+)m", &[D, H, M]),
        (r"(\d+)d(\d+)h", &[D, H]),
        (r"(\d+)d", &[D]),
        (r"(\d+)h(\d+)m(\d+)s", &[H, M, S]),
        (r"(\d+)h(\d+)m", &[H, M]),
        (r"(\d+)h", &[H]),
        (r"(\d+)m(\d+)s", &[M, S]),
        (r"(\d+)m", &[M]),
        (r"(\d+)s", &[S]),
    ]
};

static COOLDOWN_PATTERNS: OnceLock<Vec<CooldownPattern>> = OnceLock::new();

fn cooldown_patterns() -> &'static [CooldownPattern] {
    COOLDOWN_PATTERNS.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|&(src, units)| {
                Regex::new(src)
                    .ok()
                    .map(|regex| CooldownPattern { regex, units })
            })
            .collect()
    })
}

/// Parse a countdown into a duration.
///
/// Accepts `H:M:S` and any leading run of `XdYhZmWs` components. Empty or
/// unrecognised text is [`Duration::ZERO`]; huge values saturate.
pub fn parse_cooldown(text: &str) -> Duration {
    let text = text.trim();
    if text.is_empty() {
        return Duration::ZERO;
    }

    for pattern in cooldown_patterns() {
        let Some(caps) = pattern.regex.captures(text) else {
            continue;
        };

        let total = pattern
            .units
            .iter()
            .enumerate()
            .fold(0u64, |acc, (i, unit)| {
                let value = caps
                    .get(i + 1)
                    .and_then(|m| m.as_str().parse::<u64>().ok())
                    .unwrap_or(u64::MAX);
                acc.saturating_add(value.saturating_mul(unit.secs()))
            });
        return Duration::from_secs(total);
    }

    Duration::ZERO
}
