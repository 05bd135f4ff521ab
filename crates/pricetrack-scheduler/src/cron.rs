//! Lightweight cron expression parser for the maintenance cadences.
//! Format: "MIN HOUR DOM MON DOW" (5-field). Minute, hour, and
//! day-of-week are honored (the weekly summary needs DOW); day-of-month
//! and month accept only "*". Field values: *, */N, N, N,M,...
//! DOW uses 0 or 7 = Sunday.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};

/// Next time the expression matches, strictly after `after`.
pub fn next_run_from_cron(expression: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != 5 {
        tracing::warn!(
            "Invalid cron expression: '{}' (need 5 fields: MIN HOUR DOM MON DOW)",
            expression
        );
        return None;
    }

    let minutes = parse_field(parts[0], 0, 59)?;
    let hours = parse_field(parts[1], 0, 23)?;
    if parts[2] != "*" || parts[3] != "*" {
        tracing::warn!("Cron DOM/MON fields only support '*': '{}'", expression);
        return None;
    }
    // 0-7 so both conventions for Sunday parse; normalized below.
    let weekdays: Vec<u32> = parse_field(parts[4], 0, 7)?
        .into_iter()
        .map(|d| d % 7)
        .collect();

    let mut candidate = (after + Duration::minutes(1))
        .with_second(0)
        .and_then(|c| c.with_nanosecond(0))
        .unwrap_or(after);

    // A DOW constraint can push the match out a full week.
    for _ in 0..(8 * 24 * 60) {
        let dow = candidate.weekday().num_days_from_sunday();
        if minutes.contains(&candidate.minute())
            && hours.contains(&candidate.hour())
            && weekdays.contains(&dow)
        {
            return Some(candidate);
        }
        candidate += Duration::minutes(1);
    }

    None
}

fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    if field.contains(',') {
        let vals: Result<Vec<u32>, _> = field.split(',').map(|s| s.trim().parse()).collect();
        return vals
            .ok()
            .map(|v| v.into_iter().filter(|x| *x >= min && *x <= max).collect());
    }

    let n: u32 = field.parse().ok()?;
    (n >= min && n <= max).then(|| vec![n])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_daily_summary_time() {
        // 2026-08-30 is a Sunday.
        let after = Utc.with_ymd_and_hms(2026, 8, 30, 7, 15, 0).unwrap();
        let next = next_run_from_cron("0 9 * * *", after).unwrap();
        assert_eq!((next.hour(), next.minute()), (9, 0));
        assert_eq!(next.day(), 30);
    }

    #[test]
    fn test_weekly_summary_waits_for_monday() {
        let after = Utc.with_ymd_and_hms(2026, 8, 30, 10, 0, 0).unwrap(); // Sunday
        let next = next_run_from_cron("0 9 * * 1", after).unwrap();
        assert_eq!(next.weekday(), chrono::Weekday::Mon);
        assert_eq!((next.day(), next.hour(), next.minute()), (31, 9, 0));
    }

    #[test]
    fn test_sunday_as_zero_and_seven() {
        let after = Utc.with_ymd_and_hms(2026, 8, 28, 0, 0, 0).unwrap(); // Friday
        let zero = next_run_from_cron("0 2 * * 0", after).unwrap();
        let seven = next_run_from_cron("0 2 * * 7", after).unwrap();
        assert_eq!(zero, seven);
        assert_eq!(zero.weekday(), chrono::Weekday::Sun);
    }

    #[test]
    fn test_every_15_minutes() {
        let after = Utc.with_ymd_and_hms(2026, 8, 30, 10, 2, 0).unwrap();
        let next = next_run_from_cron("*/15 * * * *", after).unwrap();
        assert_eq!(next.minute(), 15);
    }

    #[test]
    fn test_match_is_strictly_after() {
        let after = Utc.with_ymd_and_hms(2026, 8, 30, 9, 0, 0).unwrap();
        let next = next_run_from_cron("0 9 * * *", after).unwrap();
        assert_eq!(next.day(), 31);
    }

    #[test]
    fn test_invalid_expressions_rejected() {
        let after = Utc::now();
        assert!(next_run_from_cron("bad", after).is_none());
        assert!(next_run_from_cron("0 9 1 * *", after).is_none());
        assert!(next_run_from_cron("*/0 * * * *", after).is_none());
    }
}
