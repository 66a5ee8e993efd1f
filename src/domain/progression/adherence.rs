//! Adherence and streak tracking over the practice log.
//!
//! Both functions are pure over a slice of log entries so they can be
//! recomputed freely; persistence of the result is the application layer's
//! concern (and goes through the conditional-write path). Callers pass the
//! effective required set, which already accounts for disabled practices.

use chrono::{Duration, NaiveDate};
use std::collections::{HashMap, HashSet};

use super::practice::{PracticeLogEntry, PracticeType};
use crate::domain::foundation::Percentage;

/// Default trailing window for adherence, in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 14;

/// Completion percentage over the trailing window, clamped at 100.
///
/// The denominator is |required| × `window_days`. Only completed entries for
/// practices in the required set count toward the numerator; logging optional
/// extras does not inflate adherence. Duplicate entries for the same
/// (practice, date) are counted once, matching the store's upsert semantics.
/// An empty required set reads as zero.
pub fn calculate_adherence(
    logs: &[PracticeLogEntry],
    required: &[PracticeType],
    window_days: u32,
    today: NaiveDate,
) -> Percentage {
    let total_required = required.len() as u32 * window_days;
    let window_start = today - Duration::days(i64::from(window_days) - 1);

    let completed: HashSet<(PracticeType, NaiveDate)> = logs
        .iter()
        .filter(|entry| {
            entry.completed
                && entry.date >= window_start
                && entry.date <= today
                && required.contains(&entry.practice)
        })
        .map(|entry| (entry.practice, entry.date))
        .collect();

    Percentage::from_ratio(completed.len() as u32, total_required)
}

/// Number of consecutive fully-complete days ending at (or just before) today.
///
/// A day counts only when every required practice is completed on it. Today
/// is allowed to be incomplete without breaking the chain (the day is still
/// in progress); any earlier incomplete day terminates the walk, and because
/// the walk steps one calendar day at a time a date gap terminates it too.
pub fn calculate_consecutive_days(
    logs: &[PracticeLogEntry],
    required: &[PracticeType],
    today: NaiveDate,
) -> u32 {
    if required.is_empty() {
        return 0;
    }

    let mut by_date: HashMap<NaiveDate, HashSet<PracticeType>> = HashMap::new();
    for entry in logs.iter().filter(|e| e.completed) {
        by_date.entry(entry.date).or_default().insert(entry.practice);
    }

    let day_complete = |date: NaiveDate| {
        by_date
            .get(&date)
            .map(|done| required.iter().all(|p| done.contains(p)))
            .unwrap_or(false)
    };

    let mut count = 0;
    let mut date = today;

    // In-progress day: skip it without breaking the chain.
    if !day_complete(date) {
        date -= Duration::days(1);
    }

    while day_complete(date) {
        count += 1;
        date -= Duration::days(1);
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::domain::progression::practice::required_practices;
    use crate::domain::progression::stage::Stage;
    use proptest::prelude::*;

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    fn day(offset: i64) -> NaiveDate {
        today() - Duration::days(offset)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 23).unwrap()
    }

    fn entry(practice: PracticeType, date: NaiveDate) -> PracticeLogEntry {
        PracticeLogEntry::new(user(), practice, date, true)
    }

    fn required(stage_number: u8) -> &'static [PracticeType] {
        required_practices(Stage::try_new(stage_number).unwrap())
    }

    /// Completed entries for every practice in `required`, on `date`.
    fn full_day(required: &[PracticeType], date: NaiveDate) -> Vec<PracticeLogEntry> {
        required.iter().map(|p| entry(*p, date)).collect()
    }

    // ─── Adherence ────────────────────────────────────────────────────

    #[test]
    fn empty_log_is_zero_adherence() {
        let pct = calculate_adherence(&[], required(2), DEFAULT_WINDOW_DAYS, today());
        assert_eq!(pct, Percentage::ZERO);
    }

    #[test]
    fn twenty_one_of_twenty_eight_is_seventy_five() {
        // Stage 2 requires two practices; 14-day window -> 28 required.
        let mut logs = Vec::new();
        for offset in 0..14 {
            logs.push(entry(PracticeType::SitPractice, day(offset)));
        }
        for offset in 0..7 {
            logs.push(entry(PracticeType::Breathwork, day(offset)));
        }
        let pct = calculate_adherence(&logs, required(2), DEFAULT_WINDOW_DAYS, today());
        assert_eq!(pct.value(), 75);
    }

    #[test]
    fn full_window_is_clamped_at_one_hundred() {
        let mut logs = Vec::new();
        for offset in 0..14 {
            logs.extend(full_day(required(1), day(offset)));
        }
        let pct = calculate_adherence(&logs, required(1), DEFAULT_WINDOW_DAYS, today());
        assert_eq!(pct, Percentage::HUNDRED);
    }

    #[test]
    fn unrelated_practices_do_not_inflate_adherence() {
        // Stage 1 requires only sitting. A user logging breathwork every
        // day used to be able to pad the count; the required-set filter
        // stops that.
        let mut logs = Vec::new();
        for offset in 0..14 {
            logs.push(entry(PracticeType::Breathwork, day(offset)));
        }
        let pct = calculate_adherence(&logs, required(1), DEFAULT_WINDOW_DAYS, today());
        assert_eq!(pct, Percentage::ZERO);

        // Without the filter the same log would have read 100%.
        let unfiltered: u32 = logs.iter().filter(|e| e.completed).count() as u32;
        assert_eq!(Percentage::from_ratio(unfiltered, 14), Percentage::HUNDRED);
    }

    #[test]
    fn disabled_practice_shrinks_the_denominator() {
        use crate::domain::progression::practice::effective_required_practices;

        // Stage 2 with breathwork disabled: only sitting counts, and a full
        // run of sitting alone reads 100%.
        let effective = effective_required_practices(
            Stage::try_new(2).unwrap(),
            &[PracticeType::Breathwork],
        );
        let mut logs = Vec::new();
        for offset in 0..14 {
            logs.push(entry(PracticeType::SitPractice, day(offset)));
        }
        let pct = calculate_adherence(&logs, &effective, DEFAULT_WINDOW_DAYS, today());
        assert_eq!(pct, Percentage::HUNDRED);
    }

    #[test]
    fn entries_outside_window_are_ignored() {
        let logs = vec![entry(PracticeType::SitPractice, day(20))];
        let pct = calculate_adherence(&logs, required(1), DEFAULT_WINDOW_DAYS, today());
        assert_eq!(pct, Percentage::ZERO);
    }

    #[test]
    fn duplicate_entries_count_once() {
        let logs = vec![
            entry(PracticeType::SitPractice, day(0)),
            entry(PracticeType::SitPractice, day(0)),
        ];
        let once = calculate_adherence(&logs[..1], required(1), DEFAULT_WINDOW_DAYS, today());
        let twice = calculate_adherence(&logs, required(1), DEFAULT_WINDOW_DAYS, today());
        assert_eq!(once, twice);
    }

    #[test]
    fn incomplete_entries_do_not_count() {
        let logs = vec![PracticeLogEntry::new(
            user(),
            PracticeType::SitPractice,
            day(0),
            false,
        )];
        let pct = calculate_adherence(&logs, required(1), DEFAULT_WINDOW_DAYS, today());
        assert_eq!(pct, Percentage::ZERO);
    }

    #[test]
    fn empty_required_set_reads_zero() {
        let logs = full_day(required(1), day(0));
        assert_eq!(
            calculate_adherence(&logs, &[], DEFAULT_WINDOW_DAYS, today()),
            Percentage::ZERO
        );
        assert_eq!(calculate_consecutive_days(&logs, &[], today()), 0);
    }

    proptest! {
        #[test]
        fn adherence_is_monotonic_in_completed_days(days_logged in 0u32..=20) {
            // Adding one more completed day never lowers the figure, and the
            // result never exceeds 100.
            let build = |n: u32| -> Vec<PracticeLogEntry> {
                (0..n.min(14)).map(|offset| {
                    entry(PracticeType::SitPractice, day(i64::from(offset)))
                }).collect()
            };
            let fewer = calculate_adherence(
                &build(days_logged), required(1), DEFAULT_WINDOW_DAYS, today());
            let more = calculate_adherence(
                &build(days_logged + 1), required(1), DEFAULT_WINDOW_DAYS, today());
            prop_assert!(more >= fewer);
            prop_assert!(more.value() <= 100);
        }
    }

    // ─── Consecutive days ─────────────────────────────────────────────

    #[test]
    fn empty_log_has_zero_streak() {
        assert_eq!(calculate_consecutive_days(&[], required(1), today()), 0);
    }

    #[test]
    fn unbroken_run_including_today_counts_every_day() {
        let mut logs = Vec::new();
        for offset in 0..5 {
            logs.extend(full_day(required(2), day(offset)));
        }
        assert_eq!(calculate_consecutive_days(&logs, required(2), today()), 5);
    }

    #[test]
    fn incomplete_today_does_not_break_the_chain() {
        // Days 1..=4 complete, today untouched: still a 4-day streak.
        let mut logs = Vec::new();
        for offset in 1..=4 {
            logs.extend(full_day(required(2), day(offset)));
        }
        assert_eq!(calculate_consecutive_days(&logs, required(2), today()), 4);
    }

    #[test]
    fn partially_complete_today_also_falls_back_to_yesterday() {
        let mut logs = vec![entry(PracticeType::SitPractice, day(0))];
        for offset in 1..=3 {
            logs.extend(full_day(required(2), day(offset)));
        }
        // Today has sit but not breathwork; chain is evaluated from yesterday.
        assert_eq!(calculate_consecutive_days(&logs, required(2), today()), 3);
    }

    #[test]
    fn gap_before_yesterday_terminates_the_count() {
        // Complete today and yesterday, skip day 2, complete days 3..=5.
        let mut logs = Vec::new();
        for offset in [0i64, 1, 3, 4, 5] {
            logs.extend(full_day(required(2), day(offset)));
        }
        assert_eq!(calculate_consecutive_days(&logs, required(2), today()), 2);
    }

    #[test]
    fn day_missing_one_required_practice_terminates_the_count() {
        let mut logs = Vec::new();
        logs.extend(full_day(required(2), day(0)));
        logs.extend(full_day(required(2), day(1)));
        // Day 2 has only one of the two required practices.
        logs.push(entry(PracticeType::SitPractice, day(2)));
        logs.extend(full_day(required(2), day(3)));
        assert_eq!(calculate_consecutive_days(&logs, required(2), today()), 2);
    }

    #[test]
    fn incomplete_yesterday_with_empty_today_is_zero() {
        let logs = full_day(required(2), day(2));
        assert_eq!(calculate_consecutive_days(&logs, required(2), today()), 0);
    }

    #[test]
    fn streak_computation_is_idempotent() {
        let mut logs = Vec::new();
        for offset in 0..9 {
            logs.extend(full_day(required(3), day(offset)));
        }
        let first = calculate_consecutive_days(&logs, required(3), today());
        let second = calculate_consecutive_days(&logs, required(3), today());
        assert_eq!(first, second);
        assert_eq!(first, 9);
    }

    #[test]
    fn extra_practices_beyond_required_do_not_matter() {
        let mut logs = full_day(required(1), day(0));
        logs.push(entry(PracticeType::GratitudeNote, day(0)));
        assert_eq!(calculate_consecutive_days(&logs, required(1), today()), 1);
    }
}
