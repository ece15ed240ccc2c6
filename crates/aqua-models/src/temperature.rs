//! Resolution of sparse temperature ranges into a gapless per-day lookup.

use crate::ModelError;
use aqua_core::{
    validate_temperature_profile, InterpolationMethod, TemperatureProfile, TemperatureRange,
    ValidationError,
};
use chrono::{Days, NaiveDate};
use serde::Serialize;
use tracing::debug;

/// How a resolved segment produces its daily value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SegmentValue {
    /// The same value on every day.
    Constant { value_c: f64 },
    /// Linear between `from_c` on `anchor` and `to_c` on `anchor + span_days`.
    Linear {
        anchor: NaiveDate,
        from_c: f64,
        to_c: f64,
        span_days: i64,
    },
}

/// A contiguous block of days, inclusive on both ends.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedSegment {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub value: SegmentValue,
}

impl ResolvedSegment {
    fn value_on(&self, date: NaiveDate) -> f64 {
        match self.value {
            SegmentValue::Constant { value_c } => value_c,
            SegmentValue::Linear {
                anchor,
                from_c,
                to_c,
                span_days,
            } => {
                let offset = (date - anchor).num_days() as f64;
                from_c + (to_c - from_c) * offset / span_days as f64
            }
        }
    }
}

/// Ordered, non-overlapping resolved segments with per-day lookup.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TemperatureSeries {
    segments: Vec<ResolvedSegment>,
}

impl TemperatureSeries {
    /// Resolve a profile after validating it.
    pub fn from_profile(profile: &TemperatureProfile) -> Result<Self, ModelError> {
        validate_temperature_profile(profile)?;
        let series = Self::resolve(
            &profile.ranges,
            profile.fill_gaps,
            profile.interpolation,
            profile.merge_adjacent,
        )?;
        debug!(
            ranges = profile.ranges.len(),
            segments = series.segments.len(),
            fill_gaps = profile.fill_gaps,
            "temperature series resolved"
        );
        Ok(series)
    }

    /// Build the per-day lookup from input ranges.
    ///
    /// Overlapping ranges with equal values are unified; with differing values
    /// they are rejected. Gaps are filled only with `fill_gaps`, otherwise gap
    /// days fail at lookup time.
    pub fn resolve(
        ranges: &[TemperatureRange],
        fill_gaps: bool,
        interpolation: InterpolationMethod,
        merge_adjacent: bool,
    ) -> Result<Self, ModelError> {
        let mut sorted: Vec<&TemperatureRange> = ranges.iter().collect();
        sorted.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));

        let mut merged: Vec<TemperatureRange> = Vec::with_capacity(sorted.len());
        for r in sorted {
            if r.end < r.start {
                return Err(ValidationError::InvertedRange {
                    start: r.start,
                    end: r.end,
                }
                .into());
            }
            if !r.value_c.is_finite() {
                return Err(ValidationError::NonFinite("temperature").into());
            }
            if let Some(last) = merged.last_mut() {
                if r.start <= last.end {
                    if r.value_c != last.value_c {
                        return Err(ModelError::ConflictingRange {
                            first_start: last.start,
                            first_end: last.end,
                            first_c: last.value_c,
                            second_start: r.start,
                            second_end: r.end,
                            second_c: r.value_c,
                        });
                    }
                    last.end = last.end.max(r.end);
                    continue;
                }
                if merge_adjacent && last.end.succ_opt() == Some(r.start) && last.value_c == r.value_c
                {
                    last.end = r.end;
                    continue;
                }
            }
            merged.push(r.clone());
        }

        let mut segments = Vec::with_capacity(merged.len() * 2);
        let mut prev: Option<(NaiveDate, f64)> = None;
        for r in merged {
            if let (true, Some((prev_end, prev_c))) = (fill_gaps, prev) {
                if let (Some(gap_start), Some(gap_end)) = (prev_end.succ_opt(), r.start.pred_opt()) {
                    if gap_start <= gap_end {
                        let value = match interpolation {
                            InterpolationMethod::None => SegmentValue::Constant { value_c: prev_c },
                            InterpolationMethod::Linear => SegmentValue::Linear {
                                anchor: prev_end,
                                from_c: prev_c,
                                to_c: r.value_c,
                                span_days: (r.start - prev_end).num_days(),
                            },
                        };
                        segments.push(ResolvedSegment {
                            start: gap_start,
                            end: gap_end,
                            value,
                        });
                    }
                }
            }
            prev = Some((r.end, r.value_c));
            segments.push(ResolvedSegment {
                start: r.start,
                end: r.end,
                value: SegmentValue::Constant { value_c: r.value_c },
            });
        }
        Ok(Self { segments })
    }

    /// Temperature on `date`.
    pub fn lookup(&self, date: NaiveDate) -> Result<f64, ModelError> {
        let idx = self.segments.partition_point(|s| s.start <= date);
        match idx.checked_sub(1).map(|i| &self.segments[i]) {
            Some(seg) if date <= seg.end => Ok(seg.value_on(date)),
            _ => Err(ModelError::MissingTemperatureData(date)),
        }
    }

    /// First resolved date.
    pub fn min_date(&self) -> Option<NaiveDate> {
        self.segments.first().map(|s| s.start)
    }

    /// Last resolved date.
    pub fn max_date(&self) -> Option<NaiveDate> {
        self.segments.last().map(|s| s.end)
    }

    /// Whether `[start, start + days)` lies within `[min_date, max_date]`.
    /// Interior gaps are not considered.
    pub fn spans(&self, start: NaiveDate, days: u32) -> bool {
        let last = match days.checked_sub(1) {
            Some(n) => start.checked_add_days(Days::new(u64::from(n))),
            None => return true,
        };
        match (self.min_date(), self.max_date(), last) {
            (Some(min), Some(max), Some(last)) => min <= start && last <= max,
            _ => false,
        }
    }

    /// First date in `[start, start + days)` without a value, if any.
    pub fn first_gap(&self, start: NaiveDate, days: u32) -> Option<NaiveDate> {
        start
            .iter_days()
            .take(days as usize)
            .find(|d| self.lookup(*d).is_err())
    }

    /// Chart-ready daily values; `None` marks days without data.
    pub fn daily_values(&self, start: NaiveDate, days: u32) -> Vec<(NaiveDate, Option<f64>)> {
        start
            .iter_days()
            .take(days as usize)
            .map(|d| (d, self.lookup(d).ok()))
            .collect()
    }

    pub fn segments(&self) -> &[ResolvedSegment] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn range(start: NaiveDate, end: NaiveDate, value_c: f64) -> TemperatureRange {
        TemperatureRange {
            start,
            end,
            value_c,
        }
    }

    #[test]
    fn lookup_within_and_outside_ranges() {
        let s = TemperatureSeries::resolve(
            &[range(d(1, 1), d(1, 10), 8.0), range(d(1, 11), d(1, 20), 9.5)],
            false,
            InterpolationMethod::None,
            true,
        )
        .unwrap();
        assert_eq!(s.lookup(d(1, 1)).unwrap(), 8.0);
        assert_eq!(s.lookup(d(1, 10)).unwrap(), 8.0);
        assert_eq!(s.lookup(d(1, 11)).unwrap(), 9.5);
        assert_eq!(
            s.lookup(d(1, 21)),
            Err(ModelError::MissingTemperatureData(d(1, 21)))
        );
        assert_eq!(s.min_date(), Some(d(1, 1)));
        assert_eq!(s.max_date(), Some(d(1, 20)));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let nan = [range(d(1, 1), d(1, 10), f64::NAN), range(d(1, 5), d(1, 15), f64::NAN)];
        for merge in [true, false] {
            assert_eq!(
                TemperatureSeries::resolve(&nan, false, InterpolationMethod::None, merge),
                Err(ModelError::Invalid(ValidationError::NonFinite("temperature")))
            );
        }
        let inf = [range(d(1, 1), d(1, 10), f64::INFINITY)];
        assert!(matches!(
            TemperatureSeries::resolve(&inf, true, InterpolationMethod::Linear, true),
            Err(ModelError::Invalid(ValidationError::NonFinite(_)))
        ));
    }

    #[test]
    fn conflicting_overlap_is_rejected() {
        let err = TemperatureSeries::resolve(
            &[range(d(1, 1), d(1, 10), 8.0), range(d(1, 5), d(1, 15), 9.0)],
            false,
            InterpolationMethod::None,
            true,
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::ConflictingRange { first_c, second_c, .. } if first_c == 8.0 && second_c == 9.0));
    }

    #[test]
    fn equal_overlap_is_idempotent() {
        let single = TemperatureSeries::resolve(
            &[range(d(1, 1), d(1, 15), 8.0)],
            false,
            InterpolationMethod::None,
            false,
        )
        .unwrap();
        let overlapping = TemperatureSeries::resolve(
            &[
                range(d(1, 5), d(1, 15), 8.0),
                range(d(1, 1), d(1, 10), 8.0),
                range(d(1, 1), d(1, 15), 8.0),
            ],
            false,
            InterpolationMethod::None,
            false,
        )
        .unwrap();
        assert_eq!(single, overlapping);
    }

    #[test]
    fn adjacent_equal_ranges_merge() {
        let ranges = [range(d(1, 1), d(1, 10), 8.0), range(d(1, 11), d(1, 20), 8.0)];
        let merged =
            TemperatureSeries::resolve(&ranges, false, InterpolationMethod::None, true).unwrap();
        let unmerged =
            TemperatureSeries::resolve(&ranges, false, InterpolationMethod::None, false).unwrap();
        assert_eq!(merged.segments().len(), 1);
        assert_eq!(unmerged.segments().len(), 2);
        assert_eq!(
            merged.daily_values(d(1, 1), 20),
            unmerged.daily_values(d(1, 1), 20)
        );
    }

    #[test]
    fn unfilled_gap_fails_only_at_lookup() {
        let s = TemperatureSeries::resolve(
            &[range(d(1, 1), d(1, 10), 8.0), range(d(1, 16), d(1, 20), 10.0)],
            false,
            InterpolationMethod::Linear,
            true,
        )
        .unwrap();
        assert!(s.spans(d(1, 1), 20));
        assert_eq!(s.first_gap(d(1, 1), 20), Some(d(1, 11)));
        assert_eq!(s.first_gap(d(1, 1), 10), None);
        assert!(s.lookup(d(1, 13)).is_err());
    }

    #[test]
    fn flat_carry_fills_with_previous_value() {
        let s = TemperatureSeries::resolve(
            &[range(d(1, 1), d(1, 10), 8.0), range(d(1, 16), d(1, 20), 10.0)],
            true,
            InterpolationMethod::None,
            true,
        )
        .unwrap();
        for day in 11..=15 {
            assert_eq!(s.lookup(d(1, day)).unwrap(), 8.0);
        }
        assert_eq!(s.first_gap(d(1, 1), 20), None);
    }

    #[test]
    fn linear_fill_interpolates_between_neighbours() {
        let s = TemperatureSeries::resolve(
            &[range(d(1, 1), d(1, 10), 8.0), range(d(1, 14), d(1, 20), 12.0)],
            true,
            InterpolationMethod::Linear,
            true,
        )
        .unwrap();
        assert_eq!(s.lookup(d(1, 10)).unwrap(), 8.0);
        assert!((s.lookup(d(1, 11)).unwrap() - 9.0).abs() < 1e-12);
        assert!((s.lookup(d(1, 12)).unwrap() - 10.0).abs() < 1e-12);
        assert!((s.lookup(d(1, 13)).unwrap() - 11.0).abs() < 1e-12);
        assert_eq!(s.lookup(d(1, 14)).unwrap(), 12.0);
    }

    #[test]
    fn spans_checks_outer_bounds() {
        let s = TemperatureSeries::resolve(
            &[range(d(3, 1), d(5, 29), 12.0)],
            false,
            InterpolationMethod::None,
            true,
        )
        .unwrap();
        assert!(s.spans(d(3, 1), 90));
        assert!(!s.spans(d(3, 1), 91));
        assert!(!s.spans(d(2, 28), 10));
    }

    #[test]
    fn profile_validation_runs_first() {
        let profile = TemperatureProfile {
            ranges: vec![],
            fill_gaps: false,
            interpolation: InterpolationMethod::None,
            merge_adjacent: true,
        };
        assert_eq!(
            TemperatureSeries::from_profile(&profile),
            Err(ModelError::Invalid(ValidationError::EmptyTemperatureProfile))
        );
    }

    fn build_ranges(parts: &[(u32, u32, bool)]) -> Vec<TemperatureRange> {
        let mut start = d(1, 1);
        let mut out = Vec::with_capacity(parts.len());
        for &(len, gap, warm) in parts {
            let end = start.checked_add_days(Days::new(u64::from(len))).unwrap();
            out.push(range(start, end, if warm { 12.0 } else { 8.0 }));
            start = end.checked_add_days(Days::new(u64::from(gap) + 1)).unwrap();
        }
        out
    }

    proptest! {
        #[test]
        fn merging_preserves_lookups(
            parts in prop::collection::vec((0u32..10, 0u32..3, any::<bool>()), 1..12),
            fill in any::<bool>(),
        ) {
            let ranges = build_ranges(&parts);
            let merged = TemperatureSeries::resolve(&ranges, fill, InterpolationMethod::None, true).unwrap();
            let unmerged = TemperatureSeries::resolve(&ranges, fill, InterpolationMethod::None, false).unwrap();
            prop_assert_eq!(merged.daily_values(d(1, 1), 200), unmerged.daily_values(d(1, 1), 200));
        }

        #[test]
        fn resolution_is_idempotent(
            parts in prop::collection::vec((0u32..10, 0u32..3, any::<bool>()), 1..12),
            linear in any::<bool>(),
        ) {
            let ranges = build_ranges(&parts);
            let method = if linear { InterpolationMethod::Linear } else { InterpolationMethod::None };
            let a = TemperatureSeries::resolve(&ranges, true, method, true).unwrap();
            let mut reversed = ranges.clone();
            reversed.reverse();
            let b = TemperatureSeries::resolve(&reversed, true, method, true).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
