//! Resolves parsed smart criteria against a point in time.
//!
//! ## Date comparisons
//!
//! Relative values (`N` units ago, `boundary = now - N·unit`):
//!
//! | op   | predicate                                   |
//! |------|---------------------------------------------|
//! | `=`  | `> now - N·unit` and `< now + N·unit`       |
//! | `<`  | `> boundary` (more recent than)             |
//! | `<=` | `>= boundary`                               |
//! | `>`  | `< boundary` (older than)                   |
//! | `>=` | `<= boundary`                               |
//!
//! Absolute values cover the calendar day `[D, D + 1 day)`:
//!
//! | op   | predicate                                   |
//! |------|---------------------------------------------|
//! | `=`  | `>= D` and `< D + 1 day`                    |
//! | `<`  | `< D`                                       |
//! | `<=` | `< D + 1 day`                               |
//! | `>`  | `>= D + 1 day`                              |
//! | `>=` | `>= D`                                      |
//!
//! Calendar arithmetic happens in the time zone of `now`. Month and year
//! steps clamp to the last day of the target month, so March 31 minus one
//! month is the last day of February.

use crate::ast::{Atom, CompOp, DateField, DateSpec, DurationUnit, Expr};
use crate::parser::{parse, SyntaxError};
use crate::predicate::{Bound, Predicate};
use chrono::{
    DateTime, Days, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};

/// Parses and compiles smart criteria in one step.
pub fn compile_str<Tz: TimeZone>(
    source: &str,
    now: &DateTime<Tz>,
) -> Result<Predicate, SyntaxError> {
    let expr = parse(source)?;
    Ok(compile(&expr, now))
}

/// Like [`compile_str`], but blank input means "no filter" and yields `None`.
pub fn compile_filter<Tz: TimeZone>(
    source: &str,
    now: &DateTime<Tz>,
) -> Result<Option<Predicate>, SyntaxError> {
    if source.trim().is_empty() {
        return Ok(None);
    }
    compile_str(source, now).map(Some)
}

/// Compiles an expression into a predicate with every date resolved.
#[tracing::instrument(level = "debug", skip(now), fields(criteria = %expr))]
pub fn compile<Tz: TimeZone>(expr: &Expr, now: &DateTime<Tz>) -> Predicate {
    let predicate = compile_expr(expr, now);
    tracing::debug!(?predicate, "compiled smart criteria");
    predicate
}

fn compile_expr<Tz: TimeZone>(expr: &Expr, now: &DateTime<Tz>) -> Predicate {
    match expr {
        Expr::Atom(atom) => compile_atom(atom, now),
        Expr::Not(inner) => Predicate::not(compile_expr(inner, now)),
        Expr::And(left, right) => Predicate::and(compile_expr(left, now), compile_expr(right, now)),
        Expr::Or(left, right) => Predicate::or(compile_expr(left, now), compile_expr(right, now)),
    }
}

fn compile_atom<Tz: TimeZone>(atom: &Atom, now: &DateTime<Tz>) -> Predicate {
    match atom {
        Atom::Clean => Predicate::Clean,
        Atom::Explicit => Predicate::Explicit,
        Atom::Unlabeled => Predicate::Unlabeled,
        Atom::NameMatches(text) => Predicate::Name(text.clone()),
        Atom::LabelMatches(text) => Predicate::Label(text.clone()),
        Atom::AlbumMatches(text) => Predicate::Album(text.clone()),
        Atom::ArtistMatches(text) => Predicate::Artist(text.clone()),
        Atom::DateCompare { field, op, value } => {
            let predicate = match *value {
                DateSpec::Relative { amount, unit } => relative(*field, *op, amount, unit, now),
                DateSpec::Absolute { date, .. } => absolute(*field, *op, date, now),
            };
            tracing::trace!(
                field = field.keyword(),
                op = op.symbol(),
                %value,
                ?predicate,
                "resolved date"
            );
            predicate
        }
    }
}

fn relative<Tz: TimeZone>(
    field: DateField,
    op: CompOp,
    amount: u32,
    unit: DurationUnit,
    now: &DateTime<Tz>,
) -> Predicate {
    let boundary = shift(now, amount, unit, Direction::Back);
    match op {
        CompOp::Eq => Predicate::and(
            Predicate::date(field, Bound::GreaterThan(boundary)),
            Predicate::date(field, Bound::LessThan(shift(now, amount, unit, Direction::Forward))),
        ),
        CompOp::Lt => Predicate::date(field, Bound::GreaterThan(boundary)),
        CompOp::Lte => Predicate::date(field, Bound::GreaterOrEqual(boundary)),
        CompOp::Gt => Predicate::date(field, Bound::LessThan(boundary)),
        CompOp::Gte => Predicate::date(field, Bound::LessOrEqual(boundary)),
    }
}

fn absolute<Tz: TimeZone>(
    field: DateField,
    op: CompOp,
    date: NaiveDate,
    now: &DateTime<Tz>,
) -> Predicate {
    let start = local_midnight(now, date);
    let end = date
        .succ_opt()
        .map_or(DateTime::<Utc>::MAX_UTC, |next| local_midnight(now, next));
    match op {
        CompOp::Eq => Predicate::and(
            Predicate::date(field, Bound::GreaterOrEqual(start)),
            Predicate::date(field, Bound::LessThan(end)),
        ),
        CompOp::Lt => Predicate::date(field, Bound::LessThan(start)),
        CompOp::Lte => Predicate::date(field, Bound::LessThan(end)),
        CompOp::Gt => Predicate::date(field, Bound::GreaterOrEqual(end)),
        CompOp::Gte => Predicate::date(field, Bound::GreaterOrEqual(start)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Back,
    Forward,
}

/// Moves `now` by `amount` calendar units on its local calendar. Saturates
/// at the representable range.
fn shift<Tz: TimeZone>(
    now: &DateTime<Tz>,
    amount: u32,
    unit: DurationUnit,
    direction: Direction,
) -> DateTime<Utc> {
    let local = now.naive_local();
    let shifted = match (unit, direction) {
        (DurationUnit::Day, Direction::Back) => local.checked_sub_days(Days::new(amount.into())),
        (DurationUnit::Day, Direction::Forward) => local.checked_add_days(Days::new(amount.into())),
        (DurationUnit::Month, Direction::Back) => local.checked_sub_months(Months::new(amount)),
        (DurationUnit::Month, Direction::Forward) => local.checked_add_months(Months::new(amount)),
        (DurationUnit::Year, direction) => {
            amount.checked_mul(12).and_then(|months| match direction {
                Direction::Back => local.checked_sub_months(Months::new(months)),
                Direction::Forward => local.checked_add_months(Months::new(months)),
            })
        }
    };
    match (shifted, direction) {
        (Some(local), _) => resolve_local(now, &local),
        (None, Direction::Back) => DateTime::<Utc>::MIN_UTC,
        (None, Direction::Forward) => DateTime::<Utc>::MAX_UTC,
    }
}

/// Start of `date` in the time zone of `now`.
fn local_midnight<Tz: TimeZone>(now: &DateTime<Tz>, date: NaiveDate) -> DateTime<Utc> {
    resolve_local(now, &date.and_time(NaiveTime::MIN))
}

/// Maps a wall-clock time in the zone of `now` to an instant.
///
/// A time repeated by a transition resolves to its earlier instant. A time
/// skipped by a transition is read with `now`'s offset.
fn resolve_local<Tz: TimeZone>(now: &DateTime<Tz>, local: &NaiveDateTime) -> DateTime<Utc> {
    if let Some(t) = now.timezone().from_local_datetime(local).earliest() {
        return t.with_timezone(&Utc);
    }
    now.offset()
        .fix()
        .from_local_datetime(local)
        .earliest()
        .map_or_else(|| Utc.from_utc_datetime(local), |t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn at_hm(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        at(2022, 4, 1)
    }

    fn compiled(source: &str) -> Predicate {
        compile_str(source, &now()).unwrap()
    }

    fn added(bound: Bound) -> Predicate {
        Predicate::date(DateField::Added, bound)
    }

    fn released(bound: Bound) -> Predicate {
        Predicate::date(DateField::Released, bound)
    }

    fn window(field: fn(Bound) -> Predicate, lower: Bound, upper: Bound) -> Predicate {
        Predicate::and(field(lower), field(upper))
    }

    /// UTC-3 with a summer offset of UTC-2.
    ///
    /// Clocks jump from 2018-11-04 00:00 to 01:00, so that local hour does
    /// not exist. They fall back from 2019-02-17 01:00 to 00:00, so that
    /// local hour happens twice.
    #[derive(Debug, Clone, Copy)]
    struct SummerTime;

    impl SummerTime {
        fn standard() -> FixedOffset {
            FixedOffset::west_opt(3 * 3600).unwrap()
        }

        fn summer() -> FixedOffset {
            FixedOffset::west_opt(2 * 3600).unwrap()
        }
    }

    impl TimeZone for SummerTime {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SummerTime
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let valid: Vec<FixedOffset> = [Self::summer(), Self::standard()]
                .into_iter()
                .filter(|offset| {
                    let seconds = i64::from(offset.local_minus_utc());
                    let utc = *local - chrono::Duration::seconds(seconds);
                    self.offset_from_utc_datetime(&utc) == *offset
                })
                .collect();
            match valid.as_slice() {
                [offset] => LocalResult::Single(*offset),
                [earlier, later] => LocalResult::Ambiguous(*earlier, *later),
                _ => LocalResult::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            let summer_start = at_hm(2018, 11, 4, 3, 0).naive_utc();
            let summer_end = at_hm(2019, 2, 17, 3, 0).naive_utc();
            if (summer_start..summer_end).contains(utc) {
                Self::summer()
            } else {
                Self::standard()
            }
        }
    }

    fn summer_time(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<SummerTime> {
        SummerTime.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_non_date_atoms_pass_through() {
        assert_eq!(compiled("clean"), Predicate::Clean);
        assert_eq!(compiled("explicit"), Predicate::Explicit);
        assert_eq!(compiled("unlabeled"), Predicate::Unlabeled);
        assert_eq!(
            compiled(r#"!name:"A" || album:"B" && artist:"C""#),
            Predicate::or(
                Predicate::not(Predicate::Name("A".to_string())),
                Predicate::and(
                    Predicate::Album("B".to_string()),
                    Predicate::Artist("C".to_string())
                ),
            )
        );
    }

    #[test]
    fn test_relative_equality_is_symmetric_window() {
        assert_eq!(
            compiled("added=1d"),
            window(
                added,
                Bound::GreaterThan(at(2022, 3, 31)),
                Bound::LessThan(at(2022, 4, 2))
            )
        );
        assert_eq!(
            compiled("added=5y"),
            window(
                added,
                Bound::GreaterThan(at(2017, 4, 1)),
                Bound::LessThan(at(2027, 4, 1))
            )
        );
        assert_eq!(
            compiled("released=3m"),
            window(
                released,
                Bound::GreaterThan(at(2022, 1, 1)),
                Bound::LessThan(at(2022, 7, 1))
            )
        );
    }

    #[test]
    fn test_relative_directionality() {
        let boundary = at(2022, 3, 31);
        assert_eq!(compiled("added<1d"), added(Bound::GreaterThan(boundary)));
        assert_eq!(compiled("added<=1d"), added(Bound::GreaterOrEqual(boundary)));
        assert_eq!(compiled("added>1d"), added(Bound::LessThan(boundary)));
        assert_eq!(compiled("added>=1d"), added(Bound::LessOrEqual(boundary)));
    }

    #[test]
    fn test_relative_calendar_units() {
        assert_eq!(
            compiled("added<3m"),
            added(Bound::GreaterThan(at(2022, 1, 1)))
        );
        assert_eq!(
            compiled("released>5y"),
            released(Bound::LessThan(at(2017, 4, 1)))
        );
    }

    #[test]
    fn test_month_arithmetic_clamps_to_end_of_month() {
        let march_31 = at(2022, 3, 31);
        assert_eq!(
            compile_str("added<1m", &march_31).unwrap(),
            added(Bound::GreaterThan(at(2022, 2, 28)))
        );
        let leap = at(2024, 3, 31);
        assert_eq!(
            compile_str("added<1m", &leap).unwrap(),
            added(Bound::GreaterThan(at(2024, 2, 29)))
        );
        assert_eq!(
            compile_str("added<1y", &at(2024, 2, 29)).unwrap(),
            added(Bound::GreaterThan(at(2023, 2, 28)))
        );
    }

    #[test]
    fn test_relative_keeps_time_of_day() {
        let now = at_hm(2022, 4, 1, 13, 45);
        assert_eq!(
            compile_str("added<1d", &now).unwrap(),
            added(Bound::GreaterThan(at_hm(2022, 3, 31, 13, 45)))
        );
    }

    #[test]
    fn test_relative_overflow_saturates() {
        assert_eq!(
            compiled("added>4000000000y"),
            added(Bound::LessThan(DateTime::<Utc>::MIN_UTC))
        );
        assert_eq!(
            compiled("added=4000000000d"),
            window(
                added,
                Bound::GreaterThan(DateTime::<Utc>::MIN_UTC),
                Bound::LessThan(DateTime::<Utc>::MAX_UTC)
            )
        );
    }

    #[test]
    fn test_relative_boundary_in_skipped_hour_uses_now_offset() {
        // 00:30 on Nov 4 does not exist; it is read at now's UTC-2.
        let now = summer_time(2018, 11, 5, 0, 30);
        assert_eq!(
            compile_str("added<1d", &now).unwrap(),
            added(Bound::GreaterThan(at_hm(2018, 11, 4, 2, 30)))
        );
        assert_eq!(
            compile_str("added=1d", &now).unwrap(),
            window(
                added,
                Bound::GreaterThan(at_hm(2018, 11, 4, 2, 30)),
                Bound::LessThan(at_hm(2018, 11, 6, 2, 30))
            )
        );
    }

    #[test]
    fn test_relative_boundary_in_repeated_hour_takes_earlier_instant() {
        let now = summer_time(2019, 3, 17, 0, 30);
        assert_eq!(
            compile_str("added>1m", &now).unwrap(),
            added(Bound::LessThan(at_hm(2019, 2, 17, 2, 30)))
        );
    }

    #[test]
    fn test_relative_shift_across_transition_keeps_wall_clock() {
        // Summer (UTC-2) back to standard time (UTC-3).
        let now = summer_time(2018, 12, 1, 12, 0);
        assert_eq!(
            compile_str("added<1m", &now).unwrap(),
            added(Bound::GreaterThan(at_hm(2018, 11, 1, 15, 0)))
        );
    }

    #[test]
    fn test_absolute_day_window() {
        assert_eq!(
            compiled("added=4-1-2022"),
            window(
                added,
                Bound::GreaterOrEqual(at(2022, 4, 1)),
                Bound::LessThan(at(2022, 4, 2))
            )
        );
        assert_eq!(compiled("added<4-1-2022"), added(Bound::LessThan(at(2022, 4, 1))));
        assert_eq!(compiled("added<=4-1-2022"), added(Bound::LessThan(at(2022, 4, 2))));
        assert_eq!(
            compiled("added>4-1-2022"),
            added(Bound::GreaterOrEqual(at(2022, 4, 2)))
        );
        assert_eq!(
            compiled("added>=4-1-2022"),
            added(Bound::GreaterOrEqual(at(2022, 4, 1)))
        );
    }

    #[test]
    fn test_absolute_month_end_rolls_over() {
        assert_eq!(
            compiled("released<=12-31-2020"),
            released(Bound::LessThan(at(2021, 1, 1)))
        );
    }

    #[test]
    fn test_bare_year_is_january_first() {
        assert_eq!(
            compiled("added=2020"),
            window(
                added,
                Bound::GreaterOrEqual(at(2020, 1, 1)),
                Bound::LessThan(at(2020, 1, 2))
            )
        );
        assert_eq!(
            compiled("released>=2020"),
            released(Bound::GreaterOrEqual(at(2020, 1, 1)))
        );
        assert_eq!(
            compiled("released<2020"),
            released(Bound::LessThan(at(2020, 1, 1)))
        );
    }

    #[test]
    fn test_absolute_dates_use_local_midnight() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2022, 4, 1, 9, 0, 0).unwrap();
        assert_eq!(
            compile_str("added>=4-1-2022", &now).unwrap(),
            added(Bound::GreaterOrEqual(at_hm(2022, 4, 1, 5, 0)))
        );
    }

    #[test]
    fn test_skipped_midnight_uses_now_offset() {
        let now = summer_time(2018, 11, 10, 12, 0);
        assert_eq!(
            compile_str("added=11-4-2018", &now).unwrap(),
            window(
                added,
                Bound::GreaterOrEqual(at_hm(2018, 11, 4, 2, 0)),
                Bound::LessThan(at_hm(2018, 11, 5, 2, 0))
            )
        );
    }

    #[test]
    fn test_repeated_midnight_takes_earlier_instant() {
        let now = summer_time(2019, 3, 1, 12, 0);
        assert_eq!(
            compile_str("added>=2-17-2019", &now).unwrap(),
            added(Bound::GreaterOrEqual(at_hm(2019, 2, 17, 2, 0)))
        );
    }

    #[test]
    fn test_compile_is_deterministic() {
        let source = "added=7d || (released<3m && !label:\"x\")";
        assert_eq!(compiled(source), compiled(source));
    }

    #[test]
    fn test_compile_filter_treats_blank_as_no_filter() {
        assert_eq!(compile_filter("", &now()), Ok(None));
        assert_eq!(compile_filter("  \t", &now()), Ok(None));
        assert_eq!(compile_filter("clean", &now()), Ok(Some(Predicate::Clean)));
        assert!(compile_filter("clean &&", &now()).is_err());
    }

    #[test]
    fn test_syntax_errors_propagate() {
        assert!(matches!(
            compile_str(r#"label:"name"#, &now()),
            Err(SyntaxError::UnterminatedString { .. })
        ));
    }
}
