//! Eligibility windows measured from a record's creation time.
//!
//! `now` is always passed in; this crate never reads the clock.

use chrono::{DateTime, Duration, Utc};

use crate::error::{CoreError, CoreResult};
use crate::{EDIT_WINDOW_HOURS, RETURN_WINDOW_DAYS};

/// A sale accepts returns while `now - created_at <= 30 days`.
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use mizan_core::window::check_return_window;
///
/// let now = Utc::now();
/// assert!(check_return_window(now - Duration::days(30), now).is_ok());
/// assert!(check_return_window(now - Duration::days(31), now).is_err());
/// ```
pub fn check_return_window(created_at: DateTime<Utc>, now: DateTime<Utc>) -> CoreResult<()> {
    let age = now - created_at;
    if age > Duration::days(RETURN_WINDOW_DAYS) {
        return Err(CoreError::ReturnWindowExpired {
            age_days: age.num_days(),
            max_days: RETURN_WINDOW_DAYS,
        });
    }
    Ok(())
}

/// Sales and cash transactions are editable while `now - created_at <= 24h`.
pub fn check_edit_window(created_at: DateTime<Utc>, now: DateTime<Utc>) -> CoreResult<()> {
    let age = now - created_at;
    if age > Duration::hours(EDIT_WINDOW_HOURS) {
        return Err(CoreError::EditWindowExpired {
            age_hours: age.num_hours(),
            max_hours: EDIT_WINDOW_HOURS,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_window_boundary() {
        let now = Utc::now();
        assert!(check_return_window(now, now).is_ok());
        assert!(check_return_window(now - Duration::days(30), now).is_ok());

        let err = check_return_window(now - Duration::days(30) - Duration::seconds(1), now)
            .unwrap_err();
        assert_eq!(
            err,
            CoreError::ReturnWindowExpired {
                age_days: 30,
                max_days: 30
            }
        );
    }

    #[test]
    fn test_edit_window_boundary() {
        let now = Utc::now();
        assert!(check_edit_window(now - Duration::hours(24), now).is_ok());

        let err = check_edit_window(now - Duration::hours(25), now).unwrap_err();
        assert_eq!(
            err,
            CoreError::EditWindowExpired {
                age_hours: 25,
                max_hours: 24
            }
        );
    }
}
