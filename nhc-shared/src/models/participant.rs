/// Challenge participants and their daily scorecards
///
/// A registered user enters one or more participants (themselves, family
/// members). Each participant tracks a habit commitment on a scorecard: one
/// cell per challenge day, grouped into weeks of seven. Participants are stored
/// inside the owning user's row as JSONB.
///
/// # Scorecard Shape
///
/// For a challenge of `length` days the scorecard holds `length / 7` full
/// weeks followed by one partial week of `length % 7` days, when that
/// remainder is non-zero. Cell `(week, day)` covers challenge day
/// `week * 7 + day`, counted from zero.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Days per scorecard row
pub const DAYS_PER_WEEK: usize = 7;

/// Daily scorecard, one row per week, each cell 0 or 1
pub type Scorecard = Vec<Vec<u8>>;

/// A person taking part in the challenge under a user account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Participant {
    /// Position of the participant within the owning user, from zero
    pub id: usize,

    pub first_name: String,

    pub last_name: String,

    /// Inclusive age range, e.g. `[25, 34]`
    pub age_range: [u32; 2],

    pub category: String,

    /// Name of the chosen commitment, or free text when `custom_commitment`
    pub commitment: String,

    pub custom_commitment: bool,

    pub scorecard: Scorecard,

    /// Days completed up to and including today
    pub points: u32,
}

/// Builds an empty scorecard for a challenge of `length` days
///
/// # Example
///
/// ```
/// use nhc_shared::models::participant::generate_scorecard;
///
/// let scorecard = generate_scorecard(29);
/// assert_eq!(scorecard.len(), 5);
/// assert_eq!(scorecard[4].len(), 1);
/// ```
pub fn generate_scorecard(length: u32) -> Scorecard {
    let length = length as usize;
    let mut scorecard: Scorecard = (0..length / DAYS_PER_WEEK)
        .map(|_| vec![0; DAYS_PER_WEEK])
        .collect();

    let remainder = length % DAYS_PER_WEEK;
    if remainder > 0 {
        scorecard.push(vec![0; remainder]);
    }

    scorecard
}

/// Zero-based challenge day for `today`
///
/// Negative before the challenge starts. Uses calendar arithmetic, so it stays
/// correct across year boundaries.
pub fn current_challenge_day(challenge_start: NaiveDate, today: NaiveDate) -> i64 {
    (today - challenge_start).num_days()
}

/// Normalizes a submitted scorecard and counts its points
///
/// Every cell after `min(current_day, length - 1)` is cleared, the rest are
/// clamped to 0 or 1. The submitted shape is kept as is.
///
/// # Returns
///
/// The normalized scorecard and its points (the number of 1-cells).
///
/// # Example
///
/// ```
/// use nhc_shared::models::participant::normalize_scorecard;
///
/// let submitted = vec![vec![1, 5, -2, 1, 1, 1, 1], vec![1, 1]];
/// let (scorecard, points) = normalize_scorecard(&submitted, 3, 9);
///
/// assert_eq!(scorecard, vec![vec![1, 1, 0, 1, 0, 0, 0], vec![0, 0]]);
/// assert_eq!(points, 3);
/// ```
pub fn normalize_scorecard(submitted: &[Vec<i64>], current_day: i64, length: u32) -> (Scorecard, u32) {
    let last_open_day = current_day.min(i64::from(length) - 1);
    let mut points = 0u32;

    let scorecard = submitted
        .iter()
        .enumerate()
        .map(|(week, days)| {
            days.iter()
                .enumerate()
                .map(|(day, &value)| {
                    let day_index = (week * DAYS_PER_WEEK + day) as i64;
                    let cell = u8::from(day_index <= last_open_day && value > 0);
                    points += u32::from(cell);
                    cell
                })
                .collect()
        })
        .collect();

    (scorecard, points)
}

/// Prepares submitted participants for a new registration
///
/// Assigns sequential IDs, zeroes points and attaches a fresh scorecard.
pub fn prepare_participants(participants: Vec<Participant>, challenge_length: u32) -> Vec<Participant> {
    participants
        .into_iter()
        .enumerate()
        .map(|(index, participant)| Participant {
            id: index,
            points: 0,
            scorecard: generate_scorecard(challenge_length),
            ..participant
        })
        .collect()
}
