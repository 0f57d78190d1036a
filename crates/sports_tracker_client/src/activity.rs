//! Fixed activity-id table and output filename derivation.

use chrono::NaiveDateTime;

/// Activity names indexed by the API's `activityId`. The order is part of the
/// remote contract and must not be rearranged.
const ACTIVITY_NAMES: &[&str] = &[
    "Walking",
    "Running",
    "Cycling",
    "Nordic_skiing",
    "Other_1",
    "Other_2",
    "Other_3",
    "Other_4",
    "Other_5",
    "Other_6",
    "Mountain_biking",
    "Hiking",
    "Roller_skating",
    "Downhill_skiing",
    "Paddling",
    "Rowing",
    "Golf",
    "Indoor",
    "Parkour",
    "Ball_games",
    "Outdoor_gym",
    "Swimming",
    "Trail_running",
    "Gym",
    "Nordic_walking",
    "Horseback_riding",
    "Motorsports",
    "Skateboarding",
    "Water_sports",
    "Climbing",
    "Snowboarding",
    "Ski_touring",
    "Fitness_class",
    "Soccer",
    "Tennis",
    "Basketball",
    "Badminton",
    "Baseball",
    "Volleyball",
    "American_football",
    "Table_tennis",
    "Racquet_ball",
    "Squash",
    "Floorball",
    "Handball",
    "Softball",
    "Bowling",
    "Cricket",
    "Rugby",
];

/// Look up the human-readable name for an activity id. Ids outside the table
/// return `None`; callers substitute the raw workout key.
pub fn activity_name(activity_id: i64) -> Option<&'static str> {
    usize::try_from(activity_id)
        .ok()
        .and_then(|i| ACTIVITY_NAMES.get(i))
        .copied()
}

/// Derive the output filename for a workout: the local start time in ISO form
/// with `T` and `:` replaced by `_`, then the activity name (or the workout
/// key when the id is unknown), e.g. `2020-01-02_03_04_05-Running.fit`.
pub fn workout_filename(timestamp: NaiveDateTime, activity_id: i64, workout_key: &str) -> String {
    let label = activity_name(activity_id).unwrap_or(workout_key);
    format!("{}-{}.fit", timestamp.format("%Y-%m-%d_%H_%M_%S"), label)
}
