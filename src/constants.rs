pub const API_VERSION: &str = "v1";

/// Every duel pins exactly this many questions at creation time.
pub const DUEL_QUESTION_COUNT: usize = 20;

// Points awarded per difficulty level on a standard score submission.
pub const POINTS_LEVEL_1: i64 = 5;
pub const POINTS_LEVEL_2: i64 = 7;
pub const POINTS_LEVEL_3: i64 = 10;
pub const POINTS_LEVEL_4: i64 = 15;
pub const POINTS_LEVEL_5: i64 = 17;

// Duel lifecycle. 'pending' exists in the status domain for a possible
// invite-before-playing flow but no current transition produces it.
pub const DUEL_STATUS_PENDING: &str = "pending";
pub const DUEL_STATUS_CHALLENGER_COMPLETED: &str = "challenger_completed";
pub const DUEL_STATUS_COMPLETED: &str = "completed";

pub const FRIENDSHIP_STATUS_PENDING: &str = "pending";
pub const FRIENDSHIP_STATUS_ACCEPTED: &str = "accepted";

pub const DEFAULT_LANGUAGE: &str = "en";

/// Hard cap for leaderboard queries.
pub const LEADERBOARD_MAX_LIMIT: i64 = 100;
pub const LEADERBOARD_DEFAULT_LIMIT: i64 = 50;

/// User search returns at most this many candidates.
pub const USER_SEARCH_LIMIT: i64 = 10;
