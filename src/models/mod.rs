pub mod game;

pub use game::{
    ApiResponse,
    Category,
    CategoryProgressRow,
    Duel,
    DuelListRow,
    EarnedAchievement,
    Friendship,
    GameItem,
    PinnedQuestion,
    Profile,
    PublicProfile,
    SubmittedQuestion,
};
