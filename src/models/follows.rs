/// Directed edge: `user_following_id` follows `user_being_followed_id`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Follows {
    pub user_being_followed_id: i64,
    pub user_following_id: i64,
}

impl Follows {
    /// Edge for "`follower` follows `followed`".
    #[must_use]
    pub const fn new(follower: i64, followed: i64) -> Self {
        Self {
            user_being_followed_id: followed,
            user_following_id: follower,
        }
    }
}
