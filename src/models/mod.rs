//! Domain records and the operations the views compose.

mod follows;
mod message;
mod user;

pub use self::follows::Follows;
pub use self::message::{Message, MessageError, NewMessage, MAX_MESSAGE_LEN, TIMELINE_LIMIT};
pub use self::user::{
    FollowError, NewUser, SignupError, SignupForm, User, ValidationError, DEFAULT_IMAGE_URL,
};
