//! Domain entities - the core business objects.

mod category;
mod comment;
mod location;
mod post;
mod user;

pub use category::Category;
pub use comment::{AuthoredComment, Comment};
pub use location::Location;
pub use post::{Post, PostSummary};
pub use user::User;
