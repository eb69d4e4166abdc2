pub mod action;
pub mod neighborhood;
pub mod profile;
pub mod user;

pub use action::UserAction;
pub use neighborhood::Neighborhood;
pub use profile::UserProfile;
pub use user::User;
