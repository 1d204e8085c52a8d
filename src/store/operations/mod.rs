pub mod attempts;
pub mod mastery;
pub mod profiles;
