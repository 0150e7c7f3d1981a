pub mod close;
pub mod fields;
pub mod memberships;
pub mod name;

pub use close::SprintCloser;
