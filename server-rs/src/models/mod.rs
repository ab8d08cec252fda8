pub mod matches;
pub mod outcome;
pub mod participant;
pub mod user;

pub use matches::*;
pub use outcome::*;
pub use participant::*;
pub use user::*;
