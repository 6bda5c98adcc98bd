pub mod card;
pub mod driver;
pub mod profile;
pub mod transaction;
pub mod user;
