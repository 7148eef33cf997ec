pub mod session;
pub mod share;
pub mod user;
