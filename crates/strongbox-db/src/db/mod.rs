pub mod connection;
pub mod enums;
pub mod migrations;
pub mod schema;
