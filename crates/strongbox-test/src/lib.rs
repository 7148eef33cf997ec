//! Strongbox file vault - integration test support.
//!
//! Re-exports the workspace crates under one roof so integration tests can
//! use `strongbox_test::` paths.

pub mod component {
    pub use strongbox_service::*;

    pub mod db {
        pub use strongbox_db::db::*;
        pub use strongbox_db::store::*;
    }

    pub mod model {
        pub use strongbox_db::model::*;
    }

    pub mod middleware {
        pub use strongbox_app::middleware::*;
    }

    pub mod config {
        pub use strongbox_app::config::ConfigHandler;
        pub use strongbox_core::config::*;
    }

    pub mod constants {
        pub use strongbox_core::constants::*;
    }
}

pub mod app {
    pub use strongbox_app::*;

    pub mod api {
        pub use strongbox_app::app::api::*;
    }
}
