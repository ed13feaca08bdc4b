pub mod batch_jobs;
pub mod config;
pub mod errors;
pub mod models;
pub mod schema;
pub mod modules;
pub mod server;

pub(crate) mod macros {
    pub mod database_error_handeler;
    pub mod request_caching;
}

pub mod routes {
    pub mod health;

    pub mod api {
        pub mod race;
        pub mod recommendation;
        pub mod track;
    }
}
