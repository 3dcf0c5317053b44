#[macro_use]
extern crate rocket;
#[macro_use]
extern crate log;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;
pub mod voting;

pub use config::Config;

use config::{ConfigFairing, StorageFairing};
use logging::LoggerFairing;
use store::Incidents;

/// Mount the API at both the root and `/api`.
fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket
        .mount("/", api::routes())
        .mount("/api", api::routes())
        .register("/", api::catchers())
}

/// Build the server, with storage chosen by configuration.
pub fn build() -> Rocket<Build> {
    mount_api(rocket::build())
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StorageFairing)
}

/// Build the server around an existing incident store.
pub fn rocket_for_incidents(incidents: Incidents) -> Rocket<Build> {
    mount_api(rocket::build())
        .attach(ConfigFairing)
        .manage(incidents)
}
