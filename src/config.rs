use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::model::mongodb::ensure_indexes_exist;
use crate::store::{Incidents, MemoryStore, MongoStore, DEFAULT_CONFLICT_RETRIES};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // secrets
    jwt_secret: String,
}

impl Config {
    /// Secret key shared with the authentication service, which signs the
    /// JWTs we verify.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Where incidents are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StorageKind {
    #[default]
    Mongodb,
    Memory,
}

/// Configuration for incident storage.
#[derive(Deserialize)]
struct StorageConfig {
    #[serde(default)]
    storage: StorageKind,
    // secrets
    db_uri: Option<String>,
    #[serde(default = "default_db_name")]
    db_name: String,
    #[serde(default = "default_conflict_retries")]
    conflict_retries: u32,
}

fn default_db_name() -> String {
    "incident_board".to_string()
}

fn default_conflict_retries() -> u32 {
    DEFAULT_CONFLICT_RETRIES
}

/// A fairing that loads the storage config, connects to the database if
/// needed, performs any setup necessary, and places the [`Incidents`] handle
/// into managed state.
pub struct StorageFairing;

#[rocket::async_trait]
impl Fairing for StorageFairing {
    fn info(&self) -> Info {
        Info {
            name: "Incident storage",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StorageConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load storage config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        let incidents = match config.storage {
            StorageKind::Memory => {
                warn!("Using in-memory incident storage; nothing will be persisted");
                Incidents::new(MemoryStore::default(), config.conflict_retries)
            }
            StorageKind::Mongodb => {
                let Some(db_uri) = config.db_uri else {
                    error!("`db_uri` must be set when using MongoDB storage");
                    return Err(rocket);
                };
                info!("Loaded database config, connecting...");
                // Construct the connection.
                let client = match MongoClient::with_uri_str(db_uri).await {
                    Ok(client) => client,
                    Err(e) => {
                        error!("Failed to connect to database: {e}");
                        return Err(rocket);
                    }
                };
                let db = client.database(&config.db_name);

                // Ensure the required indexes exist.
                if let Err(e) = ensure_indexes_exist(&db).await {
                    error!("Failed to connect to database: {e}");
                    return Err(rocket);
                }
                info!("...database connection online!");

                Incidents::new(MongoStore::new(&db), config.conflict_retries)
            }
        };

        // Manage the state.
        Ok(rocket.manage(incidents))
    }
}
