//! CLI command implementations
//!
//! Both commands load the same JSON configuration: server settings,
//! registry-wide resource defaults and the models to expose. Every model
//! gets an in-memory collection.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::http_server::{HttpServer, HttpServerConfig};
use crate::rest_api::{ResourceDefaults, ResourceOptions, Restify};
use crate::schema::ModelSchema;
use crate::store::InMemoryStore;

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::print_routes;

/// One exposed model
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub schema: ModelSchema,

    #[serde(default)]
    pub options: ResourceOptions,
}

/// Configuration file structure
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: HttpServerConfig,

    /// Options applied under every model's own options
    #[serde(default)]
    pub defaults: ResourceDefaults,

    pub models: Vec<ModelConfig>,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("models", &self.models.iter().map(|m| &m.schema.name).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    /// Parse configuration from JSON text
    pub fn parse(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.models.is_empty() {
            return Err(CliError::config_error("At least one model is required"));
        }

        let mut names = HashSet::new();
        for model in &self.models {
            if model.schema.name.is_empty() {
                return Err(CliError::config_error("Model name must not be empty"));
            }
            if !names.insert(model.schema.name.as_str()) {
                return Err(CliError::config_error(format!(
                    "Duplicate model: '{}'",
                    model.schema.name
                )));
            }
        }

        for model in &self.models {
            for field in &model.schema.fields {
                if let Some(target) = field.relation_target() {
                    if !names.contains(target) {
                        return Err(CliError::config_error(format!(
                            "Field '{}.{}' references undefined model '{}'",
                            model.schema.name, field.name, target
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Define every model in a fresh store and register it
    pub fn build(&self) -> CliResult<(InMemoryStore, Restify)> {
        let store = InMemoryStore::new();
        let mut restify = Restify::with_defaults(self.defaults.clone());

        for model in &self.models {
            let collection = store.define(model.schema.clone())?;
            restify.serve(collection, model.options.clone())?;
        }

        Ok((store, restify))
    }
}

/// Run a parsed command
pub fn run_command(command: Command) -> CliResult<()> {
    match command {
        Command::Serve { config, host, port } => serve(&config, host, port),
        Command::Routes { config, json } => routes(&config, json),
    }
}

/// Print the route table of a configuration
pub fn routes(config_path: &Path, json: bool) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let (_store, restify) = config.build()?;
    print_routes(&restify.routes(), json)
}

/// Serve a configuration until the process stops
pub fn serve(config_path: &Path, host: Option<String>, port: Option<u16>) -> CliResult<()> {
    let config = Config::load(config_path)?;
    let mut server_config = config.server.clone();
    if let Some(host) = host {
        server_config.host = host;
    }
    if let Some(port) = port {
        server_config.port = port;
    }

    let (_store, restify) = config.build()?;
    info!(
        resources = restify.len(),
        routes = restify.routes().len(),
        "configuration loaded"
    );
    let server = HttpServer::from_restify(server_config, restify)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::serve_failed(format!("Failed to start runtime: {}", e)))?;

    runtime
        .block_on(server.start())
        .map_err(|e| CliError::serve_failed(e.to_string()))
}
