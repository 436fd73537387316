//! # API Scaffold Backend Service
//!
//! Entry point of the HTTP API scaffold. It provides:
//!
//! - An application factory wiring CORS, access logging and error handling
//! - Declarative query models for request arguments
//! - DingTalk alerts for requests that fail with 500
//! - Console and daily-rotated file logs
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     BACKEND SERVICE                      │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │ AlertOnServerError → Cors → Logger                 │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                          │                               │
//! │  ┌───────────────────────┴────────────────────────────┐  │
//! │  │ Blueprints: meta (/, /health), echo (/echo/...)    │  │
//! │  │ Handlers take Parsed<QueryModel> arguments         │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │          │                              │                │
//! │  ┌───────┴──────┐               ┌───────┴───────┐        │
//! │  │  PostgreSQL  │               │   DingTalk    │        │
//! │  │  (deadpool)  │               │   robot       │        │
//! │  └──────────────┘               └───────────────┘        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! 1. Copy `.env.example` to `.env` and set `DATABASE_URL`
//! 2. Start the server: `cargo run`
//!
//! ## Environment Variables
//!
//! See [`config::AppConfig`] for the full list.

use std::sync::Arc;

use actix_web::HttpServer;
use tracing::info;

mod alert;
mod api;
mod app;
mod config;
mod db;
mod errors;
mod logging;
mod middleware;
mod models;
mod query_model;
mod utils;

use alert::Alerter;
use app::{create_app, AppState};
use config::AppConfig;
use db::Database;

/// Main entry point for the backend service.
///
/// This function:
/// 1. Loads configuration from environment
/// 2. Initializes logging
/// 3. Connects to the database
/// 4. Sets up the DingTalk alerter
/// 5. Launches the HTTP server
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // =========================================
    // STEP 1: Load Configuration
    // =========================================
    // Load from environment variables (from .env file)
    dotenvy::dotenv().ok(); // It's okay if .env doesn't exist

    let config = AppConfig::from_env().expect("Failed to load configuration");

    // =========================================
    // STEP 2: Initialize Logging
    // =========================================
    // The guards flush the file writers on exit
    let _log_guards = logging::init_logging(&config).expect("Failed to initialize logging");

    info!("🚀 Starting API Scaffold Backend Service");
    info!("📋 Configuration loaded");
    info!("   Namespace: {}", config.namespace);
    info!("   Log level: {}", config.log_level());

    // =========================================
    // STEP 3: Initialize Database
    // =========================================
    let db = Database::connect(&config.database_url, config.database_pool_size)
        .await
        .expect("Failed to connect to database");

    info!("🗄️  Database connected");

    // =========================================
    // STEP 4: Initialize Alerter
    // =========================================
    let alerter = Alerter::new(&config).expect("Failed to create DingTalk alerter");

    if alerter.is_enabled() {
        info!("🔔 DingTalk alerts enabled");
    } else {
        info!("🔕 DingTalk webhook not configured, alerts are only logged");
    }

    // =========================================
    // STEP 5: Create Application State
    // =========================================
    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    let app_state = Arc::new(AppState {
        config,
        db,
        alerter,
    });

    // =========================================
    // STEP 6: Start HTTP Server
    // =========================================
    info!("🌐 Starting HTTP server on {}:{}", server_host, server_port);

    HttpServer::new(move || create_app(app_state.clone()))
        .bind(format!("{}:{}", server_host, server_port))?
        .run()
        .await
}
