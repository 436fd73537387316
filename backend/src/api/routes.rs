//! # API Route Configuration
//!
//! Blueprint declarations and their registration.

use actix_web::web;

use super::handlers;

/// A named group of routes mounted under a common prefix.
#[derive(Clone, Copy)]
pub struct Blueprint {
    pub name: &'static str,

    /// Mount point. Empty mounts the routes at the root.
    pub url_prefix: &'static str,

    pub configure: fn(&mut web::ServiceConfig),
}

impl std::fmt::Debug for Blueprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Blueprint")
            .field("name", &self.name)
            .field("url_prefix", &self.url_prefix)
            .finish()
    }
}

/// Every blueprint served by the application.
///
/// ## Route Structure
///
/// ```text
/// /
/// ├── /                GET - Service information
/// ├── /health          GET - Health check
/// └── /echo            GET, POST - Echo parsed arguments
///     ├── /none        GET - No arguments
///     └── /fail        GET - Raise an error
/// ```
pub fn all_blueprints() -> Vec<Blueprint> {
    vec![
        Blueprint {
            name: "meta",
            url_prefix: "",
            configure: meta_routes,
        },
        Blueprint {
            name: "echo",
            url_prefix: "/echo",
            configure: echo_routes,
        },
    ]
}

/// Mount every blueprint from [`all_blueprints`].
pub fn register_blueprints(cfg: &mut web::ServiceConfig) {
    for blueprint in all_blueprints() {
        if blueprint.url_prefix.is_empty() || blueprint.url_prefix == "/" {
            cfg.configure(blueprint.configure);
        } else {
            cfg.service(web::scope(blueprint.url_prefix).configure(blueprint.configure));
        }
    }
}

fn meta_routes(cfg: &mut web::ServiceConfig) {
    cfg
        // Root endpoint - API information
        .service(
            web::resource("/")
                .route(web::get().to(handlers::api_info))
                .default_service(web::to(handlers::method_not_allowed)),
        )
        // Health check endpoint
        .service(
            web::resource("/health")
                .route(web::get().to(handlers::health_check))
                .default_service(web::to(handlers::method_not_allowed)),
        );
}

fn echo_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("")
            .route(web::get().to(handlers::echo))
            .route(web::post().to(handlers::echo))
            .default_service(web::to(handlers::method_not_allowed)),
    )
    .service(
        web::resource("/none")
            .route(web::get().to(handlers::echo_none))
            .default_service(web::to(handlers::method_not_allowed)),
    )
    .service(
        web::resource("/fail")
            .route(web::get().to(handlers::echo_fail))
            .default_service(web::to(handlers::method_not_allowed)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blueprint_names_are_unique() {
        let blueprints = all_blueprints();
        let mut names: Vec<&str> = blueprints.iter().map(|b| b.name).collect();
        names.sort_unstable();
        names.dedup();

        assert_eq!(names.len(), blueprints.len());
    }
}
