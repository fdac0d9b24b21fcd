//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (listener and parents reference existing services)
//! - Reject reference cycles between services
//! - Validate server URLs (plain http upstreams only)
//! - Child names of sticky services must be valid cookie values
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system
//! - Zero weights are valid: such servers are skipped when balancers are built

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use url::Url;

use crate::config::schema::{ProxyConfig, ServiceConfig};
use crate::load_balancer::sticky::is_valid_cookie_value;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener references unknown service '{0}'")]
    UnknownEntryService(String),

    #[error("service '{0}' is defined more than once")]
    DuplicateService(String),

    #[error("service '{service}' defines '{child}' more than once")]
    DuplicateChild { service: String, child: String },

    #[error("service '{service}' references unknown service '{child}'")]
    UnknownChild { service: String, child: String },

    #[error("service '{0}' must define either servers or services")]
    InvalidShape(String),

    #[error("server '{server}' of service '{service}' has invalid url '{url}'")]
    InvalidUrl { service: String, server: String, url: String },

    #[error("service '{0}' has an empty sticky cookie name")]
    EmptyCookieName(String),

    #[error("service '{service}' uses sticky cookies but '{child}' is not a valid cookie value")]
    InvalidCookieValue { service: String, child: String },

    #[error("service '{0}' is part of a reference cycle")]
    Cycle(String),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut services: HashMap<&str, &ServiceConfig> = HashMap::new();

    for service in &config.services {
        if services.insert(service.name.as_str(), service).is_some() {
            errors.push(ValidationError::DuplicateService(service.name.clone()));
        }
    }

    if !services.contains_key(config.listener.service.as_str()) {
        errors.push(ValidationError::UnknownEntryService(config.listener.service.clone()));
    }

    for service in &config.services {
        validate_service(service, &services, &mut errors);
    }

    let mut done = HashSet::new();
    for service in &config.services {
        let mut path = Vec::new();
        if let Some(name) = find_cycle(&service.name, &services, &mut path, &mut done) {
            errors.push(ValidationError::Cycle(name.to_string()));
            // Report each cycle once.
            done.extend(path);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_service(
    service: &ServiceConfig,
    services: &HashMap<&str, &ServiceConfig>,
    errors: &mut Vec<ValidationError>,
) {
    if service.servers.is_empty() == service.services.is_empty() {
        errors.push(ValidationError::InvalidShape(service.name.clone()));
    }

    if let Some(cookie) = service.sticky.as_ref().and_then(|s| s.cookie.as_ref()) {
        if cookie.name.trim().is_empty() {
            errors.push(ValidationError::EmptyCookieName(service.name.clone()));
        }
    }

    if service.sticky.as_ref().and_then(|s| s.cookie.as_ref()).is_some() {
        let names = service.servers.iter().map(|s| &s.name).chain(service.services.iter().map(|c| &c.name));
        for name in names.filter(|n| !is_valid_cookie_value(n)) {
            errors.push(ValidationError::InvalidCookieValue {
                service: service.name.clone(),
                child: name.clone(),
            });
        }
    }

    let mut children = HashSet::new();
    for server in &service.servers {
        if !children.insert(server.name.as_str()) {
            errors.push(ValidationError::DuplicateChild {
                service: service.name.clone(),
                child: server.name.clone(),
            });
        }
        let valid = Url::parse(&server.url)
            .map(|url| url.scheme() == "http" && url.host().is_some())
            .unwrap_or(false);
        if !valid {
            errors.push(ValidationError::InvalidUrl {
                service: service.name.clone(),
                server: server.name.clone(),
                url: server.url.clone(),
            });
        }
    }

    for child in &service.services {
        if !children.insert(child.name.as_str()) {
            errors.push(ValidationError::DuplicateChild {
                service: service.name.clone(),
                child: child.name.clone(),
            });
        }
        if !services.contains_key(child.name.as_str()) {
            errors.push(ValidationError::UnknownChild {
                service: service.name.clone(),
                child: child.name.clone(),
            });
        }
    }
}

/// Depth-first search for a service that references itself.
fn find_cycle<'a>(
    name: &'a str,
    services: &HashMap<&'a str, &'a ServiceConfig>,
    path: &mut Vec<&'a str>,
    done: &mut HashSet<&'a str>,
) -> Option<&'a str> {
    if done.contains(name) {
        return None;
    }
    if path.contains(&name) {
        return Some(name);
    }
    let service: &'a ServiceConfig = *services.get(name)?;
    path.push(name);
    for child in &service.services {
        if let Some(found) = find_cycle(child.name.as_str(), services, path, done) {
            return Some(found);
        }
    }
    path.pop();
    done.insert(name);
    None
}
