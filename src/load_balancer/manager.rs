//! Service tree management.
//!
//! # Responsibilities
//! - Build one balancer per configured service
//! - Nest child services under their parents with status propagation
//! - Route external status reports to the right balancer

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::config::{ProxyConfig, ServiceConfig};
use crate::health::propagate_to;
use crate::http::forward::Upstream;
use crate::load_balancer::entry::EntrySnapshot;
use crate::load_balancer::error::BalancerError;
use crate::load_balancer::sticky::StickyCookie;
use crate::load_balancer::wrr::Balancer;

/// Errors raised while building the service tree.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("service '{0}' not found")]
    UnknownService(String),

    #[error("service '{service}': {source}")]
    Balancer {
        service: String,
        #[source]
        source: BalancerError,
    },

    #[error("server '{server}' of service '{service}' has invalid url: {reason}")]
    InvalidUrl { service: String, server: String, reason: String },
}

/// Snapshot of one service for the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceSnapshot {
    pub name: String,
    pub healthy: bool,
    pub servers: Vec<EntrySnapshot>,
}

/// Owns the balancer of every configured service.
#[derive(Debug)]
pub struct ServiceManager {
    entry: Arc<Balancer>,
    services: HashMap<String, Arc<Balancer>>,
}

impl ServiceManager {
    /// Build the service tree from a validated configuration.
    ///
    /// Every service gets exactly one balancer, shared by all the parents
    /// that reference it.
    pub fn new(config: &ProxyConfig) -> Result<Self, BuildError> {
        let configs: HashMap<&str, &ServiceConfig> =
            config.services.iter().map(|s| (s.name.as_str(), s)).collect();

        let mut parents: HashMap<&str, Vec<&ServiceConfig>> = HashMap::new();
        for service in &config.services {
            for child in &service.services {
                parents.entry(child.name.as_str()).or_default().push(service);
            }
        }

        // Parents first, so their balancers exist when a child registers
        // its status updaters.
        let mut services: HashMap<String, Arc<Balancer>> = HashMap::new();
        for name in parents_first(&config.services, &configs) {
            let service = configs
                .get(name)
                .ok_or_else(|| BuildError::UnknownService(name.to_string()))?;
            let referencing = parents.get(name).map(Vec::as_slice).unwrap_or_default();
            let balancer = build_service(service, referencing, &services)?;
            services.insert(name.to_string(), balancer);
        }

        for service in &config.services {
            let Some(balancer) = services.get(&service.name) else {
                continue;
            };
            for child in &service.services {
                let handler = services
                    .get(&child.name)
                    .cloned()
                    .ok_or_else(|| BuildError::UnknownService(child.name.clone()))?;
                balancer
                    .add(child.name.clone(), handler, child.weight)
                    .map_err(|source| BuildError::Balancer { service: service.name.clone(), source })?;
            }
        }

        let entry = services
            .get(&config.listener.service)
            .cloned()
            .ok_or_else(|| BuildError::UnknownService(config.listener.service.clone()))?;

        tracing::info!(
            entry = %config.listener.service,
            services = services.len(),
            "Service tree built"
        );
        Ok(Self { entry, services })
    }

    /// Balancer requests are dispatched to.
    pub fn entry(&self) -> Arc<Balancer> {
        self.entry.clone()
    }

    pub fn get(&self, service: &str) -> Option<Arc<Balancer>> {
        self.services.get(service).cloned()
    }

    /// Record a status report for `server` of `service`.
    pub fn set_server_status(&self, service: &str, server: &str, healthy: bool) -> Result<(), BuildError> {
        let balancer = self
            .services
            .get(service)
            .ok_or_else(|| BuildError::UnknownService(service.to_string()))?;
        balancer.set_status(server, healthy);
        Ok(())
    }

    /// All services, sorted by name.
    pub fn snapshot(&self) -> Vec<ServiceSnapshot> {
        let mut services: Vec<_> = self
            .services
            .iter()
            .map(|(name, balancer)| ServiceSnapshot {
                name: name.clone(),
                healthy: balancer.is_healthy(),
                servers: balancer.snapshot(),
            })
            .collect();
        services.sort_by(|a, b| a.name.cmp(&b.name));
        services
    }
}

/// Service names ordered so every parent comes before its children.
///
/// Reverse DFS post-order; configurations are validated to be acyclic.
fn parents_first<'a>(
    services: &'a [ServiceConfig],
    configs: &HashMap<&'a str, &'a ServiceConfig>,
) -> Vec<&'a str> {
    fn visit<'a>(
        name: &'a str,
        configs: &HashMap<&'a str, &'a ServiceConfig>,
        seen: &mut HashSet<&'a str>,
        order: &mut Vec<&'a str>,
    ) {
        if !seen.insert(name) {
            return;
        }
        if let Some(&service) = configs.get(name) {
            for child in &service.services {
                visit(child.name.as_str(), configs, seen, order);
            }
            order.push(name);
        }
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();
    for service in services {
        visit(service.name.as_str(), configs, &mut seen, &mut order);
    }
    order.reverse();
    order
}

/// Build one service's balancer with its servers, wired to report its status
/// to every referencing parent that checks health.
fn build_service(
    config: &ServiceConfig,
    parents: &[&ServiceConfig],
    built: &HashMap<String, Arc<Balancer>>,
) -> Result<Arc<Balancer>, BuildError> {
    let balancer_err = |source| BuildError::Balancer { service: config.name.clone(), source };

    let sticky = config
        .sticky
        .as_ref()
        .and_then(|s| s.cookie.as_ref())
        .map(StickyCookie::from);
    let mut balancer = Balancer::new(sticky, config.health_check);

    for parent in parents.iter().filter(|p| p.health_check) {
        let parent_balancer = built
            .get(&parent.name)
            .ok_or_else(|| BuildError::UnknownService(parent.name.clone()))?;
        propagate_to(&mut balancer, Arc::downgrade(parent_balancer), &config.name).map_err(balancer_err)?;
    }
    let balancer = Arc::new(balancer);

    for server in &config.servers {
        let upstream = Upstream::new(&server.url).map_err(|e| BuildError::InvalidUrl {
            service: config.name.clone(),
            server: server.name.clone(),
            reason: e.to_string(),
        })?;
        balancer
            .add(server.name.clone(), Arc::new(upstream), server.weight)
            .map_err(balancer_err)?;
    }

    Ok(balancer)
}
