//! Infrastructure services

mod routing_service;

pub use routing_service::{RoutingService, RoutingServiceBuilder, RoutingServiceConfig};
