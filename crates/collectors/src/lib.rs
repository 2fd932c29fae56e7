//! Read-only network inventory collectors.
//!
//! Two sources are covered: AWS (EC2 and ELBv2 over the signed query API) and a PAN-OS
//! firewall (XML API). Each collector returns `Vec<Record>` so tool handlers can serialize
//! results without knowing the source schema.

pub mod aws;
pub mod error;
pub mod firewall;
pub mod xml;

use async_trait::async_trait;
use netscout_core::Record;

pub use aws::{AwsInventory, AwsService, HttpQueryTransport, QueryTransport};
pub use error::CollectorError;
pub use firewall::{PanosFirewall, PanosHttpClient, XmlApi};

/// Cloud network inventory for one account and region.
///
/// List operations follow pagination until exhausted or until the configured page limit.
/// An empty listing is `Ok(vec![])`; any failed page is an error, never a partial list.
#[async_trait]
pub trait CloudInventory: Send + Sync {
    async fn list_vpcs(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_subnets(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_route_tables(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_network_interfaces(&self) -> Result<Vec<Record>, CollectorError>;
    /// Reservation records, each carrying its instances.
    async fn list_instances(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_security_groups(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_transit_gateway_route_tables(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_transit_gateway_vpc_attachments(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_transit_gateway_attachments(&self) -> Result<Vec<Record>, CollectorError>;
    /// Active and blackhole routes of one transit gateway route table.
    async fn get_transit_gateway_routes(
        &self,
        route_table_id: &str,
    ) -> Result<Vec<Record>, CollectorError>;
    async fn list_load_balancers(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_target_groups(&self) -> Result<Vec<Record>, CollectorError>;
    async fn get_target_group_health(
        &self,
        target_group_arn: &str,
    ) -> Result<Vec<Record>, CollectorError>;
}

/// Firewall inventory for one virtual system.
///
/// Security rules and zones fail loudly. Interfaces and routes come from operational
/// commands whose output shape varies by software version, so unreadable output is logged
/// and reported as an empty list.
#[async_trait]
pub trait FirewallInventory: Send + Sync {
    async fn list_policies(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_zones(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_interfaces(&self) -> Result<Vec<Record>, CollectorError>;
    async fn list_routes(&self, virtual_router: Option<&str>) -> Result<Vec<Record>, CollectorError>;
}
