//! The network inventory tools exposed to the model.

use std::sync::Arc;

use async_trait::async_trait;
use netscout_collectors::aws::TRANSIT_GATEWAY_ROUTE_STATES;
use netscout_collectors::{CloudInventory, CollectorError, FirewallInventory};
use netscout_core::{ParamKind, ParamSpec, Record, ToolDefinition};
use serde_json::{Map, Value};

use crate::tools::{RegistryError, ToolHandler, ToolRegistry};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ListVpcs,
    ListSubnets,
    ListRouteTables,
    ListNetworkInterfaces,
    ListInstances,
    ListSecurityGroups,
    ListTransitGatewayRouteTables,
    ListTransitGatewayVpcAttachments,
    ListTransitGatewayAttachments,
    GetTransitGatewayRoutes,
    ListLoadBalancers,
    ListTargetGroups,
    GetTargetGroupHealth,
    ListFirewallPolicies,
    ListFirewallZones,
    ListFirewallInterfaces,
    ListFirewallRoutes,
}

impl Operation {
    pub const ALL: [Operation; 17] = [
        Self::ListVpcs,
        Self::ListSubnets,
        Self::ListRouteTables,
        Self::ListNetworkInterfaces,
        Self::ListInstances,
        Self::ListSecurityGroups,
        Self::ListTransitGatewayRouteTables,
        Self::ListTransitGatewayVpcAttachments,
        Self::ListTransitGatewayAttachments,
        Self::GetTransitGatewayRoutes,
        Self::ListLoadBalancers,
        Self::ListTargetGroups,
        Self::GetTargetGroupHealth,
        Self::ListFirewallPolicies,
        Self::ListFirewallZones,
        Self::ListFirewallInterfaces,
        Self::ListFirewallRoutes,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::ListVpcs => "list-vpcs",
            Self::ListSubnets => "list-subnets",
            Self::ListRouteTables => "list-route-tables",
            Self::ListNetworkInterfaces => "list-network-interfaces",
            Self::ListInstances => "list-instances",
            Self::ListSecurityGroups => "list-security-groups",
            Self::ListTransitGatewayRouteTables => "list-transit-gateway-route-tables",
            Self::ListTransitGatewayVpcAttachments => "list-transit-gateway-vpc-attachments",
            Self::ListTransitGatewayAttachments => "list-transit-gateway-attachments",
            Self::GetTransitGatewayRoutes => "get-transit-gateway-routes",
            Self::ListLoadBalancers => "list-load-balancers",
            Self::ListTargetGroups => "list-target-groups",
            Self::GetTargetGroupHealth => "get-target-group-health",
            Self::ListFirewallPolicies => "list-firewall-policies",
            Self::ListFirewallZones => "list-firewall-zones",
            Self::ListFirewallInterfaces => "list-firewall-interfaces",
            Self::ListFirewallRoutes => "list-firewall-routes",
        }
    }

    fn description(self) -> &'static str {
        match self {
            Self::ListVpcs => "List all AWS VPCs with their CIDR blocks and state.",
            Self::ListSubnets => "List all AWS subnets with VPC, availability zone and CIDR.",
            Self::ListRouteTables => {
                "List all AWS route tables including their routes and subnet associations."
            }
            Self::ListNetworkInterfaces => {
                "List all AWS network interfaces (ENIs) with attachments, addresses and security groups."
            }
            Self::ListInstances => "List all AWS EC2 instances grouped by reservation.",
            Self::ListSecurityGroups => {
                "List all AWS security groups with their ingress and egress rules."
            }
            Self::ListTransitGatewayRouteTables => "List all AWS Transit Gateway route tables.",
            Self::ListTransitGatewayVpcAttachments => {
                "List all AWS Transit Gateway VPC attachments and the subnets they use."
            }
            Self::ListTransitGatewayAttachments => {
                "List all AWS Transit Gateway attachments of every resource type."
            }
            Self::GetTransitGatewayRoutes => {
                "Get the active and blackhole routes of one AWS Transit Gateway route table."
            }
            Self::ListLoadBalancers => {
                "List all AWS Elastic Load Balancers including gateway load balancers."
            }
            Self::ListTargetGroups => "List all AWS Elastic Load Balancer target groups.",
            Self::GetTargetGroupHealth => {
                "Get the health of every registered target in one AWS target group."
            }
            Self::ListFirewallPolicies => "List all Palo Alto firewall security policies.",
            Self::ListFirewallZones => {
                "List all Palo Alto firewall zones with their mode and member interfaces."
            }
            Self::ListFirewallInterfaces => {
                "List all Palo Alto firewall interfaces with zone, address and state."
            }
            Self::ListFirewallRoutes => {
                "List the Palo Alto firewall routing table, optionally for one virtual router."
            }
        }
    }

    pub fn definition(self) -> ToolDefinition {
        let definition = ToolDefinition::new(self.name(), self.description());
        match self {
            Self::GetTransitGatewayRoutes => definition.with_param(ParamSpec::required(
                "transit_gateway_route_table_id",
                ParamKind::String,
                "Transit Gateway route table id, e.g. tgw-rtb-0123456789abcdef0",
            )),
            Self::GetTargetGroupHealth => definition.with_param(ParamSpec::required(
                "target_group_arn",
                ParamKind::String,
                "ARN of the target group",
            )),
            Self::ListFirewallRoutes => definition.with_param(ParamSpec::optional(
                "virtual_router",
                ParamKind::String,
                "Virtual router name; all virtual routers when omitted",
            )),
            _ => definition,
        }
    }
}

/// Definitions of every catalog tool, available without building collectors.
pub fn definitions() -> Vec<ToolDefinition> {
    Operation::ALL.iter().map(|operation| operation.definition()).collect()
}

pub fn build_registry(
    cloud: Arc<dyn CloudInventory>,
    firewall: Arc<dyn FirewallInventory>,
) -> Result<ToolRegistry, RegistryError> {
    let mut registry = ToolRegistry::new();
    for operation in Operation::ALL {
        let handler = InventoryTool {
            operation,
            cloud: Arc::clone(&cloud),
            firewall: Arc::clone(&firewall),
        };
        registry.register(operation.definition(), Arc::new(handler))?;
    }
    Ok(registry)
}

struct InventoryTool {
    operation: Operation,
    cloud: Arc<dyn CloudInventory>,
    firewall: Arc<dyn FirewallInventory>,
}

#[async_trait]
impl ToolHandler for InventoryTool {
    async fn call(&self, arguments: &Map<String, Value>) -> Result<Vec<Record>, CollectorError> {
        match self.operation {
            Operation::ListVpcs => self.cloud.list_vpcs().await,
            Operation::ListSubnets => self.cloud.list_subnets().await,
            Operation::ListRouteTables => self.cloud.list_route_tables().await,
            Operation::ListNetworkInterfaces => self.cloud.list_network_interfaces().await,
            Operation::ListInstances => self.cloud.list_instances().await,
            Operation::ListSecurityGroups => self.cloud.list_security_groups().await,
            Operation::ListTransitGatewayRouteTables => {
                self.cloud.list_transit_gateway_route_tables().await
            }
            Operation::ListTransitGatewayVpcAttachments => {
                self.cloud.list_transit_gateway_vpc_attachments().await
            }
            Operation::ListTransitGatewayAttachments => {
                self.cloud.list_transit_gateway_attachments().await
            }
            Operation::GetTransitGatewayRoutes => {
                let route_table_id = string_argument(arguments, "transit_gateway_route_table_id")?;
                let routes = self.cloud.get_transit_gateway_routes(route_table_id).await?;
                Ok(retain_route_states(routes))
            }
            Operation::ListLoadBalancers => self.cloud.list_load_balancers().await,
            Operation::ListTargetGroups => self.cloud.list_target_groups().await,
            Operation::GetTargetGroupHealth => {
                let arn = string_argument(arguments, "target_group_arn")?;
                self.cloud.get_target_group_health(arn).await
            }
            Operation::ListFirewallPolicies => self.firewall.list_policies().await,
            Operation::ListFirewallZones => self.firewall.list_zones().await,
            Operation::ListFirewallInterfaces => self.firewall.list_interfaces().await,
            Operation::ListFirewallRoutes => {
                let virtual_router = arguments.get("virtual_router").and_then(Value::as_str);
                self.firewall.list_routes(virtual_router).await
            }
        }
    }
}

fn string_argument<'a>(arguments: &'a Map<String, Value>, name: &str) -> Result<&'a str, CollectorError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| CollectorError::Configuration(format!("missing string argument `{name}`")))
}

/// Keeps only routes whose `state` is active or blackhole.
pub fn retain_route_states(routes: Vec<Record>) -> Vec<Record> {
    routes
        .into_iter()
        .filter(|route| {
            route
                .get("state")
                .and_then(Value::as_str)
                .is_some_and(|state| TRANSIT_GATEWAY_ROUTE_STATES.contains(&state))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use serde_json::{json, Value};

    use super::{definitions, retain_route_states, Operation};

    #[test]
    fn catalog_names_are_unique_and_complete() {
        let definitions = definitions();
        let names = definitions.iter().map(|definition| definition.name.as_str()).collect::<HashSet<_>>();

        assert_eq!(definitions.len(), 17);
        assert_eq!(names.len(), 17);
        assert!(names.contains("list-firewall-routes"));
        assert!(definitions.iter().all(|definition| !definition.description.is_empty()));
    }

    #[test]
    fn only_lookup_tools_require_arguments() {
        for operation in Operation::ALL {
            let required = operation
                .definition()
                .parameters
                .iter()
                .filter(|param| param.required)
                .map(|param| param.name.clone())
                .collect::<Vec<_>>();
            match operation {
                Operation::GetTransitGatewayRoutes => {
                    assert_eq!(required, vec!["transit_gateway_route_table_id"])
                }
                Operation::GetTargetGroupHealth => assert_eq!(required, vec!["target_group_arn"]),
                _ => assert!(required.is_empty(), "{} should take no required input", operation.name()),
            }
        }
    }

    #[test]
    fn route_filter_drops_other_states() {
        let routes = vec![
            json!({"destinationCidrBlock": "10.0.0.0/16", "state": "active"}),
            json!({"destinationCidrBlock": "10.1.0.0/16", "state": "blackhole"}),
            json!({"destinationCidrBlock": "10.2.0.0/16", "state": "pending"}),
            json!({"destinationCidrBlock": "10.3.0.0/16"}),
        ]
        .into_iter()
        .filter_map(|value| match value {
            Value::Object(record) => Some(record),
            _ => None,
        })
        .collect();

        let kept = retain_route_states(routes);
        let states = kept.iter().map(|route| route["state"].clone()).collect::<Vec<_>>();
        assert_eq!(states, vec![json!("active"), json!("blackhole")]);
    }
}
