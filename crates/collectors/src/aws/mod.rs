pub mod sigv4;
pub mod transport;

use async_trait::async_trait;
use netscout_core::Record;
use serde_json::Value;

pub use transport::{AwsService, HttpQueryTransport, QueryTransport};

use crate::error::CollectorError;
use crate::xml;
use crate::CloudInventory;

pub const TRANSIT_GATEWAY_ROUTE_STATES: [&str; 2] = ["active", "blackhole"];

/// Describes where one list call keeps its items and its continuation token.
struct ListCall {
    service: AwsService,
    action: &'static str,
    items: &'static [&'static str],
    next_token: Option<(&'static [&'static str], &'static str)>,
}

const EC2_TOKEN: Option<(&[&str], &str)> = Some((&["nextToken"], "NextToken"));

const DESCRIBE_VPCS: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeVpcs",
    items: &["vpcSet"],
    next_token: EC2_TOKEN,
};
const DESCRIBE_SUBNETS: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeSubnets",
    items: &["subnetSet"],
    next_token: EC2_TOKEN,
};
const DESCRIBE_ROUTE_TABLES: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeRouteTables",
    items: &["routeTableSet"],
    next_token: EC2_TOKEN,
};
const DESCRIBE_NETWORK_INTERFACES: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeNetworkInterfaces",
    items: &["networkInterfaceSet"],
    next_token: EC2_TOKEN,
};
const DESCRIBE_INSTANCES: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeInstances",
    items: &["reservationSet"],
    next_token: EC2_TOKEN,
};
const DESCRIBE_SECURITY_GROUPS: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeSecurityGroups",
    items: &["securityGroupInfo"],
    next_token: EC2_TOKEN,
};
const DESCRIBE_TGW_ROUTE_TABLES: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeTransitGatewayRouteTables",
    items: &["transitGatewayRouteTables"],
    next_token: EC2_TOKEN,
};
const DESCRIBE_TGW_VPC_ATTACHMENTS: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeTransitGatewayVpcAttachments",
    items: &["transitGatewayVpcAttachments"],
    next_token: EC2_TOKEN,
};
const DESCRIBE_TGW_ATTACHMENTS: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "DescribeTransitGatewayAttachments",
    items: &["transitGatewayAttachments"],
    next_token: EC2_TOKEN,
};
const SEARCH_TGW_ROUTES: ListCall = ListCall {
    service: AwsService::Ec2,
    action: "SearchTransitGatewayRoutes",
    items: &["routeSet"],
    next_token: None,
};
const DESCRIBE_LOAD_BALANCERS: ListCall = ListCall {
    service: AwsService::ElasticLoadBalancing,
    action: "DescribeLoadBalancers",
    items: &["DescribeLoadBalancersResult", "LoadBalancers"],
    next_token: Some((&["DescribeLoadBalancersResult", "NextMarker"], "Marker")),
};
const DESCRIBE_TARGET_GROUPS: ListCall = ListCall {
    service: AwsService::ElasticLoadBalancing,
    action: "DescribeTargetGroups",
    items: &["DescribeTargetGroupsResult", "TargetGroups"],
    next_token: Some((&["DescribeTargetGroupsResult", "NextMarker"], "Marker")),
};
const DESCRIBE_TARGET_HEALTH: ListCall = ListCall {
    service: AwsService::ElasticLoadBalancing,
    action: "DescribeTargetHealth",
    items: &["DescribeTargetHealthResult", "TargetHealthDescriptions"],
    next_token: None,
};

/// Read-only EC2 and ELBv2 inventory over the query API.
pub struct AwsInventory<T> {
    transport: T,
    max_pages: u32,
}

impl<T> AwsInventory<T>
where
    T: QueryTransport,
{
    pub fn new(transport: T, max_pages: u32) -> Self {
        Self { transport, max_pages: max_pages.max(1) }
    }

    async fn collect(
        &self,
        call: &ListCall,
        params: Vec<(String, String)>,
    ) -> Result<Vec<Record>, CollectorError> {
        let mut records = Vec::new();
        let mut token: Option<String> = None;

        for page in 1..=self.max_pages {
            let mut page_params = params.clone();
            if let (Some(value), Some((_, param))) = (&token, call.next_token) {
                page_params.push((param.to_string(), value.clone()));
            }

            let body = self.transport.call(call.service, call.action, &page_params).await?;
            let document = xml::normalize_sets(xml::to_value(&body)?);
            let response = response_body(&document, call.action)?;

            let items = xml::path(response, call.items).cloned().unwrap_or(Value::Null);
            records.extend(xml::into_records(items));

            token = call.next_token.and_then(|(path, _)| {
                xml::path(response, path)
                    .and_then(Value::as_str)
                    .filter(|value| !value.is_empty())
                    .map(str::to_string)
            });
            if token.is_none() {
                break;
            }
            if page == self.max_pages {
                tracing::warn!(
                    event_name = "collector.aws.page_limit_reached",
                    action = call.action,
                    max_pages = self.max_pages,
                    records = records.len(),
                    "stopped paginating before the last page"
                );
            }
        }

        tracing::debug!(
            event_name = "collector.aws.collected",
            action = call.action,
            records = records.len(),
            "query API listing complete"
        );
        Ok(records)
    }
}

fn response_body<'a>(document: &'a Value, action: &str) -> Result<&'a Value, CollectorError> {
    let expected = format!("{action}Response");
    document
        .get(&expected)
        .ok_or_else(|| CollectorError::Parse(format!("response has no `{expected}` element")))
}

#[async_trait]
impl<T> CloudInventory for AwsInventory<T>
where
    T: QueryTransport,
{
    async fn list_vpcs(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_VPCS, Vec::new()).await
    }

    async fn list_subnets(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_SUBNETS, Vec::new()).await
    }

    async fn list_route_tables(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_ROUTE_TABLES, Vec::new()).await
    }

    async fn list_network_interfaces(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_NETWORK_INTERFACES, Vec::new()).await
    }

    async fn list_instances(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_INSTANCES, Vec::new()).await
    }

    async fn list_security_groups(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_SECURITY_GROUPS, Vec::new()).await
    }

    async fn list_transit_gateway_route_tables(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_TGW_ROUTE_TABLES, Vec::new()).await
    }

    async fn list_transit_gateway_vpc_attachments(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_TGW_VPC_ATTACHMENTS, Vec::new()).await
    }

    async fn list_transit_gateway_attachments(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_TGW_ATTACHMENTS, Vec::new()).await
    }

    async fn get_transit_gateway_routes(
        &self,
        route_table_id: &str,
    ) -> Result<Vec<Record>, CollectorError> {
        let mut params = vec![
            ("TransitGatewayRouteTableId".to_string(), route_table_id.to_string()),
            ("Filter.1.Name".to_string(), "state".to_string()),
        ];
        for (index, state) in TRANSIT_GATEWAY_ROUTE_STATES.iter().enumerate() {
            params.push((format!("Filter.1.Value.{}", index + 1), (*state).to_string()));
        }
        self.collect(&SEARCH_TGW_ROUTES, params).await
    }

    async fn list_load_balancers(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_LOAD_BALANCERS, Vec::new()).await
    }

    async fn list_target_groups(&self) -> Result<Vec<Record>, CollectorError> {
        self.collect(&DESCRIBE_TARGET_GROUPS, Vec::new()).await
    }

    async fn get_target_group_health(
        &self,
        target_group_arn: &str,
    ) -> Result<Vec<Record>, CollectorError> {
        let params = vec![("TargetGroupArn".to_string(), target_group_arn.to_string())];
        self.collect(&DESCRIBE_TARGET_HEALTH, params).await
    }
}
