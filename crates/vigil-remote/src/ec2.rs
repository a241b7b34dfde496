//! EC2-backed address resolver and compute controller.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_ec2::Client;
use aws_sdk_ec2::config::Region;
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::operation::describe_instances::DescribeInstancesOutput;
use tracing::{debug, info};

use vigil_core::{Controller, RemediationError, ResolveError, Resolver, TargetId};

/// Handle on the EC2 instances of one region.
#[derive(Clone)]
pub struct Ec2Fleet {
    client: Client,
}

impl Ec2Fleet {
    /// Load credentials from the default provider chain for `region`.
    pub async fn connect(region: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        info!(%region, "EC2 client configured");
        Self {
            client: Client::new(&config),
        }
    }
}

#[async_trait]
impl Resolver for Ec2Fleet {
    async fn resolve(&self, target_id: &TargetId) -> Result<Option<String>, ResolveError> {
        let output = self
            .client
            .describe_instances()
            .instance_ids(target_id.as_str())
            .send()
            .await
            .map_err(|e| ResolveError(DisplayErrorContext(&e).to_string()))?;

        let address = public_ip(&output);
        debug!(%target_id, address = ?address, "described instance");
        Ok(address)
    }
}

#[async_trait]
impl Controller for Ec2Fleet {
    async fn start(&self, target_id: &TargetId) -> Result<(), RemediationError> {
        self.client
            .start_instances()
            .instance_ids(target_id.as_str())
            .send()
            .await
            .map_err(|e| RemediationError::ControlPlane(DisplayErrorContext(&e).to_string()))?;
        info!(%target_id, "start request sent");
        Ok(())
    }

    async fn reboot(&self, target_id: &TargetId) -> Result<(), RemediationError> {
        self.client
            .reboot_instances()
            .instance_ids(target_id.as_str())
            .send()
            .await
            .map_err(|e| RemediationError::ControlPlane(DisplayErrorContext(&e).to_string()))?;
        info!(%target_id, "reboot request sent");
        Ok(())
    }
}

/// First public IPv4 address in a describe response. Stopped instances have none.
fn public_ip(output: &DescribeInstancesOutput) -> Option<String> {
    output
        .reservations()
        .iter()
        .flat_map(|r| r.instances())
        .find_map(|i| i.public_ip_address())
        .map(str::to_string)
}
