//! SDK-backed implementations of the adapter traits. Each bridges into the
//! current multi-threaded tokio runtime with `block_in_place`.

use std::collections::HashMap;

use aws_config::BehaviorVersion;
use aws_sdk_costexplorer::types::{
    DateInterval, Granularity, GroupDefinition, GroupDefinitionType,
};
use aws_sdk_ec2::types::Filter;
use aws_sdk_lambda::types::InvocationType;
use aws_types::region::Region as AwsRegion;
use aws_types::SdkConfig;
use chrono::{DateTime, Utc};
use cpu_load_core::contract::RemoteCommandRequest;
use cpu_load_core::cost::{CostRow, DateRange, COST_METRIC, SERVICE_DIMENSION};
use cpu_load_core::stale::{AddressRecord, SnapshotRecord, VolumeRecord};
use cpu_load_core::targets::Region;

use crate::adapters::command::CommandSender;
use crate::adapters::cost::CostSource;
use crate::adapters::inventory::ResourceInventory;
use crate::adapters::invoke::AnalysisInvoker;
use crate::adapters::object_store::ReportStore;

/// Loads the default credential chain, pinned to `region` when given.
pub async fn load_sdk_config(region: Option<&str>) -> SdkConfig {
    let loader = aws_config::defaults(BehaviorVersion::latest());
    match region {
        Some(region) => loader.region(AwsRegion::new(region.to_string())).load().await,
        None => loader.load().await,
    }
}

/// SSM client settings for one request: shared credentials, the request's
/// region.
fn ssm_config_for(sdk_config: &SdkConfig, region: &Region) -> aws_sdk_ssm::Config {
    aws_sdk_ssm::config::Builder::from(sdk_config)
        .region(AwsRegion::new(region.as_str().to_string()))
        .build()
}

/// Sends each request to SSM in the request's own region.
pub struct SsmCommandSender {
    sdk_config: SdkConfig,
}

impl SsmCommandSender {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            sdk_config: config.clone(),
        }
    }
}

impl CommandSender for SsmCommandSender {
    fn send_command(&self, request: &RemoteCommandRequest) -> Result<String, String> {
        let client =
            aws_sdk_ssm::Client::from_conf(ssm_config_for(&self.sdk_config, &request.region));
        let instance_ids = request.targets.as_slice().to_vec();
        let parameters: HashMap<String, Vec<String>> = request
            .parameters
            .iter()
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect();
        let document_name = request.document_name.clone();
        let comment = request.comment.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .send_command()
                    .document_name(document_name)
                    .comment(comment)
                    .set_instance_ids(Some(instance_ids))
                    .set_parameters(Some(parameters))
                    .send()
                    .await
                    .map_err(|error| format!("failed to send command: {error}"))?;

                output
                    .command()
                    .and_then(|command| command.command_id())
                    .map(str::to_string)
                    .ok_or_else(|| "send command response carried no command id".to_string())
            })
        })
    }
}

pub struct S3ReportStore {
    s3_client: aws_sdk_s3::Client,
}

impl S3ReportStore {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            s3_client: aws_sdk_s3::Client::new(config),
        }
    }
}

impl ReportStore for S3ReportStore {
    fn read_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, String> {
        let bucket = bucket.trim().to_string();
        let object_key = key.trim().to_string();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .get_object()
                    .bucket(bucket)
                    .key(object_key)
                    .send()
                    .await
                    .map_err(|error| format!("failed to read object from s3: {error}"))?;
                output
                    .body
                    .collect()
                    .await
                    .map(|bytes| bytes.into_bytes().to_vec())
                    .map_err(|error| format!("failed to read s3 object body: {error}"))
            })
        })
    }
}

pub struct LambdaAnalysisInvoker {
    lambda_client: aws_sdk_lambda::Client,
}

impl LambdaAnalysisInvoker {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            lambda_client: aws_sdk_lambda::Client::new(config),
        }
    }
}

impl AnalysisInvoker for LambdaAnalysisInvoker {
    fn invoke_analysis(&self, function_name: &str) -> Result<Vec<u8>, String> {
        let client = self.lambda_client.clone();
        let function_name = function_name.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .invoke()
                    .function_name(function_name)
                    .invocation_type(InvocationType::RequestResponse)
                    .send()
                    .await
                    .map_err(|error| format!("failed to invoke analysis lambda: {error}"))?;

                let payload = output
                    .payload()
                    .map(|blob| blob.as_ref().to_vec())
                    .unwrap_or_default();
                if let Some(function_error) = output.function_error() {
                    return Err(format!(
                        "analysis lambda reported {function_error}: {}",
                        String::from_utf8_lossy(&payload)
                    ));
                }
                Ok(payload)
            })
        })
    }
}

pub struct CostExplorerSource {
    ce_client: aws_sdk_costexplorer::Client,
}

impl CostExplorerSource {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            ce_client: aws_sdk_costexplorer::Client::new(config),
        }
    }
}

impl CostSource for CostExplorerSource {
    fn daily_cost_by_service(&self, range: &DateRange) -> Result<Vec<CostRow>, String> {
        let client = self.ce_client.clone();
        let (start, end) = range.api_bounds();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let interval = DateInterval::builder()
                    .start(start)
                    .end(end)
                    .build()
                    .map_err(|error| format!("invalid cost explorer interval: {error}"))?;
                let group_by = GroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key(SERVICE_DIMENSION)
                    .build();

                let mut rows = Vec::new();
                let mut next_page_token: Option<String> = None;
                loop {
                    let output = client
                        .get_cost_and_usage()
                        .time_period(interval.clone())
                        .granularity(Granularity::Daily)
                        .metrics(COST_METRIC)
                        .group_by(group_by.clone())
                        .set_next_page_token(next_page_token.take())
                        .send()
                        .await
                        .map_err(|error| format!("failed to query cost explorer: {error}"))?;

                    for result in output.results_by_time() {
                        let date = result
                            .time_period()
                            .map(|period| period.start().to_string())
                            .unwrap_or_default();
                        for group in result.groups() {
                            let Some(service) = group.keys().first() else {
                                continue;
                            };
                            let cost = group
                                .metrics()
                                .and_then(|metrics| metrics.get(COST_METRIC))
                                .and_then(|metric| metric.amount())
                                .and_then(|amount| amount.parse::<f64>().ok())
                                .unwrap_or(0.0);
                            rows.push(CostRow {
                                date: date.clone(),
                                service: service.clone(),
                                cost,
                            });
                        }
                    }

                    match output.next_page_token() {
                        Some(token) if !token.is_empty() => {
                            next_page_token = Some(token.to_string())
                        }
                        _ => break,
                    }
                }
                Ok(rows)
            })
        })
    }
}

fn to_utc(at: Option<&aws_sdk_ec2::primitives::DateTime>) -> Option<DateTime<Utc>> {
    at.and_then(|at| DateTime::<Utc>::from_timestamp(at.secs(), at.subsec_nanos()))
}

fn size_gib(size: Option<i32>) -> u64 {
    size.and_then(|size| u64::try_from(size).ok()).unwrap_or(0)
}

pub struct Ec2ResourceInventory {
    ec2_client: aws_sdk_ec2::Client,
    region: String,
}

impl Ec2ResourceInventory {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            ec2_client: aws_sdk_ec2::Client::new(config),
            region: config
                .region()
                .map(|region| region.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}

impl ResourceInventory for Ec2ResourceInventory {
    fn region(&self) -> String {
        self.region.clone()
    }

    fn unattached_volumes(&self) -> Result<Vec<VolumeRecord>, String> {
        let client = self.ec2_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let filter = Filter::builder().name("status").values("available").build();
                let mut volumes = Vec::new();
                let mut next_token: Option<String> = None;
                loop {
                    let output = client
                        .describe_volumes()
                        .filters(filter.clone())
                        .set_next_token(next_token.take())
                        .send()
                        .await
                        .map_err(|error| format!("failed to describe volumes: {error}"))?;

                    volumes.extend(output.volumes().iter().map(|volume| VolumeRecord {
                        volume_id: volume.volume_id().unwrap_or_default().to_string(),
                        size_gib: size_gib(volume.size()),
                        created_at: to_utc(volume.create_time()),
                    }));

                    match output.next_token() {
                        Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                        _ => break,
                    }
                }
                Ok(volumes)
            })
        })
    }

    fn addresses(&self) -> Result<Vec<AddressRecord>, String> {
        let client = self.ec2_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let output = client
                    .describe_addresses()
                    .send()
                    .await
                    .map_err(|error| format!("failed to describe addresses: {error}"))?;

                Ok(output
                    .addresses()
                    .iter()
                    .map(|address| AddressRecord {
                        public_ip: address.public_ip().unwrap_or_default().to_string(),
                        allocation_id: address.allocation_id().map(str::to_string),
                        domain: address.domain().map(|domain| domain.as_str().to_string()),
                        instance_id: address.instance_id().map(str::to_string),
                    })
                    .collect())
            })
        })
    }

    fn owned_snapshots(&self) -> Result<Vec<SnapshotRecord>, String> {
        let client = self.ec2_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut snapshots = Vec::new();
                let mut next_token: Option<String> = None;
                loop {
                    let output = client
                        .describe_snapshots()
                        .owner_ids("self")
                        .set_next_token(next_token.take())
                        .send()
                        .await
                        .map_err(|error| format!("failed to describe snapshots: {error}"))?;

                    snapshots.extend(output.snapshots().iter().map(|snapshot| SnapshotRecord {
                        snapshot_id: snapshot.snapshot_id().unwrap_or_default().to_string(),
                        volume_id: snapshot.volume_id().map(str::to_string),
                        started_at: to_utc(snapshot.start_time()),
                        state: snapshot.state().map(|state| state.as_str().to_string()),
                        size_gib: size_gib(snapshot.volume_size()),
                    }));

                    match output.next_token() {
                        Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                        _ => break,
                    }
                }
                Ok(snapshots)
            })
        })
    }
}
