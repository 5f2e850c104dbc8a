//! Immutable pipeline configuration
//!
//! Assembled once at process start and shared read-only by every run.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Name used for the simulated VM when no resource name is configured
pub const SIMULATED_VM_NAME: &str = "sample-vm";

/// Kind of cloud resource being monitored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    WebApp,
    AiAccount,
    VirtualMachine,
    /// Full resource id supplied directly
    Explicit,
}

impl ResourceKind {
    /// Map a free-form resource type to a kind
    pub fn parse(resource_type: &str) -> Result<Self, ConfigError> {
        let normalized = resource_type.trim().to_lowercase();
        match normalized.as_str() {
            "webapp" | "web_app" | "app" | "site" => Ok(ResourceKind::WebApp),
            "foundry" | "cognitive" | "ai" | "aiplatform" => Ok(ResourceKind::AiAccount),
            "virtualmachine" | "virtual_machine" | "vm" => Ok(ResourceKind::VirtualMachine),
            other
                if ["compute", "virtualmach", "microsoft.compute"]
                    .iter()
                    .any(|k| other.contains(k)) =>
            {
                Ok(ResourceKind::VirtualMachine)
            }
            _ => Err(ConfigError::UnsupportedResourceType(normalized)),
        }
    }

    fn provider_path(&self) -> &'static str {
        match self {
            ResourceKind::WebApp => "Microsoft.Web/sites",
            ResourceKind::AiAccount => "Microsoft.AIPlatform/accounts",
            ResourceKind::VirtualMachine => "Microsoft.Compute/virtualMachines",
            ResourceKind::Explicit => "",
        }
    }
}

/// Resolved reference to the monitored resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Full ARM resource id
    pub id: String,
    /// Short resource name used in messages
    pub name: String,
    pub kind: ResourceKind,
}

impl ResourceRef {
    /// Resolve a resource reference from its parts
    ///
    /// A `name` that already is a full `/subscriptions/...` id is used as-is.
    pub fn resolve(
        subscription: &str,
        resource_group: &str,
        name: &str,
        resource_type: &str,
    ) -> Result<Self, ConfigError> {
        let name = name.trim();
        if name.to_lowercase().starts_with("/subscriptions/") {
            let short = name
                .trim_end_matches('/')
                .rsplit('/')
                .next()
                .unwrap_or_default();
            return Ok(Self {
                id: name.to_string(),
                name: display_name(short),
                kind: ResourceKind::Explicit,
            });
        }

        let kind = ResourceKind::parse(resource_type)?;
        let id = format!(
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}",
            subscription.trim(),
            resource_group.trim(),
            kind.provider_path(),
            name
        );

        Ok(Self {
            id,
            name: display_name(name),
            kind,
        })
    }

    /// Resource used when nothing is configured (simulation only)
    pub fn simulated() -> Self {
        Self {
            id: String::new(),
            name: SIMULATED_VM_NAME.to_string(),
            kind: ResourceKind::VirtualMachine,
        }
    }
}

fn display_name(name: &str) -> String {
    if name.is_empty() {
        SIMULATED_VM_NAME.to_string()
    } else {
        name.to_string()
    }
}

/// Thresholds for the anomaly rule table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionThresholds {
    /// CPU anomaly when value is above this
    pub cpu_above: f64,
    /// Memory anomaly when value is below this
    pub memory_below: f64,
    /// Disk anomaly when value is above this
    pub disk_above: f64,
}

impl Default for DetectionThresholds {
    fn default() -> Self {
        Self {
            cpu_above: 75.0,
            memory_below: 1e9,
            disk_above: 5e7,
        }
    }
}

/// Thresholds for the recommendation rule table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    pub cpu_resize_above: f64,
    pub cpu_restart_above: f64,
    pub memory_resize_below: f64,
    pub disk_cleanup_above: f64,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            cpu_resize_above: 80.0,
            cpu_restart_above: 60.0,
            memory_resize_below: 1e9,
            disk_cleanup_above: 5e7,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub detection: DetectionThresholds,
    pub recommendation: RecommendationThresholds,
}

impl Thresholds {
    /// Reject non-finite values and an inverted CPU band
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [
            ("detection.cpu_above", self.detection.cpu_above),
            ("detection.memory_below", self.detection.memory_below),
            ("detection.disk_above", self.detection.disk_above),
            ("recommendation.cpu_resize_above", self.recommendation.cpu_resize_above),
            ("recommendation.cpu_restart_above", self.recommendation.cpu_restart_above),
            ("recommendation.memory_resize_below", self.recommendation.memory_resize_below),
            ("recommendation.disk_cleanup_above", self.recommendation.disk_cleanup_above),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(ConfigError::InvalidThreshold {
                    name,
                    reason: format!("{} is not a finite number", value),
                });
            }
        }

        if self.recommendation.cpu_restart_above > self.recommendation.cpu_resize_above {
            return Err(ConfigError::InvalidThreshold {
                name: "recommendation.cpu_restart_above",
                reason: format!(
                    "{} exceeds cpu_resize_above {}",
                    self.recommendation.cpu_restart_above, self.recommendation.cpu_resize_above
                ),
            });
        }

        Ok(())
    }
}

/// Read-only configuration consumed by every pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub resource: ResourceRef,
    /// Metric names evaluated by the detector, in order
    pub metrics: Vec<String>,
    /// Report actions without executing them
    pub dry_run: bool,
    pub thresholds: Thresholds,
}

impl PipelineConfig {
    pub fn new(resource: ResourceRef, metrics: Vec<String>) -> Self {
        Self {
            resource,
            metrics,
            dry_run: true,
            thresholds: Thresholds::default(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }
}
