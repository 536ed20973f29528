use serde::Deserialize;

/// Main configuration structure for Links-Benchmark
///
/// Every section is optional; missing keys fall back to the defaults the
/// benchmark has always used against a local nsqd.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub run: RunConfig,
}

/// Message queue (nsqd) connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct QueueConfig {
    /// Host running nsqd
    pub host: String,

    /// nsqd TCP port, used for consuming responses
    pub tcp_port: u16,

    /// nsqd HTTP port, used for publishing requests
    pub http_port: u16,

    /// Topic the links service consumes requests from
    pub request_topic: String,

    /// Topic the links service publishes responses to
    pub response_topic: String,

    /// Channel used to subscribe to the response topic
    pub channel: String,

    /// Number of unacknowledged messages nsqd may push at once
    pub max_in_flight: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            tcp_port: 4150,
            http_port: 4151,
            request_topic: "links".to_string(),
            response_topic: "links_out_".to_string(),
            channel: "links_test".to_string(),
            max_in_flight: 200,
        }
    }
}

impl QueueConfig {
    /// Address of the nsqd TCP listener
    pub fn tcp_address(&self) -> String {
        format!("{}:{}", self.host, self.tcp_port)
    }

    /// Base URL of the nsqd HTTP listener
    pub fn http_base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.http_port)
    }
}

/// Links service request shaping configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ServiceConfig {
    /// Address of the links service, written into the request line and Host header
    pub address: String,

    /// Client timeout hint sent as `X-Bn-Timeout`
    pub timeout_hint: String,

    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            address: "http://links:3000/".to_string(),
            timeout_hint: "5s".to_string(),
            user_agent: "links-benchmark".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory holding key indices and per-key result files
    pub results_dir: String,

    /// Path of the comparator's mismatch report
    pub mismatch_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results_dir: "results".to_string(),
            mismatch_path: "mismatches.txt".to_string(),
        }
    }
}

/// Benchmark run behavior
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RunConfig {
    /// Stop waiting for responses after this many idle seconds (0 waits forever)
    pub idle_timeout_secs: u64,
}
