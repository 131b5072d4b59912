#![allow(dead_code)]

use labscan::config::{
    ConfigFile, EndpointConfig, EndpointKind, RawConfigFile, ScanConfig, SchedulerSection,
    SweepConfig,
};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                scheduler: SchedulerSection::default(),
                endpoint: Vec::new(),
                scan: Vec::new(),
            },
        }
    }

    pub fn default_priority(mut self, priority: i32) -> Self {
        self.config.scheduler.default_priority = priority;
        self
    }

    pub fn with_endpoint(mut self, name: &str, kind: EndpointKind, initial: f64) -> Self {
        self.config.endpoint.push(EndpointConfig {
            name: name.to_string(),
            kind,
            initial,
            resolution: None,
        });
        self
    }

    pub fn with_scan(mut self, scan: ScanConfig) -> Self {
        self.config.scan.push(scan);
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one `[[scan]]` entry.
pub struct ScanConfigBuilder {
    scan: ScanConfig,
}

impl ScanConfigBuilder {
    pub fn new() -> Self {
        Self {
            scan: ScanConfig {
                name: None,
                priority: None,
                reset_param: false,
                silent: true,
                sweep: Vec::new(),
                measure: Vec::new(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.scan.name = Some(name.to_string());
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.scan.priority = Some(priority);
        self
    }

    pub fn reset_param(mut self, reset: bool) -> Self {
        self.scan.reset_param = reset;
        self
    }

    pub fn sweep(mut self, endpoint: &str, start: f64, stop: f64, n_points: usize) -> Self {
        self.scan.sweep.push(SweepConfig {
            endpoint: endpoint.to_string(),
            start,
            stop,
            n_points,
            delay_ms: 0,
            resetable: true,
        });
        self
    }

    pub fn measure(mut self, endpoint: &str) -> Self {
        self.scan.measure.push(endpoint.to_string());
        self
    }

    pub fn build(self) -> ScanConfig {
        self.scan
    }
}

impl Default for ScanConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
