//! Service dependency model

use crate::core::{
    command::Command,
    config::{ProbeMethod, ServiceConfig},
};
use anyhow::Result;
use std::time::Duration;

/// How a service's readiness is checked
#[derive(Debug, Clone)]
pub enum ReadinessProbe {
    /// HTTP request expecting a 2xx status
    Http { url: String, method: ProbeMethod },
    /// Command expecting exit code 0
    Command(Command),
}

impl ReadinessProbe {
    pub fn describe(&self) -> String {
        match self {
            ReadinessProbe::Http { url, method } => format!("{} {}", method.as_str(), url),
            ReadinessProbe::Command(command) => command.line.clone(),
        }
    }
}

/// A background service the script stage depends on
#[derive(Debug, Clone)]
pub struct ServiceDependency {
    pub name: String,
    pub start: Option<Command>,
    pub stop: Option<Command>,
    pub readiness: ReadinessProbe,
    pub timeout: Duration,
    pub interval: Duration,
}

impl ServiceDependency {
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let readiness = match (&config.readiness.http, &config.readiness.command) {
            (Some(http), _) => ReadinessProbe::Http {
                url: http.url.clone(),
                method: http.method,
            },
            (None, Some(command)) => ReadinessProbe::Command(command.to_command()?),
            (None, None) => {
                anyhow::bail!("Service '{}' declares no readiness check", config.name)
            }
        };

        Ok(Self {
            name: config.name.clone(),
            start: config.start.as_ref().map(|s| s.to_command()).transpose()?,
            stop: config.stop.as_ref().map(|s| s.to_command()).transpose()?,
            readiness,
            timeout: Duration::from_secs(config.timeout_secs),
            interval: Duration::from_secs(config.interval_secs),
        })
    }

    /// A service with only a readiness check, mostly for tests
    pub fn new(name: impl Into<String>, readiness: ReadinessProbe) -> Self {
        Self {
            name: name.into(),
            start: None,
            stop: None,
            readiness,
            timeout: Duration::from_secs(60),
            interval: Duration::from_secs(5),
        }
    }

    pub fn with_timing(mut self, timeout: Duration, interval: Duration) -> Self {
        self.timeout = timeout;
        self.interval = interval;
        self
    }

    pub fn with_start(mut self, start: Command) -> Self {
        self.start = Some(start);
        self
    }

    pub fn with_stop(mut self, stop: Command) -> Self {
        self.stop = Some(stop);
        self
    }
}
