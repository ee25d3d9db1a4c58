use async_trait::async_trait;
use std::net::Ipv4Addr;
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::db::Store;
use crate::error::Result;
use crate::models::*;

/// Outcome of probing one address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub success: bool,
    pub output: String,
}

impl ProbeResult {
    fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Prober checks whether an address answers.
///
/// Probing never fails: I/O errors and timeouts come back as an
/// unsuccessful result carrying the reason.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, ip: &str) -> ProbeResult;
}

/// PingProber shells out to the system `ping`
pub struct PingProber {
    timeout: Duration,
}

impl PingProber {
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_secs.max(1)),
        }
    }
}

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, ip: &str) -> ProbeResult {
        if ip.parse::<Ipv4Addr>().is_err() {
            return ProbeResult::failed(format!("invalid IPv4 address: {}", ip));
        }

        let wait = self.timeout.as_secs().to_string();
        let child = Command::new("ping")
            .args(["-c", "1", "-W", wait.as_str(), ip])
            .kill_on_drop(true)
            .output();

        // ping enforces -W itself; the outer timeout covers a hung process
        match timeout(self.timeout + Duration::from_secs(1), child).await {
            Ok(Ok(output)) => {
                let text = if output.status.success() {
                    String::from_utf8_lossy(&output.stdout).trim().to_string()
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                    if stderr.is_empty() {
                        String::from_utf8_lossy(&output.stdout).trim().to_string()
                    } else {
                        stderr
                    }
                };
                ProbeResult {
                    success: output.status.success(),
                    output: text,
                }
            }
            Ok(Err(e)) => ProbeResult::failed(format!("failed to run ping: {}", e)),
            Err(_) => ProbeResult::failed(format!("timed out after {}s", self.timeout.as_secs())),
        }
    }
}

impl Store {
    /// Probe every equipment with an `ip1` address, one at a time.
    ///
    /// Each result is committed as soon as it is known, so an interrupted
    /// sweep keeps everything recorded so far.
    pub async fn sweep_reachability(&self, prober: &dyn Prober) -> Result<SweepSummary> {
        let mut tx = self.begin().await?;
        let equipment = tx.list_equipment().await?;
        drop(tx);

        let targets: Vec<(i64, String, String)> = equipment
            .into_iter()
            .filter_map(|e| {
                let ip = e.data(data_key::IP1)?.to_string();
                Some((e.id, e.name, ip))
            })
            .collect();

        let mut summary = SweepSummary::default();
        for (equipment_id, equipment_name, ip) in targets {
            let result = prober.probe(&ip).await;
            if !result.success {
                tracing::warn!(equipment_id, ip = %ip, "Equipment unreachable: {}", result.output);
            }

            let mut tx = self.begin().await?;
            let log = tx
                .insert_ping_log(&NewPingLog {
                    equipment_id,
                    equipment_name,
                    ip,
                    success: result.success,
                    output: result.output,
                })
                .await?;
            tx.commit().await?;

            summary.probed += 1;
            if log.success {
                summary.reachable += 1;
            } else {
                summary.unreachable += 1;
            }
            summary.results.push(log);
        }

        tracing::info!(
            probed = summary.probed,
            reachable = summary.reachable,
            unreachable = summary.unreachable,
            "Reachability sweep finished"
        );
        Ok(summary)
    }

    pub async fn list_ping_logs(&self, limit: i32) -> Result<Vec<PingLog>> {
        let mut tx = self.begin().await?;
        Ok(tx.list_ping_logs(limit.max(0)).await?)
    }

    pub async fn clear_ping_logs(&self) -> Result<u64> {
        let mut tx = self.begin().await?;
        let removed = tx.clear_ping_logs().await?;
        tx.commit().await?;
        tracing::info!(removed, "Cleared ping logs");
        Ok(removed)
    }
}
