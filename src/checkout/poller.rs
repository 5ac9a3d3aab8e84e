use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::types::PaymentStatusView;
use crate::checkout::backend::CheckoutBackend;
use crate::checkout::state::MSG_PAYMENT_REFUSED;
use crate::config::PollingConfig;
use crate::payments::types::TradeStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Succeeded { trade_no: String },
    Failed { message: String },
    TimedOut,
    Cancelled,
}

/// Polls the status route until the trade settles, the deadline passes or
/// the cancel flag flips to `true`.
#[derive(Debug, Clone, Copy)]
pub struct StatusPoller {
    config: PollingConfig,
}

impl StatusPoller {
    pub fn new(config: PollingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> PollingConfig {
        self.config
    }

    /// The first fetch fires immediately. Transport errors and non-2xx
    /// replies are skipped. `on_status` sees every status that was read.
    pub async fn run<F>(
        &self,
        backend: &dyn CheckoutBackend,
        out_trade_no: &str,
        mut cancel: watch::Receiver<bool>,
        mut on_status: F,
    ) -> PollOutcome
    where
        F: FnMut(&PaymentStatusView) + Send,
    {
        if *cancel.borrow_and_update() {
            return PollOutcome::Cancelled;
        }

        info!(
            out_trade_no = %out_trade_no,
            interval_ms = self.config.interval.as_millis() as u64,
            timeout_secs = self.config.timeout.as_secs(),
            "status polling started"
        );

        let deadline = Instant::now() + self.config.timeout;
        let mut ticker = time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempts: u32 = 0;

        loop {
            tokio::select! {
                biased;
                cancelled = cancelled(&mut cancel) => {
                    if cancelled {
                        info!(out_trade_no = %out_trade_no, attempts, "status polling cancelled");
                        return PollOutcome::Cancelled;
                    }
                }
                _ = time::sleep_until(deadline) => {
                    warn!(out_trade_no = %out_trade_no, attempts, "status polling timed out");
                    return PollOutcome::TimedOut;
                }
                _ = ticker.tick() => {
                    attempts += 1;
                    let fetch = time::timeout_at(deadline, backend.fetch_status(out_trade_no));
                    let result = tokio::select! {
                        biased;
                        cancelled = cancelled(&mut cancel) => {
                            if cancelled {
                                info!(out_trade_no = %out_trade_no, attempts, "status polling cancelled");
                                return PollOutcome::Cancelled;
                            }
                            continue;
                        }
                        result = fetch => result,
                    };

                    let view = match result {
                        Err(_) => {
                            warn!(out_trade_no = %out_trade_no, attempts, "status polling timed out");
                            return PollOutcome::TimedOut;
                        }
                        Ok(Err(e)) => {
                            debug!(out_trade_no = %out_trade_no, attempts, error = %e, "status poll skipped");
                            continue;
                        }
                        Ok(Ok(view)) => view,
                    };

                    on_status(&view);
                    if let Some(outcome) = settle(&view) {
                        info!(
                            out_trade_no = %out_trade_no,
                            attempts,
                            trade_status = ?view.trade_status,
                            "status polling finished"
                        );
                        return outcome;
                    }
                }
            }
        }
    }
}

/// Resolves once the flag changes. A dropped sender counts as cancellation
/// so the loop never spins on a closed channel.
async fn cancelled(cancel: &mut watch::Receiver<bool>) -> bool {
    match cancel.changed().await {
        Ok(()) => *cancel.borrow_and_update(),
        Err(_) => true,
    }
}

fn settle(view: &PaymentStatusView) -> Option<PollOutcome> {
    if view.trade_status == Some(TradeStatus::Success) {
        return Some(PollOutcome::Succeeded {
            trade_no: view.trade_no.clone(),
        });
    }

    let terminal = view.is_terminal || view.trade_status.is_some_and(|s| s.is_terminal());
    if terminal {
        let message = view
            .refuse_detail
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| MSG_PAYMENT_REFUSED.to_string());
        return Some(PollOutcome::Failed { message });
    }

    None
}
