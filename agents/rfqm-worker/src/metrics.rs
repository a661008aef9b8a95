use std::time::UNIX_EPOCH;

use prometheus::{
    opts, register_int_counter_vec_with_registry, register_int_gauge_vec_with_registry, Encoder,
    IntCounterVec, IntGaugeVec, Registry,
};

use rfqm_core::{JobKind, JobStatus, SubmissionType};

const METRICS_NAMESPACE: &str = "rfqm_worker";

fn namespaced(name: &str) -> String {
    format!("{}_{}", METRICS_NAMESPACE, name)
}

/// Prometheus metrics for the worker pipeline.
#[derive(Clone)]
pub struct WorkerMetrics {
    registry: Registry,
    /// Jobs reaching a terminal status, labelled by kind and status.
    job_outcomes: IntCounterVec,
    /// Broadcasts sent to the network, labelled by submission type.
    transaction_submissions: IntCounterVec,
    /// Fee-escalated replacements, labelled by submission type.
    gas_escalations: IntCounterVec,
    /// Last-look declines, labelled by chain.
    maker_declines: IntCounterVec,
    /// Liveness of each worker slot as a timestamp since the epoch.
    task_liveness: IntGaugeVec,
}

impl WorkerMetrics {
    pub fn new(registry: Registry) -> eyre::Result<Self> {
        let job_outcomes = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("job_outcomes"),
                "The number of jobs that reached a terminal status",
            ),
            &["kind", "status"],
            registry.clone()
        )?;
        let transaction_submissions = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("transaction_submissions"),
                "The number of transactions broadcast to the network",
            ),
            &["submission_type"],
            registry.clone()
        )?;
        let gas_escalations = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("gas_escalations"),
                "The number of fee-escalated resubmissions",
            ),
            &["submission_type"],
            registry.clone()
        )?;
        let maker_declines = register_int_counter_vec_with_registry!(
            opts!(
                namespaced("maker_declines"),
                "The number of last-look declines",
            ),
            &["chain_id"],
            registry.clone()
        )?;
        let task_liveness = register_int_gauge_vec_with_registry!(
            opts!(
                namespaced("task_liveness"),
                "The liveness of each worker slot, expressed as a timestamp since the epoch",
            ),
            &["worker_index"],
            registry.clone()
        )?;
        Ok(Self {
            registry,
            job_outcomes,
            transaction_submissions,
            gas_escalations,
            maker_declines,
            task_liveness,
        })
    }

    pub fn record_job_outcome(&self, kind: JobKind, status: JobStatus) {
        self.job_outcomes
            .with_label_values(&[&kind.to_string(), &status.to_string()])
            .inc();
    }

    pub fn record_transaction_submission(&self, submission_type: SubmissionType) {
        self.transaction_submissions
            .with_label_values(&[&submission_type.to_string()])
            .inc();
    }

    pub fn record_gas_escalation(&self, submission_type: SubmissionType) {
        self.gas_escalations
            .with_label_values(&[&submission_type.to_string()])
            .inc();
    }

    pub fn record_maker_decline(&self, chain_id: u64) {
        self.maker_declines
            .with_label_values(&[&chain_id.to_string()])
            .inc();
    }

    pub fn update_liveness_metric(&self, worker_index: u32) {
        self.task_liveness
            .with_label_values(&[&worker_index.to_string()])
            .set(
                UNIX_EPOCH
                    .elapsed()
                    .map(|d| d.as_secs() as i64)
                    .unwrap_or(0),
            );
    }

    pub fn gather(&self) -> prometheus::Result<Vec<u8>> {
        let collected_metrics = self.registry.gather();
        let mut out_buf = Vec::with_capacity(1024 * 64);
        let encoder = prometheus::TextEncoder::new();
        encoder.encode(&collected_metrics, &mut out_buf)?;
        Ok(out_buf)
    }

    #[cfg(test)]
    pub fn dummy_instance() -> Self {
        let instance = Self::new(Registry::new());
        instance.expect("worker metrics with a fresh registry")
    }
}
