//! Simulation runner: spawns workers against one shared engine and
//! audits the ledger afterwards.

use std::sync::Arc;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_decimal::Decimal;
use tracing::{error, info};

use teller_common::{format_amount, CustomerId};
use teller_ledger::{LedgerEngine, MemoryStore};

use crate::metrics::{SimulationMetrics, SimulationReport};
use crate::workload::{Op, Workload};

pub struct SimulationRunner {
    accounts: usize,
    workers: usize,
    operations: usize,
    opening_balance: Decimal,
    seed: Option<u64>,
}

impl SimulationRunner {
    pub fn new(
        accounts: usize,
        workers: usize,
        operations: usize,
        opening_balance: Decimal,
        seed: Option<u64>,
    ) -> Self {
        Self {
            accounts,
            workers,
            operations,
            opening_balance,
            seed,
        }
    }

    pub async fn run(&self, workload: Workload) -> anyhow::Result<SimulationReport> {
        if self.accounts < 2 {
            anyhow::bail!("need at least 2 accounts");
        }

        let store = Arc::new(MemoryStore::new());
        let engine = Arc::new(LedgerEngine::new(store.clone()));

        let mut ids = Vec::with_capacity(self.accounts);
        for i in 0..self.accounts {
            let account = engine
                .open_account(CustomerId::new("sim"), format!("Account {}", i))
                .await?;
            if self.opening_balance > Decimal::ZERO {
                engine
                    .deposit(account.id, self.opening_balance, Some("Opening balance".into()))
                    .await?;
            }
            ids.push(account.id);
        }
        let opening_total = store.total_balance();
        info!(
            accounts = self.accounts,
            workers = self.workers,
            operations = self.operations,
            "Simulation starting"
        );

        let ids = Arc::new(ids);
        let mut handles = Vec::with_capacity(self.workers);
        for worker in 0..self.workers {
            let engine = engine.clone();
            let ids = ids.clone();
            let operations = self.operations;
            let mut rng = match self.seed {
                Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(worker as u64)),
                None => StdRng::from_entropy(),
            };
            handles.push(tokio::spawn(async move {
                let mut metrics = SimulationMetrics::new();
                for _ in 0..operations {
                    let op = workload.next_op(&mut rng, ids.len());
                    let started = Instant::now();
                    let outcome = match op {
                        Op::Deposit { account, amount } => {
                            engine.deposit(ids[account], amount, None).await.map(|_| ())
                        }
                        Op::Withdraw { account, amount } => {
                            engine.withdraw(ids[account], amount, None).await.map(|_| ())
                        }
                        Op::Transfer {
                            source,
                            dest,
                            amount,
                        } => engine
                            .transfer(ids[source], ids[dest], amount, None)
                            .await
                            .map(|_| ()),
                    };
                    match outcome {
                        Ok(()) => {
                            metrics.record_success(started.elapsed().as_micros() as u64)
                        }
                        Err(err) => metrics.record_failure(err.error_code()),
                    }
                }
                metrics
            }));
        }

        let mut metrics = SimulationMetrics::new();
        for handle in handles {
            metrics.merge(handle.await?);
        }

        // Final audit: every account must replay from its journal, and
        // conserving workloads must leave the total untouched.
        let mut consistent = true;
        for id in ids.iter() {
            if let Err(err) = engine.verify_account(*id) {
                error!(account = %id, error = %err, "Account audit failed");
                consistent = false;
            }
        }
        let closing_total = store.total_balance();
        if workload.conserves_total() && closing_total != opening_total {
            error!(
                opening = %opening_total,
                closing = %closing_total,
                "Total balance not conserved"
            );
            consistent = false;
        }

        info!(
            successes = metrics.successes,
            failures = metrics.failures,
            consistent,
            "Simulation finished"
        );

        Ok(SimulationReport {
            total_ops: metrics.total_ops,
            successes: metrics.successes,
            failures: metrics.failures,
            failures_by_code: metrics.failures_by_code(),
            average_latency_us: metrics.average_latency_us(),
            p50_latency_us: metrics.p50_latency_us(),
            p99_latency_us: metrics.p99_latency_us(),
            opening_total: format_amount(opening_total),
            closing_total: format_amount(closing_total),
            journal_entries: store.journal_len(),
            consistent,
        })
    }
}
