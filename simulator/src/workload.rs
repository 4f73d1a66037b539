//! Operation workloads for the simulator.

use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;

/// A named mix of ledger operations.
#[derive(Debug, Clone, Copy)]
pub enum Workload {
    /// Every worker deposits a fixed amount into one shared account.
    /// The closing balance must equal workers * operations * 1.00.
    ConvergingDeposits,
    /// Opposite-direction transfers inside account pairs. Conserves
    /// the total balance exactly.
    ContendedTransfers,
    /// Random mix of deposits, withdrawals, and transfers.
    Mixed,
}

/// One ledger operation to execute, by account index.
#[derive(Debug, Clone, Copy)]
pub enum Op {
    Deposit { account: usize, amount: Decimal },
    Withdraw { account: usize, amount: Decimal },
    Transfer {
        source: usize,
        dest: usize,
        amount: Decimal,
    },
}

impl Workload {
    /// Load a workload by name.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        match name {
            "converging-deposits" => Ok(Self::ConvergingDeposits),
            "contended-transfers" => Ok(Self::ContendedTransfers),
            "mixed" => Ok(Self::Mixed),
            _ => Err(anyhow::anyhow!("Unknown workload: {}", name)),
        }
    }

    /// Whether the workload conserves the total balance across all
    /// accounts, making conservation part of the final audit.
    pub fn conserves_total(&self) -> bool {
        matches!(self, Self::ContendedTransfers)
    }

    /// Pick the next operation for a worker. `accounts` is the number
    /// of open accounts; indexes returned are always in range.
    pub fn next_op(&self, rng: &mut StdRng, accounts: usize) -> Op {
        match self {
            Self::ConvergingDeposits => Op::Deposit {
                account: 0,
                amount: Decimal::new(100, 2),
            },
            Self::ContendedTransfers => {
                // Pair accounts (0,1), (2,3), ... and bounce transfers
                // in both directions inside each pair.
                let pair = rng.gen_range(0..accounts / 2);
                let (a, b) = (pair * 2, pair * 2 + 1);
                let (source, dest) = if rng.gen_bool(0.5) { (a, b) } else { (b, a) };
                Op::Transfer {
                    source,
                    dest,
                    amount: Decimal::new(rng.gen_range(1..2_000), 2),
                }
            }
            Self::Mixed => {
                let amount = Decimal::new(rng.gen_range(1..5_000), 2);
                match rng.gen_range(0..100) {
                    0..=39 => Op::Deposit {
                        account: rng.gen_range(0..accounts),
                        amount,
                    },
                    40..=69 => Op::Withdraw {
                        account: rng.gen_range(0..accounts),
                        amount,
                    },
                    _ => {
                        let source = rng.gen_range(0..accounts);
                        let mut dest = rng.gen_range(0..accounts);
                        if dest == source {
                            dest = (dest + 1) % accounts;
                        }
                        Op::Transfer {
                            source,
                            dest,
                            amount,
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_load_known_workloads() {
        assert!(Workload::load("mixed").is_ok());
        assert!(Workload::load("contended-transfers").is_ok());
        assert!(Workload::load("converging-deposits").is_ok());
        assert!(Workload::load("nope").is_err());
    }

    #[test]
    fn test_mixed_indexes_stay_in_range() {
        let workload = Workload::Mixed;
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..1_000 {
            match workload.next_op(&mut rng, 4) {
                Op::Deposit { account, .. } | Op::Withdraw { account, .. } => {
                    assert!(account < 4)
                }
                Op::Transfer { source, dest, .. } => {
                    assert!(source < 4);
                    assert!(dest < 4);
                    assert_ne!(source, dest);
                }
            }
        }
    }

    #[test]
    fn test_contended_transfers_stay_inside_pairs() {
        let workload = Workload::ContendedTransfers;
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            match workload.next_op(&mut rng, 6) {
                Op::Transfer { source, dest, .. } => {
                    assert_eq!(source / 2, dest / 2);
                    assert_ne!(source, dest);
                }
                other => panic!("unexpected op {:?}", other),
            }
        }
    }
}
