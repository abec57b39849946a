//! Relay thresholds for unconfirmed transactions.

use shared_types::Transaction;

/// A transaction is relayed only when its fee reaches both the absolute
/// minimum and the per-byte minimum for its encoded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeThresholds {
    pub min_fee: u64,
    pub min_fee_per_byte: u64,
}

impl FeeThresholds {
    pub fn has_minimum_fee(&self, tx: &Transaction) -> bool {
        tx.fee >= self.min_fee
    }

    pub fn has_minimum_fee_per_byte(&self, tx: &Transaction) -> bool {
        let required = (tx.size() as u64).saturating_mul(self.min_fee_per_byte);
        tx.fee >= required
    }

    pub fn accepts(&self, tx: &Transaction) -> bool {
        self.has_minimum_fee(tx) && self.has_minimum_fee_per_byte(tx)
    }
}

impl Default for FeeThresholds {
    fn default() -> Self {
        Self {
            min_fee: 100_000_000,
            min_fee_per_byte: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{TransactionSignature, TransactionType, SIGNATURE_LENGTH};

    fn tx(fee: u64, data_len: usize) -> Transaction {
        Transaction {
            signature: TransactionSignature([1; SIGNATURE_LENGTH]),
            tx_type: TransactionType::Payment,
            fee,
            timestamp: 0,
            data: vec![0; data_len],
        }
    }

    #[test]
    fn test_absolute_minimum() {
        let fees = FeeThresholds {
            min_fee: 10,
            min_fee_per_byte: 0,
        };
        assert!(fees.accepts(&tx(10, 0)));
        assert!(!fees.accepts(&tx(9, 0)));
    }

    #[test]
    fn test_per_byte_minimum_grows_with_size() {
        let fees = FeeThresholds {
            min_fee: 0,
            min_fee_per_byte: 2,
        };
        let small = tx(2 * Transaction::BASE_LENGTH as u64, 0);
        assert!(fees.accepts(&small));

        let large = tx(2 * Transaction::BASE_LENGTH as u64, 100);
        assert!(fees.has_minimum_fee(&large));
        assert!(!fees.has_minimum_fee_per_byte(&large));
    }
}
