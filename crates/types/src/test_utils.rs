//! Fixtures shared by the relay's test suites.

use alloy_rpc_types_engine::{ExecutionPayloadV1, ExecutionPayloadV2, ExecutionPayloadV3};

use crate::aliases::{Address, B256, Bloom, Bytes, U256};

/// A Deneb payload with the given identity and transactions, every other field zeroed.
pub fn sample_payload(number: u64, hash: B256, transactions: Vec<Bytes>) -> ExecutionPayloadV3 {
    ExecutionPayloadV3 {
        blob_gas_used: 0,
        excess_blob_gas: 0,
        payload_inner: ExecutionPayloadV2 {
            payload_inner: ExecutionPayloadV1 {
                parent_hash: B256::ZERO,
                fee_recipient: Address::ZERO,
                state_root: B256::ZERO,
                receipts_root: B256::ZERO,
                logs_bloom: Bloom::ZERO,
                prev_randao: B256::ZERO,
                block_number: number,
                gas_limit: 30_000_000,
                gas_used: 0,
                timestamp: 1_700_000_000 + number * 12,
                extra_data: Bytes::new(),
                base_fee_per_gas: U256::from(7),
                block_hash: hash,
                transactions,
            },
            withdrawals: Vec::new(),
        },
    }
}
