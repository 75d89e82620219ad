//! The beacon REST representation of a block, as returned by
//! `GET /eth/v2/beacon/blocks/{block_id}`.
//!
//! Only the parts the relay needs are modelled: the parent beacon root and the
//! execution payload. Everything else in the envelope is ignored.

use alloy_eips::eip4895::Withdrawal;
use alloy_rpc_types_engine::{ExecutionPayloadV1, ExecutionPayloadV2, ExecutionPayloadV3};
use serde::{Deserialize, Serialize};

use crate::{
    DecodeError,
    aliases::{Address, B256, BlockHash, BlockNumber, BlockTimestamp, Bloom, Bytes, U256},
    quantity::{u64_hex_or_decimal, u256_hex_or_decimal},
};

/// Top level envelope: `{ "data": { "message": { ... } } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconBlockResponse {
    pub data: SignedBeaconBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedBeaconBlock {
    pub message: BeaconBlock,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconBlock {
    pub parent_root: B256,
    pub body: BeaconBlockBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconBlockBody {
    pub execution_payload: BeaconExecutionPayload,
}

/// Execution payload with the beacon API's snake_case field names and decimal
/// quantities. Convert to [`ExecutionPayloadV3`] before handing it to an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconExecutionPayload {
    pub parent_hash: B256,
    pub fee_recipient: Address,
    pub state_root: B256,
    pub receipts_root: B256,
    pub logs_bloom: Bloom,
    pub prev_randao: B256,
    #[serde(with = "u64_hex_or_decimal")]
    pub block_number: BlockNumber,
    #[serde(with = "u64_hex_or_decimal")]
    pub gas_limit: u64,
    #[serde(with = "u64_hex_or_decimal")]
    pub gas_used: u64,
    #[serde(with = "u64_hex_or_decimal")]
    pub timestamp: BlockTimestamp,
    pub extra_data: Bytes,
    #[serde(with = "u256_hex_or_decimal")]
    pub base_fee_per_gas: U256,
    pub block_hash: BlockHash,
    pub transactions: Vec<Bytes>,
    /// Absent before Capella.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub withdrawals: Option<Vec<BeaconWithdrawal>>,
    /// Absent before Deneb.
    #[serde(default, with = "u64_hex_or_decimal")]
    pub blob_gas_used: u64,
    #[serde(default, with = "u64_hex_or_decimal")]
    pub excess_blob_gas: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeaconWithdrawal {
    #[serde(with = "u64_hex_or_decimal")]
    pub index: u64,
    #[serde(with = "u64_hex_or_decimal")]
    pub validator_index: u64,
    pub address: Address,
    /// Gwei.
    #[serde(with = "u64_hex_or_decimal")]
    pub amount: u64,
}

impl From<BeaconWithdrawal> for Withdrawal {
    fn from(w: BeaconWithdrawal) -> Self {
        Withdrawal {
            index: w.index,
            validator_index: w.validator_index,
            address: w.address,
            amount: w.amount,
        }
    }
}

impl From<BeaconExecutionPayload> for ExecutionPayloadV3 {
    fn from(payload: BeaconExecutionPayload) -> Self {
        let withdrawals =
            payload.withdrawals.unwrap_or_default().into_iter().map(Withdrawal::from).collect();

        ExecutionPayloadV3 {
            payload_inner: ExecutionPayloadV2 {
                payload_inner: ExecutionPayloadV1 {
                    parent_hash: payload.parent_hash,
                    fee_recipient: payload.fee_recipient,
                    state_root: payload.state_root,
                    receipts_root: payload.receipts_root,
                    logs_bloom: payload.logs_bloom,
                    prev_randao: payload.prev_randao,
                    block_number: payload.block_number,
                    gas_limit: payload.gas_limit,
                    gas_used: payload.gas_used,
                    timestamp: payload.timestamp,
                    extra_data: payload.extra_data,
                    base_fee_per_gas: payload.base_fee_per_gas,
                    block_hash: payload.block_hash,
                    transactions: payload.transactions,
                },
                withdrawals,
            },
            blob_gas_used: payload.blob_gas_used,
            excess_blob_gas: payload.excess_blob_gas,
        }
    }
}

impl BeaconBlockResponse {
    /// Splits the envelope into the engine-facing payload and the parent beacon root.
    pub fn into_parts(self) -> (ExecutionPayloadV3, B256) {
        let message = self.data.message;
        (message.body.execution_payload.into(), message.parent_root)
    }
}

/// Decodes a raw beacon block response body.
pub fn decode_block_response(body: &[u8]) -> Result<(ExecutionPayloadV3, B256), DecodeError> {
    let response: BeaconBlockResponse = serde_json::from_slice(body)?;
    Ok(response.into_parts())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    const DENEB_BLOCK: &str = include_str!("../testdata/deneb_block.json");

    fn deneb_payload_json() -> serde_json::Value {
        let block: serde_json::Value = serde_json::from_str(DENEB_BLOCK).unwrap();
        block["data"]["message"]["body"]["execution_payload"].clone()
    }

    fn envelope(payload: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "data": {
                "message": {
                    "parent_root": B256::repeat_byte(0x11),
                    "body": { "execution_payload": payload }
                }
            }
        }))
        .unwrap()
    }

    #[test]
    fn decodes_deneb_block() {
        let (payload, parent_root) = decode_block_response(DENEB_BLOCK.as_bytes()).unwrap();
        let v1 = &payload.payload_inner.payload_inner;

        assert_eq!(
            v1.block_hash,
            B256::from_str("0x1873367cf106a66be0fc94c2165aeebab012dc7e896911b2c0ccfc4eb947e2be")
                .unwrap()
        );
        assert_eq!(
            parent_root,
            B256::from_str("0x5a4c1f0bf9e0d36e1b0d7a6c37b3cf4cd9e91d32b3e3b80bd8e0f3f6f0c1a2b3")
                .unwrap()
        );
        assert_eq!(v1.block_number, 19_426_587);
        assert_eq!(v1.gas_limit, 30_000_000);
        assert_eq!(v1.gas_used, 12_873_331);
        assert_eq!(v1.timestamp, 1_710_338_135);
        assert_eq!(v1.base_fee_per_gas, U256::from(41_289_731_457u64));
        assert_eq!(v1.extra_data.as_ref(), b"beaverbuild.org");
        assert_eq!(v1.transactions.len(), 1);
        assert_eq!(v1.logs_bloom, Bloom::ZERO);

        let withdrawals = &payload.payload_inner.withdrawals;
        assert_eq!(withdrawals.len(), 2);
        assert_eq!(withdrawals[0].index, 38_273_910);
        assert_eq!(withdrawals[1].validator_index, 1_032_513);
        assert_eq!(withdrawals[1].amount, 18_601);

        assert_eq!(payload.blob_gas_used, 393_216);
        assert_eq!(payload.excess_blob_gas, 79_167_488);
    }

    #[test]
    fn missing_withdrawals_and_blob_gas_default_to_empty() {
        let mut payload = deneb_payload_json();
        let object = payload.as_object_mut().unwrap();
        object.remove("withdrawals");
        object.remove("blob_gas_used");
        object.remove("excess_blob_gas");

        let (payload, parent_root) = decode_block_response(&envelope(payload)).unwrap();
        assert!(payload.payload_inner.withdrawals.is_empty());
        assert_eq!(payload.blob_gas_used, 0);
        assert_eq!(payload.excess_blob_gas, 0);
        assert_eq!(parent_root, B256::repeat_byte(0x11));
    }

    #[test]
    fn null_withdrawals_are_empty() {
        let mut payload = deneb_payload_json();
        payload["withdrawals"] = serde_json::Value::Null;

        let (payload, _) = decode_block_response(&envelope(payload)).unwrap();
        assert!(payload.payload_inner.withdrawals.is_empty());
    }

    #[test]
    fn hex_quantities_are_accepted() {
        let mut payload = deneb_payload_json();
        payload["block_number"] = "0x10".into();
        payload["base_fee_per_gas"] = "0x3b9aca00".into();

        let (payload, _) = decode_block_response(&envelope(payload)).unwrap();
        let v1 = &payload.payload_inner.payload_inner;
        assert_eq!(v1.block_number, 16);
        assert_eq!(v1.base_fee_per_gas, U256::from(1_000_000_000u64));
    }

    #[test]
    fn rejects_malformed_envelopes() {
        assert!(matches!(decode_block_response(b"not json"), Err(DecodeError::Json(_))));

        let mut payload = deneb_payload_json();
        payload["block_hash"] = "0x1234".into();
        assert!(decode_block_response(&envelope(payload)).is_err());

        let mut payload = deneb_payload_json();
        payload.as_object_mut().unwrap().remove("transactions");
        assert!(decode_block_response(&envelope(payload)).is_err());
    }
}
