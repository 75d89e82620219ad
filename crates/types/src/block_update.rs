use alloy_consensus::Transaction;
use alloy_eips::eip2718::Decodable2718;
use alloy_rpc_types_engine::ExecutionPayloadV3;

use crate::{
    DecodeError,
    aliases::{B256, BlockHash, BlockNumber, Bytes, TxEnvelope},
};

/// A block observed on the consensus layer, ready to be relayed to the engines.
///
/// Created by the fetch loop when it sees a new block number and consumed once by
/// the deliver loop.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockUpdate {
    pub payload: ExecutionPayloadV3,
    pub parent_beacon_root: B256,
    /// Blob versioned hashes of every blob-carrying transaction, in transaction order.
    pub versioned_hashes: Vec<B256>,
}

impl BlockUpdate {
    /// Builds an update, deriving the versioned hashes from the payload's transactions.
    ///
    /// Fails as a whole if any transaction cannot be decoded.
    pub fn new(payload: ExecutionPayloadV3, parent_beacon_root: B256) -> Result<Self, DecodeError> {
        let versioned_hashes =
            decode_versioned_hashes(&payload.payload_inner.payload_inner.transactions)?;
        Ok(Self { payload, parent_beacon_root, versioned_hashes })
    }

    pub fn block_number(&self) -> BlockNumber {
        self.payload.payload_inner.payload_inner.block_number
    }

    pub fn block_hash(&self) -> BlockHash {
        self.payload.payload_inner.payload_inner.block_hash
    }
}

/// Extracts the blob versioned hashes carried by EIP-2718 encoded transactions.
pub fn decode_versioned_hashes(transactions: &[Bytes]) -> Result<Vec<B256>, DecodeError> {
    let mut hashes = Vec::new();
    for (index, raw) in transactions.iter().enumerate() {
        let mut buf = raw.as_ref();
        let tx = TxEnvelope::decode_2718(&mut buf)
            .map_err(|e| DecodeError::InvalidTransaction { index, reason: e.to_string() })?;
        if !buf.is_empty() {
            return Err(DecodeError::InvalidTransaction {
                index,
                reason: format!("{} trailing bytes", buf.len()),
            });
        }
        if let Some(blob_hashes) = tx.blob_versioned_hashes() {
            hashes.extend_from_slice(blob_hashes);
        }
    }
    Ok(hashes)
}
