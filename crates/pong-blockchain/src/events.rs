use alloy::{
    primitives::B256,
    rpc::types::Log,
    sol_types::SolEvent,
};

use crate::{PingPong, error::BlockchainError};

/// Event kinds emitted by the PingPong contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Ping,
    Pong,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Ping => "Ping",
            EventKind::Pong => "Pong",
        }
    }

    pub fn signature_hash(&self) -> B256 {
        match self {
            EventKind::Ping => PingPong::Ping::SIGNATURE_HASH,
            EventKind::Pong => PingPong::Pong::SIGNATURE_HASH,
        }
    }
}

/// A `Ping()` occurrence. The request is identified by the hash of the
/// transaction that emitted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestEvent {
    pub id: B256,
    pub block_number: u64,
    pub log_index: u64,
}

impl RequestEvent {
    /// Strict decode: the log must match the `Ping` signature and carry its
    /// position in the chain.
    pub fn from_log(log: &Log) -> Result<Self, BlockchainError> {
        PingPong::Ping::decode_log(log.as_ref()).map_err(|e| BlockchainError::Decode {
            event: EventKind::Ping.as_str(),
            reason: e.to_string(),
        })?;

        let missing = |field: &str| BlockchainError::Decode {
            event: EventKind::Ping.as_str(),
            reason: format!("log is missing {field}"),
        };

        Ok(Self {
            id: log.transaction_hash.ok_or_else(|| missing("transaction hash"))?,
            block_number: log.block_number.ok_or_else(|| missing("block number"))?,
            log_index: log.log_index.ok_or_else(|| missing("log index"))?,
        })
    }
}

/// A `Pong(bytes32 txHash)` occurrence, referencing the answered request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseEvent {
    pub tx_hash: B256,
}

impl ResponseEvent {
    pub fn from_log(log: &Log) -> Result<Self, BlockchainError> {
        let decoded =
            PingPong::Pong::decode_log(log.as_ref()).map_err(|e| BlockchainError::Decode {
                event: EventKind::Pong.as_str(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            tx_hash: decoded.data.txHash,
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use alloy::primitives::{Address, LogData, address, b256};

    use super::*;

    const CONTRACT: Address = address!("0x5FbDB2315678afecb367f032d93F642f64180aa3");

    fn rpc_log(topics: Vec<B256>, data: Vec<u8>, tx_hash: Option<B256>) -> Log {
        Log {
            inner: alloy::primitives::Log {
                address: CONTRACT,
                data: LogData::new_unchecked(topics, data.into()),
            },
            block_hash: None,
            block_number: Some(42),
            block_timestamp: None,
            transaction_hash: tx_hash,
            transaction_index: Some(0),
            log_index: Some(3),
            removed: false,
        }
    }

    #[test]
    fn decodes_ping_with_emitting_transaction_as_id() {
        let tx = b256!("0x00000000000000000000000000000000000000000000000000000000000000aa");
        let log = rpc_log(vec![EventKind::Ping.signature_hash()], vec![], Some(tx));

        let event = RequestEvent::from_log(&log).unwrap();
        assert_eq!(event.id, tx);
        assert_eq!(event.block_number, 42);
        assert_eq!(event.log_index, 3);
    }

    #[test]
    fn rejects_log_with_foreign_signature() {
        let tx = b256!("0x00000000000000000000000000000000000000000000000000000000000000aa");
        let log = rpc_log(vec![B256::repeat_byte(0x11)], vec![], Some(tx));

        assert!(matches!(
            RequestEvent::from_log(&log),
            Err(BlockchainError::Decode { .. })
        ));
    }

    #[test]
    fn rejects_pending_log_without_transaction_hash() {
        let log = rpc_log(vec![EventKind::Ping.signature_hash()], vec![], None);
        assert!(RequestEvent::from_log(&log).is_err());
    }

    #[test]
    fn decodes_pong_payload() {
        let answered = B256::repeat_byte(0xcc);
        let log = rpc_log(
            vec![EventKind::Pong.signature_hash()],
            answered.to_vec(),
            Some(B256::repeat_byte(0x01)),
        );

        assert_eq!(ResponseEvent::from_log(&log).unwrap().tx_hash, answered);
    }
}
