/// Public DTO for persisted response records.
///
/// Transaction hashes are stored as lowercase `0x`-prefixed hex strings; the
/// caller owns parsing them into typed hashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PongResponseEntry {
    pub request_tx: String,
    pub response_tx: String,
    pub confirmed: bool,
    pub created_at: i64,
    pub updated_at: i64,
}
