/// Key layout for the catalog partitions
///
/// Partition structure:
/// - `contracts`: contract:{notice_id} -> ContractRecord (JSON)
/// - `downloads`: download:{document_url} -> DownloadRecord (JSON)
///
/// Contract keys sort by notice id, which gives discovery its stable order.

/// Encode a contract key: contract:{notice_id}
pub fn encode_contract_key(notice_id: &str) -> Vec<u8> {
    format!("contract:{}", notice_id).into_bytes()
}

/// Decode a contract key: contract:{notice_id} -> notice_id
pub fn decode_contract_key(key: &[u8]) -> Option<String> {
    let key_str = std::str::from_utf8(key).ok()?;
    key_str.strip_prefix("contract:").map(String::from)
}

/// Encode a download key: download:{document_url}
pub fn encode_download_key(document_url: &str) -> Vec<u8> {
    format!("download:{}", document_url).into_bytes()
}
