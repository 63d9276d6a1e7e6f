//! Record file loading.
//!
//! The input is a JSON array of member records with hex-encoded salt and
//! nonce, as exported by the profile store:
//!
//! ```json
//! [{ "identifier": "alice", "url": "https://cdn/…", "salt": "…", "nonce": "…" }]
//! ```

use std::path::Path;

use lockframe_media::CandidateRecord;
use serde::Deserialize;

use crate::error::CliError;

#[derive(Debug, Deserialize)]
struct MemberRecord {
    identifier: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    salt: Option<String>,
    #[serde(default)]
    nonce: Option<String>,
}

/// Read and parse the record file at `path`.
pub fn load(path: &Path) -> Result<Vec<CandidateRecord>, CliError> {
    let json = std::fs::read_to_string(path)
        .map_err(|source| CliError::Io { path: path.to_path_buf(), source })?;
    parse(&json)
}

/// Parse a record file.
///
/// Hex errors are fatal; wrong lengths are not, since the prefetcher skips
/// those records on its own.
pub fn parse(json: &str) -> Result<Vec<CandidateRecord>, CliError> {
    let members: Vec<MemberRecord> = serde_json::from_str(json)?;

    members
        .into_iter()
        .map(|member| {
            let salt = decode_field(&member.identifier, "salt", member.salt.as_deref())?;
            let nonce = decode_field(&member.identifier, "nonce", member.nonce.as_deref())?;
            Ok(CandidateRecord { identifier: member.identifier, url: member.url, salt, nonce })
        })
        .collect()
}

fn decode_field(
    identifier: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<Vec<u8>>, CliError> {
    value
        .map(|hex_value| {
            hex::decode(hex_value).map_err(|source| CliError::Hex {
                identifier: identifier.to_string(),
                field,
                source,
            })
        })
        .transpose()
}
