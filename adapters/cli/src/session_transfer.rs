use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use geocoin_world::persistence::SessionSnapshot;

const TRANSFER_DOMAIN: &str = "geocoin";
const TRANSFER_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded session payload.
pub(crate) const TRANSFER_HEADER: &str = "geocoin:v1";
/// Delimiter used to separate the prefix, version and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes a session snapshot into a single-line string suitable for clipboard transfer.
pub(crate) fn encode(snapshot: &SessionSnapshot) -> Result<String, TransferError> {
    let json = serde_json::to_vec(snapshot).map_err(TransferError::Serialize)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    Ok(format!("{TRANSFER_HEADER}{FIELD_DELIMITER}{encoded}"))
}

/// Decodes a session snapshot from its transfer string.
pub(crate) fn decode(value: &str) -> Result<SessionSnapshot, TransferError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TransferError::EmptyPayload);
    }

    let mut parts = trimmed.splitn(3, FIELD_DELIMITER);
    let domain = parts.next().ok_or(TransferError::MissingPrefix)?;
    let version = parts.next().ok_or(TransferError::MissingVersion)?;
    let payload = parts.next().ok_or(TransferError::MissingPayload)?;

    if domain != TRANSFER_DOMAIN {
        return Err(TransferError::InvalidPrefix(domain.to_owned()));
    }
    if version != TRANSFER_VERSION {
        return Err(TransferError::UnsupportedVersion(version.to_owned()));
    }

    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(TransferError::InvalidEncoding)?;
    serde_json::from_slice(&bytes).map_err(TransferError::InvalidPayload)
}

/// Errors that can occur while encoding or decoding transfer strings.
#[derive(Debug)]
pub(crate) enum TransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing.
    MissingPrefix,
    /// The version segment was missing.
    MissingVersion,
    /// The payload segment was missing.
    MissingPayload,
    /// The string used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The string used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
    /// The decoded payload could not be deserialised.
    InvalidPayload(serde_json::Error),
    /// The snapshot could not be serialised.
    Serialize(serde_json::Error),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "session string was empty"),
            Self::MissingPrefix => write!(f, "session string is missing the prefix"),
            Self::MissingVersion => write!(f, "session string is missing the version"),
            Self::MissingPayload => write!(f, "session string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "session prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "session version '{version}' is not supported")
            }
            Self::InvalidEncoding(error) => {
                write!(f, "could not decode session payload: {error}")
            }
            Self::InvalidPayload(error) => write!(f, "could not parse session payload: {error}"),
            Self::Serialize(error) => write!(f, "could not serialise session: {error}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            Self::InvalidPayload(error) | Self::Serialize(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            grid: r#"{"tileWidth":0.0001,"visibilityRadius":8,"cells":[],"caches":[]}"#.to_owned(),
            player: r#"{"location":{"lat":0.0,"lng":0.0},"coins":[]}"#.to_owned(),
            history: Some("[]".to_owned()),
        }
    }

    #[test]
    fn encoded_string_carries_header() {
        let encoded = encode(&snapshot()).expect("encodes");
        assert!(encoded.starts_with(&format!("{TRANSFER_HEADER}:")));
        assert!(!encoded.contains('\n'));

        let decoded = decode(&format!("  {encoded}\n")).expect("decodes");
        assert_eq!(decoded, snapshot());
    }

    #[test]
    fn rejects_foreign_prefix_and_version() {
        assert!(matches!(
            decode("geocache:v1:abc"),
            Err(TransferError::InvalidPrefix(prefix)) if prefix == "geocache"
        ));
        assert!(matches!(
            decode("geocoin:v2:abc"),
            Err(TransferError::UnsupportedVersion(version)) if version == "v2"
        ));
        assert!(matches!(decode("geocoin"), Err(TransferError::MissingVersion)));
        assert!(matches!(decode("   "), Err(TransferError::EmptyPayload)));
    }

    #[test]
    fn rejects_corrupt_payload() {
        assert!(matches!(
            decode("geocoin:v1:!!!"),
            Err(TransferError::InvalidEncoding(_))
        ));
        let not_json = STANDARD_NO_PAD.encode(b"not json");
        assert!(matches!(
            decode(&format!("geocoin:v1:{not_json}")),
            Err(TransferError::InvalidPayload(_))
        ));
    }
}
