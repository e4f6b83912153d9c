use crate::InkSnapshot;

pub const INK_FILE_MAGIC: [u8; 4] = *b"INKS";
pub const INK_FILE_VERSION: u32 = 1;
const INK_HEADER_LEN: usize = INK_FILE_MAGIC.len() + std::mem::size_of::<u32>();

#[derive(thiserror::Error, Debug)]
pub enum InkFormatError {
    #[error("not an ink buffer")]
    InvalidData,
    #[error("unsupported ink format version {0}")]
    UnsupportedVersion(u32),
    #[error("failed to encode ink: {0}")]
    Encode(#[from] bincode::error::EncodeError),
    #[error("failed to decode ink: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

/// Serializes a snapshot as `INKS`, a little-endian version, then a bincode body.
pub fn encode_ink(data: &InkSnapshot) -> Result<Vec<u8>, InkFormatError> {
    let mut payload = Vec::new();
    payload.extend_from_slice(&INK_FILE_MAGIC);
    payload.extend_from_slice(&INK_FILE_VERSION.to_le_bytes());
    let body = bincode::encode_to_vec(data, bincode::config::standard())?;
    payload.extend_from_slice(&body);
    Ok(payload)
}

pub fn decode_ink(payload: &[u8]) -> Result<InkSnapshot, InkFormatError> {
    if !(payload.len() >= INK_HEADER_LEN && payload.starts_with(&INK_FILE_MAGIC)) {
        return Err(InkFormatError::InvalidData);
    }
    let version = u32::from_le_bytes(
        payload[INK_FILE_MAGIC.len()..INK_HEADER_LEN]
            .try_into()
            .map_err(|_| InkFormatError::InvalidData)?,
    );
    let body = &payload[INK_HEADER_LEN..];
    match version {
        1 => {
            let (data, _) = bincode::decode_from_slice(body, bincode::config::standard())?;
            Ok(data)
        }
        _ => Err(InkFormatError::UnsupportedVersion(version)),
    }
}
