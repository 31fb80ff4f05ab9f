use h5r_types::Dataspace;

use crate::error::{StoreError, StoreResult};
use crate::traits::SelectionCodec;

/// Version byte leading every encoded selection.
const SELECTION_VERSION: u8 = 1;

/// [`SelectionCodec`] backed by bincode.
///
/// Layout: `[1-byte version][bincode(Dataspace)]`. Decoding validates the
/// selection against the extent, so a decoded dataspace is always usable.
#[derive(Clone, Copy, Debug, Default)]
pub struct BincodeSelectionCodec;

impl BincodeSelectionCodec {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionCodec for BincodeSelectionCodec {
    fn encoded_len(&self, space: &Dataspace) -> StoreResult<usize> {
        let body = bincode::serialized_size(space).map_err(|e| StoreError::Codec(e.to_string()))?;
        Ok(1 + body as usize)
    }

    fn encode_into(&self, space: &Dataspace, out: &mut Vec<u8>) -> StoreResult<()> {
        space
            .validate()
            .map_err(|e| StoreError::Codec(format!("invalid selection: {e}")))?;
        out.push(SELECTION_VERSION);
        bincode::serialize_into(out, space).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> StoreResult<Dataspace> {
        let (&version, body) = bytes
            .split_first()
            .ok_or_else(|| StoreError::Codec("empty selection".into()))?;
        if version != SELECTION_VERSION {
            return Err(StoreError::Codec(format!(
                "unsupported selection version {version}"
            )));
        }
        let space: Dataspace =
            bincode::deserialize(body).map_err(|e| StoreError::Codec(e.to_string()))?;
        space
            .validate()
            .map_err(|e| StoreError::Codec(format!("invalid selection: {e}")))?;
        Ok(space)
    }
}
