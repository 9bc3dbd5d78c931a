//! Binary snapshot format of the station registry: gzip over bincode.

use crate::discovery::error::DiscoveryError;
use crate::types::station::Station;
use async_compression::tokio::bufread::{GzipDecoder, GzipEncoder};
use bincode::config::{Configuration, Fixint, LittleEndian};
use tokio::io::AsyncReadExt;

const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

pub async fn encode_snapshot(stations: &[Station]) -> Result<Vec<u8>, DiscoveryError> {
    let encoded = bincode::serde::encode_to_vec(stations, BINCODE_CONFIG)
        .map_err(|e| DiscoveryError::SnapshotEncode(Box::new(e)))?;
    let mut encoder = GzipEncoder::new(encoded.as_slice());
    let mut compressed = Vec::with_capacity(encoded.len() / 4);
    encoder
        .read_to_end(&mut compressed)
        .await
        .map_err(DiscoveryError::SnapshotCompression)?;
    Ok(compressed)
}

pub async fn decode_snapshot(compressed: &[u8]) -> Result<Vec<Station>, DiscoveryError> {
    let mut decoder = GzipDecoder::new(compressed);
    let mut encoded = Vec::new();
    decoder
        .read_to_end(&mut encoded)
        .await
        .map_err(DiscoveryError::SnapshotCompression)?;
    let (stations, _) = bincode::serde::decode_from_slice::<Vec<Station>, _>(&encoded, BINCODE_CONFIG)
        .map_err(|e| DiscoveryError::SnapshotDecode(Box::new(e)))?;
    Ok(stations)
}
