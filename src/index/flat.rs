//! Exact (brute-force) nearest-neighbour index over squared Euclidean distance.
//!
//! Binary layout, little-endian:
//! `b"LXFI"` | version: u32 | dimension: u32 | count: u64 | count × dimension f32

use bytes::{Buf, BufMut, BytesMut};
use std::path::Path;

use crate::errors::{LexError, Result};

const MAGIC: &[u8; 4] = b"LXFI";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// One search hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the vector
    pub position: usize,
    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// Flat vector index. Only obtainable through [`FlatIndex::build`] or
/// [`FlatIndex::load`], and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    /// Row-major, `len() * dimension` values
    data: Vec<f32>,
}

impl FlatIndex {
    /// Build an index over `vectors` in the given order
    pub fn build(dimension: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        if dimension == 0 {
            return Err(LexError::IndexFormat("dimension must be greater than 0".to_string()));
        }

        let mut data = Vec::with_capacity(vectors.len() * dimension);
        for vector in vectors {
            if vector.len() != dimension {
                return Err(LexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            data.extend_from_slice(vector);
        }

        Ok(Self { dimension, data })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The `k` closest vectors by ascending distance; equal distances keep
    /// insertion order. Returns every vector when fewer than `k` are stored.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if query.len() != self.dimension {
            return Err(LexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(position, row)| Neighbor {
                position,
                distance: squared_l2(query, row),
            })
            .collect();

        scored.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.position.cmp(&b.position))
        });
        scored.truncate(k);
        Ok(scored)
    }

    /// Serialize to the binary layout; identical inputs give identical bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(HEADER_LEN + self.data.len() * 4);
        buf.put_slice(MAGIC);
        buf.put_u32_le(FORMAT_VERSION);
        buf.put_u32_le(self.dimension as u32);
        buf.put_u64_le(self.len() as u64);
        for value in &self.data {
            buf.put_f32_le(*value);
        }
        buf.to_vec()
    }

    /// Parse the binary layout, rejecting truncated or padded payloads
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_LEN {
            return Err(LexError::IndexFormat(format!(
                "file is {} bytes, header needs {}",
                bytes.len(),
                HEADER_LEN
            )));
        }

        let mut buf = bytes;
        let mut magic = [0u8; 4];
        buf.copy_to_slice(&mut magic);
        if &magic != MAGIC {
            return Err(LexError::IndexFormat("bad magic number".to_string()));
        }

        let version = buf.get_u32_le();
        if version != FORMAT_VERSION {
            return Err(LexError::IndexFormat(format!("unsupported version {}", version)));
        }

        let dimension = buf.get_u32_le() as usize;
        let count = buf.get_u64_le() as usize;
        if dimension == 0 {
            return Err(LexError::IndexFormat("dimension is zero".to_string()));
        }

        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| LexError::IndexFormat("vector count overflows".to_string()))?;
        if buf.remaining() != expected {
            return Err(LexError::IndexFormat(format!(
                "payload is {} bytes, expected {} for {} vectors of dimension {}",
                buf.remaining(),
                expected,
                count,
                dimension
            )));
        }

        let mut data = Vec::with_capacity(count * dimension);
        while buf.has_remaining() {
            data.push(buf.get_f32_le());
        }

        Ok(Self { dimension, data })
    }

    /// Write the index to `path`
    pub fn persist(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Read an index written by [`FlatIndex::persist`]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(LexError::ArtifactMissing(path.to_path_buf()));
        }
        Self::from_bytes(&std::fs::read(path)?)
    }
}

/// Squared Euclidean distance
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}
