//! Order-preserving encoding of bounded integers
//!
//! Each axis gets its own [`CipherProfile`]: a secret key, an input range
//! `[0, in_max]` and an output range `[0, 2^256 - 1]`. Encryption is a walk
//! down a keyed binary partition of both ranges:
//!
//! 1. The current domain interval `[dlo, dhi]` is split at its midpoint.
//! 2. The current range interval is split at a point drawn from
//!    `PRF(key, dlo, dhi)`, restricted so each half of the range is at least
//!    as wide as the matching half of the domain.
//! 3. The walk follows the half that contains the plaintext until the
//!    domain interval is a single value, and the ciphertext is drawn from
//!    the remaining range interval with one more PRF call.
//!
//! Range halves are disjoint and ordered, so the mapping is strictly
//! increasing. The split points depend only on the key and the node bounds,
//! never on the plaintext, so encryption is deterministic. Different keys
//! give unrelated partitions.

use base64::prelude::*;
use num_bigint::BigUint;
use num_traits::{One, Zero};
use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::domain::{DomainPoint, LAT_DOMAIN_MAX, LON_DOMAIN_MAX};
use crate::error::Axis;
use crate::types::EncryptedPoint;
use crate::{Error, Result};

/// Ciphertext width in bits
pub const OUTPUT_BITS: usize = 256;

/// Shortest accepted key after base64 decoding
pub const MIN_KEY_LEN: usize = 16;

const NODE_TAG: &[u8] = b"geoveil/ope/node";
const LEAF_TAG: &[u8] = b"geoveil/ope/leaf";

/// Secret key material, zeroized on drop and never printed
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey {
    bytes: Vec<u8>,
}

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl CipherKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < MIN_KEY_LEN {
            return Err(Error::InvalidKey(format!(
                "key must be at least {MIN_KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self { bytes })
    }

    /// Decode a base64 key (standard alphabet, URL-safe accepted as fallback)
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Err(Error::InvalidKey("key is empty".into()));
        }
        let bytes = BASE64_STANDARD
            .decode(encoded)
            .or_else(|_| BASE64_URL_SAFE.decode(encoded))
            .map_err(|e| Error::InvalidKey(format!("key is not valid base64: {e}")))?;
        Self::new(bytes)
    }

    fn expose_secret(&self) -> &[u8] {
        &self.bytes
    }
}

impl PartialEq for CipherKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

/// Keyed order-preserving cipher for one axis
#[derive(Debug, Clone)]
pub struct CipherProfile {
    key: CipherKey,
    axis: Axis,
    in_max: u64,
    out_max: BigUint,
}

impl CipherProfile {
    /// Profile with input range `[0, in_max]` and the full 256-bit output range
    pub fn new(key: CipherKey, axis: Axis, in_max: u64) -> Self {
        let out_max = (BigUint::one() << OUTPUT_BITS) - 1u32;
        Self {
            key,
            axis,
            in_max,
            out_max,
        }
    }

    /// Profile with an explicit output range; the output range must be at
    /// least as large as the input range
    pub fn with_output_max(key: CipherKey, axis: Axis, in_max: u64, out_max: BigUint) -> Result<Self> {
        if out_max < BigUint::from(in_max) {
            return Err(Error::InvalidConfig(format!(
                "output range [0, {out_max}] is smaller than input range [0, {in_max}]"
            )));
        }
        Ok(Self {
            key,
            axis,
            in_max,
            out_max,
        })
    }

    /// Longitude profile: input range `[0, 360_000_000]`
    pub fn longitude(key: CipherKey) -> Self {
        Self::new(key, Axis::Longitude, LON_DOMAIN_MAX)
    }

    /// Latitude profile: input range `[0, 180_000_000]`
    pub fn latitude(key: CipherKey) -> Self {
        Self::new(key, Axis::Latitude, LAT_DOMAIN_MAX)
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn in_max(&self) -> u64 {
        self.in_max
    }

    pub fn out_max(&self) -> &BigUint {
        &self.out_max
    }

    /// Encrypt `x`; values outside `[0, in_max]` are rejected before any work
    pub fn encrypt(&self, x: u64) -> Result<BigUint> {
        if x > self.in_max {
            return Err(Error::OutOfDomain {
                axis: self.axis,
                value: x as f64,
                max: self.in_max,
            });
        }

        let (mut dlo, mut dhi) = (0u64, self.in_max);
        let (mut rlo, mut rhi) = (BigUint::zero(), self.out_max.clone());

        while dlo < dhi {
            let dmid = dlo + (dhi - dlo) / 2;
            let left = BigUint::from(dmid - dlo + 1);
            let right = BigUint::from(dhi - dmid);

            let range_size = &rhi - &rlo + 1u32;
            if range_size < &left + &right {
                return Err(Error::EncodingFailed(format!(
                    "range interval narrower than domain interval [{dlo}, {dhi}]"
                )));
            }

            let lowest = &rlo + &left - 1u32;
            let highest = &rhi - &right;
            let span = &highest - &lowest + 1u32;
            let split = lowest + self.prf(NODE_TAG, dlo, dhi) % span;

            if x <= dmid {
                dhi = dmid;
                rhi = split;
            } else {
                dlo = dmid + 1;
                rlo = split + 1u32;
            }
        }

        let span = &rhi - &rlo + 1u32;
        Ok(rlo + self.prf(LEAF_TAG, dlo, dhi) % span)
    }

    /// 512 pseudo-random bits bound to the key and a partition node
    fn prf(&self, tag: &[u8], lo: u64, hi: u64) -> BigUint {
        let key = self.key.expose_secret();
        let mut out = Vec::with_capacity(64);
        for counter in 0u8..2 {
            let mut hasher = Sha256::new();
            hasher.update((key.len() as u64).to_be_bytes());
            hasher.update(key);
            hasher.update(tag);
            hasher.update(lo.to_be_bytes());
            hasher.update(hi.to_be_bytes());
            hasher.update([counter]);
            out.extend_from_slice(&hasher.finalize());
        }
        BigUint::from_bytes_be(&out)
    }
}

/// The longitude and latitude profiles, created once at startup
#[derive(Debug, Clone)]
pub struct CipherPair {
    pub lon: CipherProfile,
    pub lat: CipherProfile,
}

impl CipherPair {
    pub fn new(lon: CipherProfile, lat: CipherProfile) -> Self {
        Self { lon, lat }
    }

    /// Build both profiles from base64 keys; fails if either key is missing or malformed
    pub fn from_base64(lon_key: &str, lat_key: &str) -> Result<Self> {
        let lon = CipherKey::from_base64(lon_key)
            .map_err(|e| Error::InvalidKey(format!("longitude: {e}")))?;
        let lat = CipherKey::from_base64(lat_key)
            .map_err(|e| Error::InvalidKey(format!("latitude: {e}")))?;
        if lon == lat {
            tracing::warn!("longitude and latitude cipher keys are identical");
        }
        Ok(Self::new(CipherProfile::longitude(lon), CipherProfile::latitude(lat)))
    }

    pub fn encrypt_point(&self, point: DomainPoint) -> Result<EncryptedPoint> {
        Ok(EncryptedPoint::new(
            self.lon.encrypt(point.lon)?,
            self.lat.encrypt(point.lat)?,
        ))
    }
}
