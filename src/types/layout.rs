//! Fixed-length numeric layouts used when poses and boxes are persisted.
//!
//! Boxes are flat `[minX, minY, minZ, maxX, maxY, maxZ]` sequences. Vectors
//! are 3 numbers, quaternions 4 (`x, y, z, w`). A record of the wrong length
//! is a decode error.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Deserializer, Serializer};
use tracing::warn;

use crate::error::{KernelError, Result};

pub const VEC3_LEN: usize = 3;
pub const QUAT_LEN: usize = 4;
pub const BOX_LEN: usize = 6;

/// Require exactly `expected` elements.
pub fn fixed_size<T>(values: &[T], expected: usize) -> Result<&[T]> {
    if values.len() == expected {
        Ok(values)
    } else {
        Err(KernelError::DecodeShape {
            expected,
            actual: values.len(),
        })
    }
}

/// Like [`fixed_size`], but a too-long input is cut down to its first
/// `expected` elements. A too-short input still fails.
pub fn fixed_prefix<T>(values: &[T], expected: usize) -> Result<&[T]> {
    if values.len() < expected {
        return Err(KernelError::DecodeShape {
            expected,
            actual: values.len(),
        });
    }
    if values.len() > expected {
        warn!(
            expected,
            actual = values.len(),
            "Truncating oversized numeric record"
        );
    }
    Ok(&values[..expected])
}

pub fn vec3_from_slice(values: &[f64]) -> Result<DVec3> {
    let v = fixed_size(values, VEC3_LEN)?;
    Ok(DVec3::new(v[0], v[1], v[2]))
}

pub fn quat_from_slice(values: &[f64]) -> Result<DQuat> {
    let q = fixed_size(values, QUAT_LEN)?;
    Ok(DQuat::from_xyzw(q[0], q[1], q[2], q[3]))
}

pub(crate) mod vec3 {
    use super::*;

    pub fn serialize<S: Serializer>(v: &DVec3, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_seq(v.to_array())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<DVec3, D::Error> {
        let raw = Vec::<f64>::deserialize(d)?;
        vec3_from_slice(&raw).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod quat {
    use super::*;

    pub fn serialize<S: Serializer>(q: &DQuat, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_seq(q.to_array())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<DQuat, D::Error> {
        let raw = Vec::<f64>::deserialize(d)?;
        quat_from_slice(&raw).map_err(serde::de::Error::custom)
    }
}
