//! Interior-link codec for the nested-bucket encoding.
//!
//! Interior levels of a composite index store `key -> handle`, where the
//! handle is a freshly allocated 128-bit identifier doubling as the name of
//! the next level's sub-bucket. Leaf levels store `key -> payload`. Nothing
//! distinguishes the two on disk except the level the reader is at, so the
//! rule is enforced here: interior values pass through [`link_handle`]
//! before they are ever used as a bucket name.

use eyre::{bail, Result};
use rand::Rng;

use crate::error::Error;
use crate::store::KvTx;

/// Width of an interior handle in bytes.
pub(crate) const HANDLE_LEN: usize = 16;

/// Allocates a fresh sub-bucket handle.
pub(crate) fn alloc_handle() -> Vec<u8> {
    let mut handle = vec![0u8; HANDLE_LEN];
    rand::thread_rng().fill(handle.as_mut_slice());
    handle
}

/// Validates that an interior value is a well-formed sub-bucket handle.
pub(crate) fn link_handle(value: &[u8]) -> Result<&[u8]> {
    if value.len() != HANDLE_LEN {
        bail!(Error::BrokenChain {
            link: value.to_vec(),
        });
    }
    Ok(value)
}

/// Reads the interior link at `key` in `bucket`, validating it.
///
/// Returns `None` when the key is absent at this level.
pub(crate) fn descend<T: KvTx>(tx: &T, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>> {
    match tx.get(bucket, key)? {
        Some(value) => Ok(Some(link_handle(&value)?.to_vec())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_are_sized_and_distinct() {
        let mut seen = std::collections::HashSet::new();
        for _ in 0..128 {
            let handle = alloc_handle();
            assert_eq!(handle.len(), HANDLE_LEN);
            assert!(seen.insert(handle));
        }
    }

    #[test]
    fn link_handle_rejects_wrong_width() {
        assert!(link_handle(&[0u8; HANDLE_LEN]).is_ok());
        for bad in [&b""[..], b"short", &[0u8; HANDLE_LEN + 1]] {
            let err = link_handle(bad).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<Error>(),
                Some(Error::BrokenChain { .. })
            ));
        }
    }
}
