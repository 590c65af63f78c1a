//! Content addressed implementation versions.
//!
//! The Solidity compiler appends CBOR encoded metadata to the bytecode, which
//! among other things contains a hash of the sources including comments and
//! file paths. The length of that metadata is stored big endian in the last
//! two bytes. Hashing the bytecode without it gives an id that only changes
//! when the logic changes.

use alloy::primitives::{hex, keccak256};

/// Returns the keccak-256 hash of `bytecode` with its trailing metadata
/// removed, as lowercase hex without a `0x` prefix.
pub fn implementation_version(bytecode: &[u8]) -> String {
    hex::encode(keccak256(strip_metadata(bytecode)))
}

/// Removes the trailing compiler metadata. Bytecode whose length suffix
/// points past its start is returned unchanged.
pub fn strip_metadata(bytecode: &[u8]) -> &[u8] {
    let [.., hi, lo] = bytecode else {
        return bytecode;
    };
    let metadata = usize::from(u16::from_be_bytes([*hi, *lo])) + 2;
    match bytecode.len().checked_sub(metadata) {
        Some(end) => &bytecode[..end],
        None => bytecode,
    }
}

#[cfg(test)]
mod tests {
    use {super::*, hex_literal::hex};

    const LOGIC: [u8; 15] = hex!("6080604052348015600f57600080fd");

    fn with_metadata(logic: &[u8], metadata: &[u8]) -> Vec<u8> {
        let len = u16::try_from(metadata.len()).unwrap();
        [logic, metadata, &len.to_be_bytes()[..]].concat()
    }

    #[test]
    fn strips_metadata() {
        let bytecode = with_metadata(&LOGIC, &hex!("a264697066735822"));
        assert_eq!(strip_metadata(&bytecode), LOGIC);
    }

    #[test]
    fn keeps_bytecode_without_valid_suffix() {
        // Suffix claims 0xffff bytes of metadata.
        let bytecode = hex!("6080ffff");
        assert_eq!(strip_metadata(&bytecode), bytecode);
        assert_eq!(strip_metadata(&[0x60]), [0x60u8]);
        assert_eq!(strip_metadata(&[]), [] as [u8; 0]);
    }

    #[test]
    fn deterministic() {
        let bytecode = with_metadata(&LOGIC, &hex!("a26469706673"));
        let version = implementation_version(&bytecode);
        assert_eq!(version, implementation_version(&bytecode));
        assert_eq!(version.len(), 64);
        assert!(!version.starts_with("0x"));
        assert_eq!(version, hex::encode(keccak256(LOGIC)));
    }

    #[test]
    fn matches_existing_registry_format() {
        // Versions recorded by earlier deployments are plain lowercase hex.
        let version = implementation_version(&[0x60, 0x80]);
        assert_eq!(version, "1a578b7a4b0b5755db6d121b4118d4bc68fe170dca840c59bc922f14175a76b0");
    }

    #[test]
    fn ignores_metadata_differences() {
        let a = with_metadata(&LOGIC, &hex!("a2646970667358221220aaaa"));
        let b = with_metadata(&LOGIC, &hex!("a2646970667358221220bbbbbbbb"));
        assert_eq!(implementation_version(&a), implementation_version(&b));
    }

    #[test]
    fn logic_changes_change_the_version() {
        let metadata = hex!("a2646970667358221220aaaa");
        let mut other = LOGIC;
        other[0] = 0x61;
        assert_ne!(
            implementation_version(&with_metadata(&LOGIC, &metadata)),
            implementation_version(&with_metadata(&other, &metadata)),
        );
    }
}
