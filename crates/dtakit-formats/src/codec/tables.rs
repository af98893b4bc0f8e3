//! Delta tables for the seven DPCM block variants
//!
//! The tables used by the packer are not compiled into this crate. The
//! built-in set is a placeholder with the right shape only: audio decoded with
//! it has the right length and layout but wrong sample values. Load the real
//! tables with [`DeltaTables::from_le_bytes`] for faithful output.

use crate::error::{DtaError, DtaResult};

/// Number of DPCM variants
pub const VARIANT_COUNT: usize = 7;

/// Entries per delta table, one per 7-bit magnitude
pub const TABLE_LEN: usize = 128;

/// Size of a serialized table set: `VARIANT_COUNT * TABLE_LEN` little-endian u16
pub const SERIALIZED_SIZE: usize = VARIANT_COUNT * TABLE_LEN * 2;

/// Placeholder tables, `m*(v+1) + m*m*(v+1)/32`, not the packer's values
static BUILTIN: DeltaTables = DeltaTables {
    tables: build_builtin(),
    builtin: true,
};

const fn build_builtin() -> [[u16; TABLE_LEN]; VARIANT_COUNT] {
    let mut tables = [[0u16; TABLE_LEN]; VARIANT_COUNT];
    let mut variant = 0;
    while variant < VARIANT_COUNT {
        let scale = variant as u32 + 1;
        let mut magnitude = 0;
        while magnitude < TABLE_LEN {
            let m = magnitude as u32;
            tables[variant][magnitude] = (m * scale + (m * m * scale) / 32) as u16;
            magnitude += 1;
        }
        variant += 1;
    }
    tables
}

/// Per-variant magnitude-to-delta lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaTables {
    tables: [[u16; TABLE_LEN]; VARIANT_COUNT],
    builtin: bool,
}

impl DeltaTables {
    /// The placeholder tables compiled into the crate
    pub fn builtin() -> &'static Self {
        &BUILTIN
    }

    /// Whether these are the placeholder tables rather than a loaded resource
    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    /// Load a table set from its serialized form
    ///
    /// The input holds variant 0 through 6 in order, each as 128 little-endian
    /// u16 values.
    pub fn from_le_bytes(bytes: &[u8]) -> DtaResult<Self> {
        if bytes.len() != SERIALIZED_SIZE {
            return Err(DtaError::InvalidDeltaTables {
                expected: SERIALIZED_SIZE,
                actual: bytes.len(),
            });
        }

        let mut tables = [[0u16; TABLE_LEN]; VARIANT_COUNT];
        for (slot, pair) in tables.iter_mut().flatten().zip(bytes.chunks_exact(2)) {
            *slot = u16::from_le_bytes([pair[0], pair[1]]);
        }

        Ok(Self {
            tables,
            builtin: false,
        })
    }

    /// Serialize in the form accepted by [`Self::from_le_bytes`]
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.tables
            .iter()
            .flatten()
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }

    /// Table for one variant
    ///
    /// # Panics
    ///
    /// Panics if `variant >= VARIANT_COUNT`; block tags only map to valid
    /// variants.
    pub fn table(&self, variant: usize) -> &[u16; TABLE_LEN] {
        &self.tables[variant]
    }

    /// Delta for a variant and 7-bit magnitude
    pub fn delta(&self, variant: usize, magnitude: u8) -> Option<u16> {
        self.tables
            .get(variant)
            .and_then(|table| table.get(usize::from(magnitude)))
            .copied()
    }
}

impl Default for DeltaTables {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_shape() {
        let tables = DeltaTables::builtin();
        assert!(tables.is_builtin());
        assert!(DeltaTables::default().is_builtin());
        for variant in 0..VARIANT_COUNT {
            let table = tables.table(variant);
            assert_eq!(table[0], 0, "magnitude 0 must be a zero delta");
            assert!(
                table.windows(2).all(|w| w[0] < w[1]),
                "variant {variant} must be strictly increasing"
            );
        }

        assert_eq!(tables.delta(0, 1), Some(1));
        assert_eq!(tables.delta(0, 127), Some(127 + 127 * 127 / 32));
        assert_eq!(tables.delta(6, 127), Some((7 * 127 + 7 * 127 * 127 / 32_u32) as u16));
        assert_eq!(tables.delta(7, 0), None);
        assert_eq!(tables.delta(0, 128), None);
    }

    #[test]
    fn test_from_le_bytes() {
        let mut bytes = vec![0u8; SERIALIZED_SIZE];
        // Variant 2, magnitude 5
        let index = (2 * TABLE_LEN + 5) * 2;
        bytes[index..index + 2].copy_from_slice(&0x1234u16.to_le_bytes());

        let tables = DeltaTables::from_le_bytes(&bytes).expect("Test operation should succeed");
        assert!(!tables.is_builtin());
        assert_eq!(tables.delta(2, 5), Some(0x1234));
        assert_eq!(tables.delta(2, 4), Some(0));
        assert_eq!(tables.to_le_bytes(), bytes);
    }

    #[test]
    fn test_from_le_bytes_wrong_size() {
        let result = DeltaTables::from_le_bytes(&[0u8; 100]);
        assert!(matches!(
            result,
            Err(DtaError::InvalidDeltaTables {
                expected: SERIALIZED_SIZE,
                actual: 100
            })
        ));
    }

    #[test]
    fn test_builtin_serializes() {
        let bytes = DeltaTables::builtin().to_le_bytes();
        assert_eq!(bytes.len(), SERIALIZED_SIZE);
        let reloaded = DeltaTables::from_le_bytes(&bytes).expect("Test operation should succeed");
        // Same values, but now counted as a loaded resource
        assert_eq!(reloaded.to_le_bytes(), bytes);
        assert_eq!(reloaded.table(6), DeltaTables::builtin().table(6));
        assert!(!reloaded.is_builtin());
    }
}
