use std::fmt::{Display, Formatter};

use bytemuck::cast_slice;

/// The element type a case is registered under.
///
/// Not every kind is directly executable by the vendor library: the integer
/// kinds have no native code path for most operations and are redirected to
/// [ElementKind::F32] by [execution_kind](ElementKind::execution_kind). The
/// case keeps reporting under its registered kind either way.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ElementKind {
    F16,
    F32,
    F64,
    I8,
    I32,
}

/// IEEE 754 binary16 representation of 1.0.
const F16_ONE_BITS: u16 = 0x3C00;

impl ElementKind {
    pub const ALL: [ElementKind; 5] = [
        ElementKind::F16,
        ElementKind::F32,
        ElementKind::F64,
        ElementKind::I8,
        ElementKind::I32,
    ];

    pub fn size_bytes(self) -> usize {
        match self {
            ElementKind::F16 => 2,
            ElementKind::F32 => 4,
            ElementKind::F64 => 8,
            ElementKind::I8 => 1,
            ElementKind::I32 => 4,
        }
    }

    pub fn is_float(self) -> bool {
        match self {
            ElementKind::F16 | ElementKind::F32 | ElementKind::F64 => true,
            ElementKind::I8 | ElementKind::I32 => false,
        }
    }

    /// The kind actually handed to the vendor library. The libraries expose
    /// no native integer entry points for these operations, so integer kinds
    /// execute through the single-precision path.
    pub fn execution_kind(self) -> ElementKind {
        if self.is_float() {
            self
        } else {
            ElementKind::F32
        }
    }

    /// A host buffer of `count` elements, every element equal to one.
    pub fn fill_ones(self, count: usize) -> Vec<u8> {
        match self {
            ElementKind::F16 => cast_slice(&vec![F16_ONE_BITS; count]).to_vec(),
            ElementKind::F32 => cast_slice(&vec![1.0f32; count]).to_vec(),
            ElementKind::F64 => cast_slice(&vec![1.0f64; count]).to_vec(),
            ElementKind::I8 => vec![1u8; count],
            ElementKind::I32 => cast_slice(&vec![1i32; count]).to_vec(),
        }
    }

    /// A host buffer of `count` elements, every element equal to zero.
    pub fn fill_zeros(self, count: usize) -> Vec<u8> {
        vec![0u8; count * self.size_bytes()]
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ElementKind::F16 => "f16",
            ElementKind::F32 => "f32",
            ElementKind::F64 => "f64",
            ElementKind::I8 => "i8",
            ElementKind::I32 => "i32",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_patterns() {
        assert_eq!(ElementKind::F32.fill_ones(2), cast_slice::<f32, u8>(&[1.0, 1.0]));
        assert_eq!(ElementKind::F16.fill_ones(1), vec![0x00, 0x3C]);
        assert_eq!(ElementKind::I8.fill_ones(3), vec![1, 1, 1]);
        assert_eq!(ElementKind::F64.fill_zeros(2).len(), 16);
    }

    #[test]
    fn integer_kinds_fall_back_to_f32() {
        assert_eq!(ElementKind::I8.execution_kind(), ElementKind::F32);
        assert_eq!(ElementKind::I32.execution_kind(), ElementKind::F32);
        assert_eq!(ElementKind::F16.execution_kind(), ElementKind::F16);
        assert_eq!(ElementKind::F64.execution_kind(), ElementKind::F64);
    }
}
