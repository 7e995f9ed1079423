/// The scalar and pointer types the IR knows about.
///
/// `Void` is legal only as a function return type; `Ptr` values arise from
/// stack slots and string constants. The `Display` impl spells each type the
/// way the LLVM text format does, so the emitter can print types directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrType {
    /// 1-bit integer (comparison results, `bool`).
    I1,
    /// 8-bit integer (`char`).
    I8,
    /// Signed 32-bit integer (`int`).
    I32,
    /// 32-bit IEEE float (`float`).
    F32,
    /// 64-bit IEEE float (`double`).
    F64,
    /// Opaque pointer.
    Ptr,
    /// Unit type, return position only.
    Void,
}

impl IrType {
    pub fn is_int(self) -> bool {
        matches!(self, IrType::I1 | IrType::I8 | IrType::I32)
    }

    pub fn is_float(self) -> bool {
        matches!(self, IrType::F32 | IrType::F64)
    }

    /// Bit width of an integer type.
    pub fn int_bits(self) -> Option<u32> {
        match self {
            IrType::I1 => Some(1),
            IrType::I8 => Some(8),
            IrType::I32 => Some(32),
            _ => None,
        }
    }

    /// Store/load alignment in bytes.
    pub fn align(self) -> u32 {
        match self {
            IrType::I1 | IrType::I8 => 1,
            IrType::I32 | IrType::F32 => 4,
            IrType::F64 | IrType::Ptr => 8,
            IrType::Void => 1,
        }
    }
}

impl std::fmt::Display for IrType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            IrType::I1 => "i1",
            IrType::I8 => "i8",
            IrType::I32 => "i32",
            IrType::F32 => "float",
            IrType::F64 => "double",
            IrType::Ptr => "ptr",
            IrType::Void => "void",
        };
        f.write_str(s)
    }
}
