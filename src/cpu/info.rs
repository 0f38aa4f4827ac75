use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Registers visible to a debugger or state saver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterId {
    Pc,
    PreviousPc,
    Sp,
    Fcw,
    Nsp,
    Psap,
    Refresh,
    IrqRequest,
    IrqServiced,
    IrqVector,
    R(u8),
}

impl RegisterId {
    /// Every register, in display order.
    pub fn all() -> impl Iterator<Item = RegisterId> {
        [
            RegisterId::Pc,
            RegisterId::PreviousPc,
            RegisterId::Sp,
            RegisterId::Fcw,
            RegisterId::Nsp,
            RegisterId::Psap,
            RegisterId::Refresh,
            RegisterId::IrqRequest,
            RegisterId::IrqServiced,
            RegisterId::IrqVector,
        ]
        .into_iter()
        .chain((0..16).map(RegisterId::R))
    }

    pub fn name(&self) -> String {
        match self {
            RegisterId::Pc => "pc".into(),
            RegisterId::PreviousPc => "ppc".into(),
            RegisterId::Sp => "sp".into(),
            RegisterId::Fcw => "fcw".into(),
            RegisterId::Nsp => "nsp".into(),
            RegisterId::Psap => "psap".into(),
            RegisterId::Refresh => "refresh".into(),
            RegisterId::IrqRequest => "irq_req".into(),
            RegisterId::IrqServiced => "irq_srv".into(),
            RegisterId::IrqVector => "irq_vec".into(),
            RegisterId::R(n) => format!("r{}", n),
        }
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterParseError {
    #[error("unknown register: {0}")]
    Unknown(String),
}

impl FromStr for RegisterId {
    type Err = RegisterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        if let Some(id) = RegisterId::all().find(|id| id.name() == lower) {
            return Ok(id);
        }
        Err(RegisterParseError::Unknown(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusWidth {
    pub address_bits: u8,
    pub data_bits: u8,
}

/// Static description of a CPU instance for the host's device framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuInfo {
    pub name: &'static str,
    pub endianness: Endianness,
    pub min_instruction_words: u8,
    pub max_instruction_words: u8,
    pub min_cycles: u8,
    pub max_cycles: u8,
    pub program: BusWidth,
    pub io: BusWidth,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_parse_back() {
        for id in RegisterId::all() {
            assert_eq!(id.name().parse::<RegisterId>(), Ok(id));
        }
        assert_eq!("R7".parse::<RegisterId>(), Ok(RegisterId::R(7)));
        assert!(matches!(
            "r16".parse::<RegisterId>(),
            Err(RegisterParseError::Unknown(_))
        ));
    }

    #[test]
    fn enumerates_sixteen_general_registers() {
        assert_eq!(
            RegisterId::all()
                .filter(|id| matches!(id, RegisterId::R(_)))
                .count(),
            16
        );
    }
}
