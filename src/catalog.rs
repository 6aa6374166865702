//! The register catalog, mapping human readable register names to where and how they are stored.
//!
//! A catalog is built once, then never mutated. Share it between sessions with an [`Arc`].

use std::{collections::BTreeMap, str::FromStr, sync::Arc};

use strum_macros::{Display, EnumIter, EnumString};

use crate::error::ProtocolError;

/// Most registers a single read holding registers request can return.
pub const MAX_REGISTERS_PER_READ: u16 = 125;

/// How the contents of a register are to be interpreted.
///
/// Parsed from the names used in the register table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, EnumIter)]
pub enum DataType {
    /// Fixed length character data, two characters per register.
    #[strum(serialize = "char")]
    Text,
    #[strum(serialize = "uint16")]
    UInt16,
    /// Two registers, high word first.
    #[strum(serialize = "uint32")]
    UInt32,
    /// IEEE-754 single precision, high word first.
    #[strum(serialize = "float")]
    Float32,
}

impl DataType {
    /// Byte length implied by the type, `None` for text whose length is per register.
    pub const fn fixed_byte_length(self) -> Option<u16> {
        match self {
            DataType::Text => None,
            DataType::UInt16 => Some(2),
            DataType::UInt32 | DataType::Float32 => Some(4),
        }
    }
}

/// Where a register lives and what it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDescriptor {
    name: String,
    address: u16,
    data_type: DataType,
    byte_length: u16,
}

impl RegisterDescriptor {
    /// Create a descriptor, checking that `byte_length` agrees with `data_type`.
    pub fn new(
        name: impl Into<String>,
        address: u16,
        data_type: DataType,
        byte_length: u16,
    ) -> Result<Self, ProtocolError> {
        let name = name.into();
        match data_type.fixed_byte_length() {
            Some(expected) if expected != byte_length => {
                return Err(ProtocolError::InvalidArgument(format!(
                    "register {name:?} is {data_type} which is {expected} bytes, not {byte_length}"
                )));
            }
            Some(_) => {}
            None => {
                if byte_length == 0 || byte_length % 2 != 0 {
                    return Err(ProtocolError::InvalidArgument(format!(
                        "text register {name:?} needs an even, non-zero length, got {byte_length}"
                    )));
                }
                if byte_length / 2 > MAX_REGISTERS_PER_READ {
                    return Err(ProtocolError::InvalidArgument(format!(
                        "text register {name:?} of {byte_length} bytes is too long to be read at once"
                    )));
                }
            }
        }
        Ok(Self {
            name,
            address,
            data_type,
            byte_length,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> u16 {
        self.address
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn byte_length(&self) -> u16 {
        self.byte_length
    }

    /// Number of 16 bit registers occupied.
    pub fn register_count(&self) -> u16 {
        self.byte_length / 2
    }
}

/// Immutable lookup table of every register the device offers.
#[derive(Debug, Clone, Default)]
pub struct RegisterCatalog {
    registers: BTreeMap<String, RegisterDescriptor>,
}

impl RegisterCatalog {
    /// Build a catalog from descriptors. Names must be unique.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = RegisterDescriptor>,
    ) -> Result<Self, ProtocolError> {
        let mut registers = BTreeMap::new();
        for descriptor in descriptors {
            let name = descriptor.name.clone();
            if registers.insert(name.clone(), descriptor).is_some() {
                return Err(ProtocolError::InvalidArgument(format!(
                    "register {name:?} is listed twice"
                )));
            }
        }
        log::trace!("Loaded register catalog with {} entries", registers.len());
        Ok(Self { registers })
    }

    /// Parse the comma separated register table.
    ///
    /// The first line is a header naming at least the `description`, `modbus address`,
    /// `data type` and `data length in bytes` columns, in any order. Blank lines are skipped.
    pub fn from_table(table: &str) -> Result<Self, ProtocolError> {
        let mut lines = table.lines().filter(|line| !line.trim().is_empty());
        let header: Vec<&str> = lines
            .next()
            .ok_or_else(|| ProtocolError::InvalidArgument("register table is empty".into()))?
            .split(',')
            .map(str::trim)
            .collect();
        let column = |wanted: &str| {
            header.iter().position(|c| *c == wanted).ok_or_else(|| {
                ProtocolError::InvalidArgument(format!("register table has no {wanted:?} column"))
            })
        };
        let name_col = column("description")?;
        let address_col = column("modbus address")?;
        let type_col = column("data type")?;
        let length_col = column("data length in bytes")?;

        let mut descriptors = Vec::new();
        for line in lines {
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            let field = |index: usize| {
                fields.get(index).copied().ok_or_else(|| {
                    ProtocolError::InvalidArgument(format!("register table row {line:?} is short"))
                })
            };
            let name = field(name_col)?;
            let address = parse_number(field(address_col)?, line)?;
            let type_name = field(type_col)?;
            let data_type = DataType::from_str(type_name).map_err(|_| {
                ProtocolError::InvalidArgument(format!(
                    "register {name:?} has unknown data type {type_name:?}"
                ))
            })?;
            let byte_length = parse_number(field(length_col)?, line)?;
            descriptors.push(RegisterDescriptor::new(name, address, data_type, byte_length)?);
        }
        Self::from_descriptors(descriptors)
    }

    /// Wrap into an [`Arc`], ready to hand to a session.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Find the descriptor of register `name`.
    pub fn lookup(&self, name: &str) -> Result<&RegisterDescriptor, ProtocolError> {
        self.registers
            .get(name)
            .ok_or_else(|| ProtocolError::UnknownRegister {
                name: name.into(),
                available: self.names().map(String::from).collect(),
            })
    }

    /// Check that every register in `names` is present, reporting the first one missing.
    pub fn require(&self, names: &[&str]) -> Result<(), ProtocolError> {
        names.iter().try_for_each(|name| self.lookup(name).map(|_| ()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registers.contains_key(name)
    }

    /// All register names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }
}

/// Table cells may hold integers written as floats, e.g. `40.0`.
fn parse_number(cell: &str, line: &str) -> Result<u16, ProtocolError> {
    let invalid =
        || ProtocolError::InvalidArgument(format!("{cell:?} in row {line:?} is not a 16 bit number"));
    if let Ok(value) = cell.parse::<u16>() {
        return Ok(value);
    }
    let value: f64 = cell.parse().map_err(|_| invalid())?;
    if value.fract() != 0.0 || !(0.0..=u16::MAX as f64).contains(&value) {
        return Err(invalid());
    }
    Ok(value as u16)
}
