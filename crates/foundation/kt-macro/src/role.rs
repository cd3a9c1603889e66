//! Expansion roles

use bitflags::bitflags;
use std::fmt;

/// The position a macro is expanded in
///
/// Every expansion request carries exactly one role. The discriminants are
/// the raw values exchanged with the host and double as [`MacroRoles`] bits.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MacroRole {
    /// `#name(...)` used as an expression
    Expression = 0x01,
    /// `#name(...)` used as a declaration
    FreestandingDeclaration = 0x02,
    /// `@Name` adding accessors to a variable
    Accessor = 0x04,
    /// `@Name` on a group, adding attributes to each member
    MemberAttribute = 0x08,
    /// `@Name` on a group, adding members
    Member = 0x10,
}

impl MacroRole {
    /// Every role, in discriminant order
    pub const ALL: [Self; 5] = [
        Self::Expression,
        Self::FreestandingDeclaration,
        Self::Accessor,
        Self::MemberAttribute,
        Self::Member,
    ];

    /// Decodes a raw role tag; anything but a single known bit is rejected
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|role| *role as u8 == raw)
    }

    /// The raw role tag
    pub fn raw(self) -> u8 {
        self as u8
    }

    /// Whether the role belongs to an attribute rather than `#name(...)`
    pub fn is_attached(self) -> bool {
        matches!(self, Self::Accessor | Self::MemberAttribute | Self::Member)
    }
}

impl fmt::Display for MacroRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expression => write!(f, "expression"),
            Self::FreestandingDeclaration => write!(f, "freestanding declaration"),
            Self::Accessor => write!(f, "accessor"),
            Self::MemberAttribute => write!(f, "member attribute"),
            Self::Member => write!(f, "member"),
        }
    }
}

bitflags! {
    /// The set of roles a macro descriptor can be expanded in
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct MacroRoles: u8 {
        /// See [`MacroRole::Expression`]
        const EXPRESSION = MacroRole::Expression as u8;
        /// See [`MacroRole::FreestandingDeclaration`]
        const FREESTANDING_DECLARATION = MacroRole::FreestandingDeclaration as u8;
        /// See [`MacroRole::Accessor`]
        const ACCESSOR = MacroRole::Accessor as u8;
        /// See [`MacroRole::MemberAttribute`]
        const MEMBER_ATTRIBUTE = MacroRole::MemberAttribute as u8;
        /// See [`MacroRole::Member`]
        const MEMBER = MacroRole::Member as u8;
    }
}

impl From<MacroRole> for MacroRoles {
    fn from(role: MacroRole) -> Self {
        Self::from_bits_retain(role.raw())
    }
}

impl MacroRoles {
    /// Whether `role` is in the set
    pub fn supports(self, role: MacroRole) -> bool {
        self.contains(role.into())
    }
}
