//! Property and class attribute bit sets

use jsbridge_sys::*;
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Attributes applied by [`Object::set_property`](crate::Object::set_property)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PropertyAttributes(JSPropertyAttributes);

impl PropertyAttributes {
    pub const NONE: Self = Self(K_JS_PROPERTY_ATTRIBUTE_NONE);
    /// Writes are silently ignored
    pub const READ_ONLY: Self = Self(K_JS_PROPERTY_ATTRIBUTE_READ_ONLY);
    /// Hidden from enumeration, including `copy_property_names`
    pub const DONT_ENUM: Self = Self(K_JS_PROPERTY_ATTRIBUTE_DONT_ENUM);
    /// `delete` fails
    pub const DONT_DELETE: Self = Self(K_JS_PROPERTY_ATTRIBUTE_DONT_DELETE);

    const ALL: JSPropertyAttributes = K_JS_PROPERTY_ATTRIBUTE_READ_ONLY
        | K_JS_PROPERTY_ATTRIBUTE_DONT_ENUM
        | K_JS_PROPERTY_ATTRIBUTE_DONT_DELETE;

    pub const fn bits(self) -> JSPropertyAttributes {
        self.0
    }

    /// Keeps only the bits the engine defines
    pub const fn from_bits_truncate(bits: JSPropertyAttributes) -> Self {
        Self(bits & Self::ALL)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PropertyAttributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PropertyAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for PropertyAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::READ_ONLY, "READ_ONLY"),
            (Self::DONT_ENUM, "DONT_ENUM"),
            (Self::DONT_DELETE, "DONT_DELETE"),
        ];
        write_flags(f, "PropertyAttributes", self.is_empty(), |flag| {
            names
                .iter()
                .filter(|(bit, _)| self.contains(*bit))
                .for_each(|(_, name)| flag(name));
        })
    }
}

/// `kJSClassAttribute*` flags for class definitions
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClassAttributes(JSClassAttributes);

impl ClassAttributes {
    pub const NONE: Self = Self(K_JS_CLASS_ATTRIBUTE_NONE);
    /// Instances get `Object.prototype` instead of a per-class prototype
    pub const NO_AUTOMATIC_PROTOTYPE: Self = Self(K_JS_CLASS_ATTRIBUTE_NO_AUTOMATIC_PROTOTYPE);

    pub const fn bits(self) -> JSClassAttributes {
        self.0
    }

    pub const fn from_bits_truncate(bits: JSClassAttributes) -> Self {
        Self(bits & K_JS_CLASS_ATTRIBUTE_NO_AUTOMATIC_PROTOTYPE)
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for ClassAttributes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ClassAttributes {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ClassAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_flags(f, "ClassAttributes", self.is_empty(), |flag| {
            if self.contains(Self::NO_AUTOMATIC_PROTOTYPE) {
                flag("NO_AUTOMATIC_PROTOTYPE");
            }
        })
    }
}

fn write_flags(
    f: &mut fmt::Formatter<'_>,
    type_name: &str,
    empty: bool,
    each: impl FnOnce(&mut dyn FnMut(&str)),
) -> fmt::Result {
    if empty {
        return write!(f, "{}(NONE)", type_name);
    }
    let mut names = Vec::new();
    each(&mut |name: &str| names.push(name.to_string()));
    write!(f, "{}({})", type_name, names.join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_attribute_values() {
        assert_eq!(PropertyAttributes::NONE.bits(), 0);
        assert_eq!(PropertyAttributes::READ_ONLY.bits(), 1 << 1);
        assert_eq!(PropertyAttributes::DONT_ENUM.bits(), 1 << 2);
        assert_eq!(PropertyAttributes::DONT_DELETE.bits(), 1 << 3);
    }

    #[test]
    fn test_property_attribute_union() {
        let mut attrs = PropertyAttributes::READ_ONLY | PropertyAttributes::DONT_DELETE;
        assert!(attrs.contains(PropertyAttributes::READ_ONLY));
        assert!(attrs.contains(PropertyAttributes::DONT_DELETE));
        assert!(!attrs.contains(PropertyAttributes::DONT_ENUM));
        assert!(attrs.contains(PropertyAttributes::NONE));

        attrs |= PropertyAttributes::DONT_ENUM;
        assert_eq!(attrs.bits(), 0b1110);
    }

    #[test]
    fn test_truncate_drops_unknown_bits() {
        let attrs = PropertyAttributes::from_bits_truncate(0b1_0001);
        assert!(attrs.is_empty());
        assert_eq!(ClassAttributes::from_bits_truncate(0b11).bits(), 2);
    }

    #[test]
    fn test_class_attributes() {
        assert_eq!(ClassAttributes::NONE.bits(), 0);
        assert_eq!(ClassAttributes::NO_AUTOMATIC_PROTOTYPE.bits(), 2);
        assert!((ClassAttributes::NONE | ClassAttributes::NO_AUTOMATIC_PROTOTYPE)
            .contains(ClassAttributes::NO_AUTOMATIC_PROTOTYPE));
    }

    #[test]
    fn test_debug_lists_flags() {
        assert_eq!(
            format!("{:?}", PropertyAttributes::READ_ONLY | PropertyAttributes::DONT_ENUM),
            "PropertyAttributes(READ_ONLY | DONT_ENUM)"
        );
        assert_eq!(format!("{:?}", ClassAttributes::NONE), "ClassAttributes(NONE)");
    }
}
