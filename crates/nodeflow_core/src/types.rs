// SPDX-License-Identifier: MIT OR Apache-2.0
//! Value types that can live inside an attribute.

use crate::registry::TypeRegistry;
use std::any::Any;

/// Boolean value
pub type Bool = bool;
/// 32-bit signed integer
pub type Int32 = i32;
/// 32-bit unsigned integer
pub type UInt32 = u32;
/// 64-bit signed integer
pub type Int64 = i64;
/// 64-bit unsigned integer
pub type UInt64 = u64;
/// Single precision float
pub type Float = f32;
/// Double precision float
pub type Double = f64;
/// Owned UTF-8 string
pub type String = std::string::String;

/// A value type that can be registered and stored type-erased.
///
/// `Default` provides the freshly created value, `Clone` backs the copy
/// operation used by propagation. Types without a textual form keep the
/// default [`DataType::describe`].
pub trait DataType: Any + Clone + Default + Send + Sync {
    /// Human readable rendering of the value
    fn describe(&self) -> String {
        "unsupported".to_string()
    }
}

macro_rules! printable_data_type {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DataType for $ty {
                fn describe(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

printable_data_type!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    isize,
    usize,
    f32,
    f64,
    char,
    String,
);

/// Arithmetic used by the input view operators.
///
/// Each operation returns `None` instead of overflowing. Integers go through
/// the `checked_*` family; floats follow IEEE rules and never fail.
pub trait CheckedArithmetic: Sized {
    /// `self + rhs`
    fn try_add(self, rhs: Self) -> Option<Self>;
    /// `self - rhs`
    fn try_sub(self, rhs: Self) -> Option<Self>;
    /// `self * rhs`
    fn try_mul(self, rhs: Self) -> Option<Self>;
    /// `self / rhs`; `None` for a zero divisor or an overflowing quotient
    fn try_div(self, rhs: Self) -> Option<Self>;
}

macro_rules! checked_integer {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CheckedArithmetic for $ty {
                fn try_add(self, rhs: Self) -> Option<Self> {
                    self.checked_add(rhs)
                }

                fn try_sub(self, rhs: Self) -> Option<Self> {
                    self.checked_sub(rhs)
                }

                fn try_mul(self, rhs: Self) -> Option<Self> {
                    self.checked_mul(rhs)
                }

                fn try_div(self, rhs: Self) -> Option<Self> {
                    self.checked_div(rhs)
                }
            }
        )*
    };
}

checked_integer!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

macro_rules! float_arithmetic {
    ($($ty:ty),* $(,)?) => {
        $(
            impl CheckedArithmetic for $ty {
                fn try_add(self, rhs: Self) -> Option<Self> {
                    Some(self + rhs)
                }

                fn try_sub(self, rhs: Self) -> Option<Self> {
                    Some(self - rhs)
                }

                fn try_mul(self, rhs: Self) -> Option<Self> {
                    Some(self * rhs)
                }

                fn try_div(self, rhs: Self) -> Option<Self> {
                    Some(self / rhs)
                }
            }
        )*
    };
}

float_arithmetic!(f32, f64);

/// Register the primitive catalog under its short names
pub fn register_core_types(registry: &TypeRegistry) {
    registry.register_type_named::<Bool>("bool");

    registry.register_type_named::<Int32>("int32");
    registry.register_type_named::<UInt32>("uint32");
    registry.register_type_named::<Int64>("int64");
    registry.register_type_named::<UInt64>("uint64");

    registry.register_type_named::<Float>("float");
    registry.register_type_named::<Double>("double");

    registry.register_type_named::<String>("string");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Opaque;

    impl DataType for Opaque {}

    #[test]
    fn test_describe_primitives() {
        assert_eq!(39i32.describe(), "39");
        assert_eq!(true.describe(), "true");
        assert_eq!(2.5f32.describe(), "2.5");
        assert_eq!("text".to_string().describe(), "text");
    }

    #[test]
    fn test_describe_unsupported() {
        assert_eq!(Opaque.describe(), "unsupported");
    }

    #[test]
    fn test_checked_integers() {
        assert_eq!(2i32.try_add(3), Some(5));
        assert_eq!(i32::MAX.try_add(1), None);
        assert_eq!(0u32.try_sub(1), None);
        assert_eq!(i64::MAX.try_mul(2), None);
        assert_eq!(i32::MIN.try_div(-1), None);
        assert_eq!(7u64.try_div(0), None);
    }

    #[test]
    fn test_float_arithmetic_never_fails() {
        assert_eq!(f32::MAX.try_mul(2.0), Some(f32::INFINITY));
        assert_eq!(1.5f64.try_div(0.5), Some(3.0));
    }

    #[test]
    fn test_register_core_types() {
        let registry = TypeRegistry::new();
        register_core_types(&registry);

        assert_eq!(registry.type_descriptor::<Float>().unwrap().name, "float");
        assert_eq!(registry.type_descriptor::<String>().unwrap().name, "string");
        assert_eq!(registry.type_descriptors().len(), 8);
    }
}
