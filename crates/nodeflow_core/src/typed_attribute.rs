// SPDX-License-Identifier: MIT OR Apache-2.0
//! Strongly typed views over shared attributes.
//!
//! Nodes declare their ports as [`InputAttribute`] and [`OutputAttribute`]
//! fields. A view starts unbound and is bound by the scene when the node is
//! added; from then on it reads and writes the scene-owned [`Attribute`].
//!
//! Input views combine with `+ - * /`. Integer results that overflow come
//! back as [`CoreError::ArithmeticOverflow`] instead of panicking.

use crate::attribute::{Attribute, AttributeHandle};
use crate::descriptor::AttributeRole;
use crate::error::{CoreError, CoreResult};
use crate::types::{CheckedArithmetic, DataType};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Add, Div, Mul, Sub};
use std::sync::Arc;

/// A read/write view of an attribute holding a `T`
pub struct TypedAttribute<T> {
    attribute: Option<Arc<Attribute>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DataType> TypedAttribute<T> {
    /// Wrap an attribute, checking that it stores a `T`
    pub fn new(attribute: Option<Arc<Attribute>>) -> CoreResult<Self> {
        let attribute = attribute.ok_or(CoreError::NullAttribute)?;
        let value_type = attribute.value_type()?;
        if !value_type.is::<T>() {
            return Err(CoreError::mismatch(
                value_type.name.clone(),
                std::any::type_name::<T>(),
            ));
        }
        Ok(Self {
            attribute: Some(attribute),
            _marker: PhantomData,
        })
    }

    /// Point this view at `attribute`
    pub fn bind(&mut self, attribute: Arc<Attribute>) -> CoreResult<()> {
        *self = Self::new(Some(attribute))?;
        Ok(())
    }

    /// Whether the view has an attribute
    pub fn is_bound(&self) -> bool {
        self.attribute.is_some()
    }

    /// The underlying attribute
    pub fn attribute(&self) -> CoreResult<&Arc<Attribute>> {
        self.attribute.as_ref().ok_or(CoreError::NullAttribute)
    }

    /// Handle of the underlying attribute
    pub fn handle(&self) -> CoreResult<AttributeHandle> {
        self.attribute()?.handle()
    }

    /// Current value
    pub fn get(&self) -> CoreResult<T> {
        self.attribute()?.value::<T>()
    }

    /// Overwrite the value
    pub fn set(&self, value: T) -> CoreResult<()> {
        self.attribute()?.set_value(value)
    }
}

impl<T> Clone for TypedAttribute<T> {
    fn clone(&self) -> Self {
        Self {
            attribute: self.attribute.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> Default for TypedAttribute<T> {
    fn default() -> Self {
        Self {
            attribute: None,
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for TypedAttribute<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedAttribute")
            .field("type", &std::any::type_name::<T>())
            .field("attribute", &self.attribute)
            .finish()
    }
}

macro_rules! typed_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<T> {
            inner: TypedAttribute<T>,
        }

        impl<T: DataType> $name<T> {
            /// Wrap an attribute, checking that it stores a `T`
            pub fn new(attribute: Option<Arc<Attribute>>) -> CoreResult<Self> {
                TypedAttribute::new(attribute).map(|inner| Self { inner })
            }

            /// Point this view at `attribute`
            pub fn bind(&mut self, attribute: Arc<Attribute>) -> CoreResult<()> {
                self.inner.bind(attribute)
            }

            /// Whether the view has an attribute
            pub fn is_bound(&self) -> bool {
                self.inner.is_bound()
            }

            /// The underlying attribute
            pub fn attribute(&self) -> CoreResult<&Arc<Attribute>> {
                self.inner.attribute()
            }

            /// Handle of the underlying attribute
            pub fn handle(&self) -> CoreResult<AttributeHandle> {
                self.inner.handle()
            }

            /// Current value
            pub fn get(&self) -> CoreResult<T> {
                self.inner.get()
            }
        }

        impl<T> Clone for $name<T> {
            fn clone(&self) -> Self {
                Self {
                    inner: self.inner.clone(),
                }
            }
        }

        impl<T> Default for $name<T> {
            fn default() -> Self {
                Self {
                    inner: TypedAttribute::default(),
                }
            }
        }

        impl<T> fmt::Debug for $name<T> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_tuple(stringify!($name)).field(&self.inner).finish()
            }
        }
    };
}

typed_view!(
    /// Read-only view used for node inputs
    InputAttribute
);
typed_view!(
    /// Read/write view used for node outputs
    OutputAttribute
);

impl<T: DataType> OutputAttribute<T> {
    /// Overwrite the value; observers are notified
    pub fn set(&self, value: T) -> CoreResult<()> {
        self.inner.set(value)
    }
}

impl<T> Add for &InputAttribute<T>
where
    T: DataType + CheckedArithmetic,
{
    type Output = CoreResult<T>;

    fn add(self, rhs: Self) -> Self::Output {
        self.get()?
            .try_add(rhs.get()?)
            .ok_or(CoreError::ArithmeticOverflow)
    }
}

impl<T> Sub for &InputAttribute<T>
where
    T: DataType + CheckedArithmetic,
{
    type Output = CoreResult<T>;

    fn sub(self, rhs: Self) -> Self::Output {
        self.get()?
            .try_sub(rhs.get()?)
            .ok_or(CoreError::ArithmeticOverflow)
    }
}

impl<T> Mul for &InputAttribute<T>
where
    T: DataType + CheckedArithmetic,
{
    type Output = CoreResult<T>;

    fn mul(self, rhs: Self) -> Self::Output {
        self.get()?
            .try_mul(rhs.get()?)
            .ok_or(CoreError::ArithmeticOverflow)
    }
}

impl<T> Div for &InputAttribute<T>
where
    T: DataType + CheckedArithmetic + PartialEq,
{
    type Output = CoreResult<T>;

    fn div(self, rhs: Self) -> Self::Output {
        let divisor = rhs.get()?;
        if divisor == T::default() {
            return Err(CoreError::DivisionByZero);
        }
        self.get()?
            .try_div(divisor)
            .ok_or(CoreError::ArithmeticOverflow)
    }
}

/// A node field that can hold a port.
///
/// Lets the registry derive a port's value type and role from the field
/// alone.
pub trait PortField: Default {
    /// Value type stored by the port
    type Value: DataType;
    /// Role the port plays on its node
    const ROLE: AttributeRole;

    /// Bind the field to a scene attribute
    fn bind(&mut self, attribute: Arc<Attribute>) -> CoreResult<()>;
}

impl<T: DataType> PortField for TypedAttribute<T> {
    type Value = T;
    const ROLE: AttributeRole = AttributeRole::InOut;

    fn bind(&mut self, attribute: Arc<Attribute>) -> CoreResult<()> {
        TypedAttribute::bind(self, attribute)
    }
}

impl<T: DataType> PortField for InputAttribute<T> {
    type Value = T;
    const ROLE: AttributeRole = AttributeRole::Input;

    fn bind(&mut self, attribute: Arc<Attribute>) -> CoreResult<()> {
        InputAttribute::bind(self, attribute)
    }
}

impl<T: DataType> PortField for OutputAttribute<T> {
    type Value = T;
    const ROLE: AttributeRole = AttributeRole::Output;

    fn bind(&mut self, attribute: Arc<Attribute>) -> CoreResult<()> {
        OutputAttribute::bind(self, attribute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::AttributeDescriptor;
    use crate::registry::TypeRegistry;
    use crate::types::{register_core_types, Float, Int32, UInt32};

    fn attribute_of<T: DataType>(registry: &TypeRegistry, handle: u64) -> Arc<Attribute> {
        let descriptor = registry.register_attribute_descriptor(AttributeDescriptor::new(
            "Value",
            registry.type_handle::<T>(),
            AttributeRole::Input,
        ));
        Arc::new(
            registry
                .create_attribute(descriptor.handle, AttributeHandle::new(handle))
                .unwrap(),
        )
    }

    fn input(registry: &TypeRegistry, handle: u64, value: Float) -> InputAttribute<Float> {
        let attribute = attribute_of::<Float>(registry, handle);
        attribute.set_value(value).unwrap();
        InputAttribute::new(Some(attribute)).unwrap()
    }

    fn int_input(registry: &TypeRegistry, handle: u64, value: Int32) -> InputAttribute<Int32> {
        let attribute = attribute_of::<Int32>(registry, handle);
        attribute.set_value(value).unwrap();
        InputAttribute::new(Some(attribute)).unwrap()
    }

    fn setup() -> TypeRegistry {
        let registry = TypeRegistry::new();
        register_core_types(&registry);
        registry
    }

    #[test]
    fn test_basic_usage() {
        let registry = setup();
        let attribute = attribute_of::<Int32>(&registry, 2);
        let typed = TypedAttribute::<Int32>::new(Some(attribute.clone())).unwrap();

        assert_eq!(typed.handle().unwrap(), AttributeHandle::new(2));
        assert_eq!(typed.get().unwrap(), 0);
        typed.set(39).unwrap();
        assert_eq!(typed.get().unwrap(), 39);
        // the view shares storage with the attribute
        assert_eq!(attribute.value::<Int32>().unwrap(), 39);
    }

    #[test]
    fn test_null_attribute() {
        assert!(matches!(
            TypedAttribute::<Int32>::new(None),
            Err(CoreError::NullAttribute)
        ));

        let unbound = OutputAttribute::<Int32>::default();
        assert!(!unbound.is_bound());
        assert!(matches!(unbound.get(), Err(CoreError::NullAttribute)));
        assert!(matches!(unbound.set(1), Err(CoreError::NullAttribute)));
    }

    #[test]
    fn test_wrong_type() {
        let registry = setup();
        let attribute = attribute_of::<Int32>(&registry, 1);

        assert!(matches!(
            TypedAttribute::<Float>::new(Some(attribute.clone())),
            Err(CoreError::TypeMismatch { .. })
        ));

        let mut view = InputAttribute::<Float>::default();
        assert!(view.bind(attribute).is_err());
        assert!(!view.is_bound());
    }

    #[test]
    fn test_output_writes_through() {
        let registry = setup();
        let attribute = attribute_of::<Float>(&registry, 1);
        let mut output = OutputAttribute::<Float>::default();
        output.bind(attribute.clone()).unwrap();

        output.set(1.5).unwrap();
        let reader = InputAttribute::<Float>::new(Some(attribute)).unwrap();
        assert_eq!(reader.get().unwrap(), 1.5);
    }

    #[test]
    fn test_arithmetic() {
        let registry = setup();
        let a = input(&registry, 1, 6.0);
        let b = input(&registry, 2, 3.0);

        assert_eq!((&a + &b).unwrap(), 9.0);
        assert_eq!((&a - &b).unwrap(), 3.0);
        assert_eq!((&a * &b).unwrap(), 18.0);
        assert_eq!((&a / &b).unwrap(), 2.0);
    }

    #[test]
    fn test_division_by_zero() {
        let registry = setup();
        let a = input(&registry, 1, 6.0);
        let zero = input(&registry, 2, 0.0);

        assert!(matches!(&a / &zero, Err(CoreError::DivisionByZero)));
    }

    #[test]
    fn test_integer_arithmetic() {
        let registry = setup();
        let a = int_input(&registry, 1, 7);
        let b = int_input(&registry, 2, 2);

        assert_eq!((&a + &b).unwrap(), 9);
        assert_eq!((&a - &b).unwrap(), 5);
        assert_eq!((&a * &b).unwrap(), 14);
        assert_eq!((&a / &b).unwrap(), 3);
    }

    #[test]
    fn test_integer_overflow_is_an_error() {
        let registry = setup();
        let max = int_input(&registry, 1, Int32::MAX);
        let min = int_input(&registry, 2, Int32::MIN);
        let one = int_input(&registry, 3, 1);
        let minus_one = int_input(&registry, 4, -1);

        assert!(matches!(&max + &one, Err(CoreError::ArithmeticOverflow)));
        assert!(matches!(&min - &one, Err(CoreError::ArithmeticOverflow)));
        assert!(matches!(&max * &max, Err(CoreError::ArithmeticOverflow)));
        assert!(matches!(&min / &minus_one, Err(CoreError::ArithmeticOverflow)));
        // operands are left untouched
        assert_eq!(max.get().unwrap(), Int32::MAX);
    }

    #[test]
    fn test_integer_division_by_zero() {
        let registry = setup();
        let a = int_input(&registry, 1, 5);
        let zero = int_input(&registry, 2, 0);

        assert!(matches!(&a / &zero, Err(CoreError::DivisionByZero)));
    }

    #[test]
    fn test_unsigned_underflow() {
        let registry = TypeRegistry::new();
        registry.register_type::<UInt32>();
        let small = InputAttribute::<UInt32>::new(Some(attribute_of::<UInt32>(&registry, 1))).unwrap();
        let large = InputAttribute::<UInt32>::new(Some(attribute_of::<UInt32>(&registry, 2))).unwrap();
        large.attribute().unwrap().set_value(3u32).unwrap();

        assert!(matches!(&small - &large, Err(CoreError::ArithmeticOverflow)));
        assert_eq!((&large - &small).unwrap(), 3);
    }

    #[test]
    fn test_arithmetic_on_unbound_view() {
        let registry = setup();
        let a = input(&registry, 1, 6.0);
        let unbound = InputAttribute::<Float>::default();

        assert!(matches!(&a + &unbound, Err(CoreError::NullAttribute)));
    }

    #[test]
    fn test_port_roles() {
        assert_eq!(<InputAttribute<Float> as PortField>::ROLE, AttributeRole::Input);
        assert_eq!(<OutputAttribute<Float> as PortField>::ROLE, AttributeRole::Output);
        assert_eq!(<TypedAttribute<Float> as PortField>::ROLE, AttributeRole::InOut);
    }
}
