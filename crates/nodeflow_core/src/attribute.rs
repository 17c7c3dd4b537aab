// SPDX-License-Identifier: MIT OR Apache-2.0
//! Type-erased value cells.
//!
//! An [`Attribute`] owns exactly one value of a registered type. Reads and
//! writes are checked against the type it was created for, and every
//! successful write publishes an [`AttributeEvent`] so the owning scene can
//! re-evaluate.

use crate::descriptor::{AttributeDescriptor, ErasedValue, TypeDescriptor};
use crate::error::{CoreError, CoreResult};
use crate::event::{AttributeEvent, EventBus, SceneId};
use crate::handle::TypeHandle;
use crate::types::DataType;
use parking_lot::RwLock;
use std::any::type_name;
use std::fmt;
use std::sync::Arc;

pub use crate::handle::AttributeHandle;

struct Publisher {
    bus: EventBus,
    scope: Option<SceneId>,
}

/// A type-erased value cell
#[derive(Default)]
pub struct Attribute {
    handle: AttributeHandle,
    descriptor: Option<Arc<AttributeDescriptor>>,
    value_type: Option<Arc<TypeDescriptor>>,
    data: RwLock<Option<ErasedValue>>,
    publisher: Option<Publisher>,
}

impl Attribute {
    /// Allocate a default value described by `value_type`
    pub fn new(
        descriptor: Arc<AttributeDescriptor>,
        value_type: Arc<TypeDescriptor>,
        handle: AttributeHandle,
    ) -> CoreResult<Self> {
        if descriptor.type_handle != value_type.handle {
            return Err(CoreError::mismatch(
                value_type.name.clone(),
                format!("type handle {}", descriptor.type_handle),
            ));
        }

        let data = (value_type.create)();
        Ok(Self {
            handle,
            descriptor: Some(descriptor),
            value_type: Some(value_type),
            data: RwLock::new(Some(data)),
            publisher: None,
        })
    }

    /// Publish change events on `bus`, tagged with `scope`
    pub fn with_event_bus(mut self, bus: EventBus, scope: Option<SceneId>) -> Self {
        self.publisher = Some(Publisher { bus, scope });
        self
    }

    /// Handle of this attribute
    pub fn handle(&self) -> CoreResult<AttributeHandle> {
        if self.handle.is_valid() {
            Ok(self.handle)
        } else {
            Err(CoreError::InvalidHandle)
        }
    }

    /// Port descriptor this attribute was created from
    pub fn descriptor(&self) -> CoreResult<Arc<AttributeDescriptor>> {
        self.descriptor.clone().ok_or(CoreError::NullData)
    }

    /// Descriptor of the stored value type
    pub fn value_type(&self) -> CoreResult<&Arc<TypeDescriptor>> {
        self.value_type.as_ref().ok_or(CoreError::NullData)
    }

    /// Handle of the stored value type
    pub fn type_handle(&self) -> CoreResult<TypeHandle> {
        self.value_type().map(|t| t.handle)
    }

    /// Whether the cell was never allocated
    pub fn is_null(&self) -> bool {
        self.data.read().is_none()
    }

    fn check_type<T: DataType>(&self) -> CoreResult<&Arc<TypeDescriptor>> {
        let value_type = self.value_type()?;
        if value_type.is::<T>() {
            Ok(value_type)
        } else {
            Err(CoreError::mismatch(value_type.name.clone(), type_name::<T>()))
        }
    }

    /// Read the value as `T`
    pub fn value<T: DataType>(&self) -> CoreResult<T> {
        let data = self.data.read();
        let value = data.as_ref().ok_or(CoreError::NullData)?;
        self.check_type::<T>()?;
        (**value)
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| CoreError::mismatch("stored value", type_name::<T>()))
    }

    /// Overwrite the value and publish a change event
    pub fn set_value<T: DataType>(&self, value: T) -> CoreResult<()> {
        {
            let mut data = self.data.write();
            let slot = data.as_mut().ok_or(CoreError::NullData)?;
            self.check_type::<T>()?;
            let slot = (**slot)
                .downcast_mut::<T>()
                .ok_or_else(|| CoreError::mismatch("stored value", type_name::<T>()))?;
            *slot = value;
        }
        self.publish_changed();
        Ok(())
    }

    /// Copy the value of `other` into this cell.
    ///
    /// Both cells must hold the same type. The copy goes through the type's
    /// `copy` operation, so the destination owns an independent value.
    pub fn copy_data_from(&self, other: &Attribute) -> CoreResult<()> {
        if std::ptr::eq(self, other) {
            if self.is_null() {
                return Err(CoreError::NullData);
            }
            self.publish_changed();
            return Ok(());
        }

        {
            let source = other.data.read();
            let source = source.as_ref().ok_or(CoreError::NullData)?;
            let mut target = self.data.write();
            let target = target.as_mut().ok_or(CoreError::NullData)?;

            let value_type = self.value_type()?;
            let other_type = other.value_type()?;
            if value_type.handle != other_type.handle {
                return Err(CoreError::mismatch(value_type.name.clone(), other_type.name.clone()));
            }
            if !(value_type.copy)(target, source) {
                return Err(CoreError::mismatch(value_type.name.clone(), other_type.name.clone()));
            }
        }
        self.publish_changed();
        Ok(())
    }

    /// Assign from another attribute; same as [`Attribute::copy_data_from`]
    pub fn set_value_from(&self, other: &Attribute) -> CoreResult<()> {
        self.copy_data_from(other)
    }

    /// Render the value with the type's `describe` operation
    pub fn to_display_string(&self) -> CoreResult<String> {
        let data = self.data.read();
        let value = data.as_ref().ok_or(CoreError::NullData)?;
        Ok((self.value_type()?.describe)(value))
    }

    fn publish_changed(&self) {
        if let Some(publisher) = &self.publisher {
            if self.handle.is_valid() {
                publisher
                    .bus
                    .publish(&AttributeEvent::changed(self.handle, publisher.scope));
            }
        }
    }
}

impl Drop for Attribute {
    fn drop(&mut self) {
        if let (Some(value), Some(value_type)) = (self.data.get_mut().take(), &self.value_type) {
            (value_type.destroy)(value);
        }
    }
}

impl fmt::Debug for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attribute")
            .field("handle", &self.handle)
            .field("name", &self.descriptor.as_ref().map(|d| d.name.as_str()))
            .field("type", &self.value_type.as_ref().map(|t| t.name.as_str()))
            .field("value", &self.to_display_string().ok())
            .finish()
    }
}
