//! Compile-time typed keys.
//!
//! A [`Field<T>`] names an entry and fixes the Rust type stored under it, so
//! a namespace schema can be written down once as a set of constants:
//!
//! ```ignore
//! const NAME: Field<String> = Field::new("name");
//! const AGE: Field<u32> = Field::new("age");
//!
//! store.set_field(&NAME, "John".to_string())?;
//! let age = store.get_field_or(&AGE, 0)?;
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

use super::{AsyncEnhanced, SyncEnhanced};
use crate::error::Result;

/// A key whose values have type `T`.
pub struct Field<T> {
    name: &'static str,
    _value: PhantomData<fn() -> T>,
}

impl<T> Field<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _value: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.name).finish()
    }
}

impl SyncEnhanced {
    /// Reads a typed field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`](crate::Error::Serialization) when the
    /// stored value does not fit `T`.
    pub fn get_field<T: DeserializeOwned>(&self, field: &Field<T>) -> Result<Option<T>> {
        self.get_item(field.name)?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Reads a typed field, or `fallback` when absent.
    pub fn get_field_or<T: DeserializeOwned>(&self, field: &Field<T>, fallback: T) -> Result<T> {
        Ok(self.get_field(field)?.unwrap_or(fallback))
    }

    /// Writes a typed field and echoes the value.
    pub fn set_field<T: Serialize>(&self, field: &Field<T>, value: T) -> Result<T> {
        self.set_item(field.name, serde_json::to_value(&value)?)?;
        Ok(value)
    }
}

impl AsyncEnhanced {
    /// Reads a typed field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`](crate::Error::Serialization) when the
    /// stored value does not fit `T`.
    pub async fn get_field<T: DeserializeOwned>(&self, field: &Field<T>) -> Result<Option<T>> {
        self.get_item(field.name)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(Into::into)
    }

    /// Reads a typed field, or `fallback` when absent.
    pub async fn get_field_or<T: DeserializeOwned>(
        &self,
        field: &Field<T>,
        fallback: T,
    ) -> Result<T> {
        Ok(self.get_field(field).await?.unwrap_or(fallback))
    }

    /// Writes a typed field and echoes the value.
    pub async fn set_field<T: Serialize>(&self, field: &Field<T>, value: T) -> Result<T> {
        self.set_item(field.name, serde_json::to_value(&value)?)
            .await?;
        Ok(value)
    }
}
