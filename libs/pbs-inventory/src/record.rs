//! Typed attribute records
//!
//! Every record parsed from `pbsnodes` output is a plain struct whose fields are
//! declared once together with the source key they are read from. The
//! [`attribute_record!`] macro generates the struct and its [`AttributeRecord`]
//! implementation, so parsers can assign fields by their source key while the
//! rest of the crate works with strongly typed fields.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Serialize;

use crate::error::FieldError;

/// Unit suffixes Torque appends to some numeric values (`35%`, `0 MB`, `34 C`)
const UNIT_SUFFIXES: &[&str] = &["%", "MB", "kb", "C"];

/// Current value of a record field, as returned by [`AttributeRecord::get_field`]
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(Option<String>),
    Integer(u64),
    Float(f64),
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(u64::from(value))
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// A record with a fixed set of fields addressable by their source key
pub trait AttributeRecord {
    /// Record name used in error messages and diagnostics
    const RECORD: &'static str;

    /// Source keys of all declared fields, in declaration order
    const FIELDS: &'static [&'static str];

    /// Assign `raw` to the field declared for `name`, coercing numeric fields.
    ///
    /// # Errors
    ///
    /// - [`FieldError::InvalidField`] if `name` is not a declared key
    /// - [`FieldError::TypeCoercion`] if a numeric field cannot be parsed from `raw`
    fn set_field(&mut self, name: &str, raw: &str) -> Result<(), FieldError>;

    /// Read the field declared for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`FieldError::UnknownField`] if `name` is not a declared key.
    fn get_field(&self, name: &str) -> Result<FieldValue, FieldError>;

    /// Keys reported by the scheduler that have no dedicated field
    fn extra_mut(&mut self) -> &mut BTreeMap<String, String>;

    #[must_use]
    fn declares(name: &str) -> bool {
        Self::FIELDS.contains(&name)
    }
}

/// Parse a numeric field value, tolerating surrounding whitespace and one unit suffix.
///
/// # Errors
///
/// Returns [`FieldError::TypeCoercion`] if the value is not a number of type `T`.
pub fn coerce<T: FromStr>(
    record: &'static str,
    field: &str,
    raw: &str,
) -> Result<T, FieldError> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<T>() {
        return Ok(value);
    }

    UNIT_SUFFIXES
        .iter()
        .find_map(|suffix| trimmed.strip_suffix(suffix))
        .and_then(|number| number.trim_end().parse::<T>().ok())
        .ok_or_else(|| FieldError::TypeCoercion {
            record,
            field: field.to_owned(),
            value: raw.to_owned(),
            expected: std::any::type_name::<T>(),
        })
}

macro_rules! __field_ty {
    (text) => { Option<String> };
    (($t:ty)) => { $t };
}

macro_rules! __field_set {
    (text, $slot:expr, $record:expr, $name:expr, $raw:expr) => {
        $slot = Some($raw.trim().to_owned())
    };
    (($t:ty), $slot:expr, $record:expr, $name:expr, $raw:expr) => {
        $slot = $crate::record::coerce::<$t>($record, $name, $raw)?
    };
}

macro_rules! __field_get {
    (text, $value:expr) => {
        $crate::record::FieldValue::Text($value.clone())
    };
    (($t:ty), $value:expr) => {
        $crate::record::FieldValue::from($value)
    };
}

/// Declare a record struct whose fields map to scheduler source keys.
///
/// Field kinds are `text` (stored as `Option<String>`) or a parenthesized
/// numeric type such as `(u32)` or `(f64)`. Fields listed under `extra { .. }`
/// are plain struct fields that are not addressable by key.
macro_rules! attribute_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident as $record:literal {
            $(
                $(#[$fmeta:meta])*
                $field:ident = $key:literal : $kind:tt
            ),* $(,)?
        }
        $(
            extra {
                $( $(#[$xmeta:meta])* $xfield:ident : $xty:ty ),* $(,)?
            }
        )?
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
        $vis struct $name {
            $( $( $(#[$xmeta])* pub $xfield: $xty, )* )?
            $( $(#[$fmeta])* pub $field: __field_ty!($kind), )*
            /// Reported keys without a dedicated field
            pub extra: std::collections::BTreeMap<String, String>,
        }

        impl $crate::record::AttributeRecord for $name {
            const RECORD: &'static str = $record;
            const FIELDS: &'static [&'static str] = &[$($key),*];

            fn set_field(
                &mut self,
                name: &str,
                raw: &str,
            ) -> Result<(), $crate::error::FieldError> {
                match name {
                    $( $key => __field_set!($kind, self.$field, $record, name, raw), )*
                    _ => {
                        return Err($crate::error::FieldError::InvalidField {
                            record: $record,
                            field: name.to_owned(),
                        });
                    }
                }
                Ok(())
            }

            fn get_field(
                &self,
                name: &str,
            ) -> Result<$crate::record::FieldValue, $crate::error::FieldError> {
                match name {
                    $( $key => Ok(__field_get!($kind, self.$field)), )*
                    _ => Err($crate::error::FieldError::UnknownField {
                        record: $record,
                        field: name.to_owned(),
                    }),
                }
            }

            fn extra_mut(&mut self) -> &mut std::collections::BTreeMap<String, String> {
                &mut self.extra
            }
        }
    };
}
