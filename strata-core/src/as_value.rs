use crate::{Error, Result, Value, truncate_long};
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use std::{any, str::FromStr};
use time::{
    Date, OffsetDateTime, PrimitiveDateTime, Time, format_description::parse_borrowed,
};
use uuid::Uuid;

/// Conversion between native Rust types and the dynamically typed [`Value`]
/// used for bound parameters, default literals and decoded rows.
///
/// # Conversion contract
/// - `try_from_value` accepts the canonical variant for the type and the
///   variants drivers commonly return instead (any integer width for integers,
///   text for temporal types). Integer conversions are range checked.
/// - `Value::Varchar` payloads fall back to [`AsValue::parse`], this is how
///   default literals declared on columns become typed values.
///
/// # Examples
/// ```rust
/// use strata_core::{AsValue, Value};
/// let v = 42i32.as_value();
/// assert!(matches!(v, Value::Int32(Some(42))));
/// let n: i64 = AsValue::try_from_value(v).unwrap();
/// assert_eq!(n, 42);
/// ```
pub trait AsValue {
    /// The NULL variant matching this type.
    fn as_empty_value() -> Value;
    /// Owned [`Value`] representation.
    fn as_value(self) -> Value;
    /// Attempt to convert a dynamic [`Value`] into `Self`.
    fn try_from_value(value: Value) -> Result<Self>
    where
        Self: Sized;
    /// Parse a literal, the whole input must be consumed.
    fn parse(input: impl AsRef<str>) -> Result<Self>
    where
        Self: Sized,
    {
        Err(Error::msg(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(input.as_ref()),
            any::type_name::<Self>()
        )))
    }
}

impl<T: AsValue> From<T> for Value {
    fn from(value: T) -> Self {
        value.as_value()
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Varchar(Some(value.into()))
    }
}

fn cannot_convert<T>(value: &Value) -> Error {
    Error::msg(format!(
        "Cannot convert {value:?} to {}",
        any::type_name::<T>(),
    ))
}

fn parse_str<T: FromStr>(input: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    input.trim().parse::<T>().map_err(|e| {
        Error::new(e).context(format!(
            "Cannot parse `{}` as {}",
            truncate_long!(input),
            any::type_name::<T>()
        ))
    })
}

macro_rules! impl_as_value {
    ($source:ty, $destination:path, $parse:expr $(, $pat_rest:pat $(if $guard:expr)? => $expr_rest:expr)* $(,)?) => {
        impl AsValue for $source {
            fn as_empty_value() -> Value {
                $destination(None)
            }
            fn as_value(self) -> Value {
                $destination(Some(self.into()))
            }
            fn try_from_value(value: Value) -> Result<Self> {
                #[allow(unreachable_patterns)]
                match value {
                    $destination(Some(v)) => Ok(v.into()),
                    $($pat_rest $(if $guard)? => $expr_rest,)*
                    Value::Varchar(Some(ref v)) => <Self as AsValue>::parse(v),
                    _ => Err(cannot_convert::<Self>(&value)),
                }
            }
            fn parse(input: impl AsRef<str>) -> Result<Self> {
                let parse: fn(&str) -> Result<Self> = $parse;
                parse(input.as_ref())
            }
        }
    };
}

macro_rules! impl_as_value_integer {
    ($source:ty, $destination:path) => {
        impl_as_value!(
            $source,
            $destination,
            |v: &str| parse_str::<$source>(v),
            ref v if v.as_i64().is_some() => {
                let wide = v.as_i64().unwrap_or_default();
                <$source>::try_from(wide).map_err(|_| {
                    Error::msg(format!(
                        "Value {wide} is out of range for {}",
                        any::type_name::<$source>(),
                    ))
                })
            },
            Value::UInt64(Some(v)) => <$source>::try_from(v).map_err(|_| {
                Error::msg(format!(
                    "Value {v}: u64 is out of range for {}",
                    any::type_name::<$source>(),
                ))
            }),
            Value::Decimal(Some(v)) => {
                let error = Error::msg(format!(
                    "Value {v}: Decimal does not fit into {}",
                    any::type_name::<$source>()
                ));
                if !v.is_integer() {
                    return Err(error.context("The value is not a integer"));
                }
                v.to_i64()
                    .and_then(|v| <$source>::try_from(v).ok())
                    .ok_or(error)
            },
        );
    };
}

impl_as_value_integer!(i8, Value::Int8);
impl_as_value_integer!(i16, Value::Int16);
impl_as_value_integer!(i32, Value::Int32);
impl_as_value_integer!(i64, Value::Int64);
impl_as_value_integer!(u8, Value::UInt8);
impl_as_value_integer!(u16, Value::UInt16);
impl_as_value_integer!(u32, Value::UInt32);
impl_as_value_integer!(u64, Value::UInt64);

impl_as_value!(
    bool,
    Value::Boolean,
    |v: &str| match v.trim() {
        x if x.eq_ignore_ascii_case("true") || x == "1" => Ok(true),
        x if x.eq_ignore_ascii_case("false") || x == "0" => Ok(false),
        _ => Err(Error::msg(format!("Cannot parse `{}` as bool", truncate_long!(v)))),
    },
    ref v if v.as_i64().is_some() => Ok(v.as_i64() != Some(0)),
);

impl_as_value!(
    f32,
    Value::Float32,
    |v: &str| parse_str::<f32>(v),
    Value::Float64(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v)) => v
        .to_f32()
        .ok_or_else(|| Error::msg(format!("Value {v}: Decimal does not fit into f32"))),
    ref v if v.as_i64().is_some() => Ok(v.as_i64().unwrap_or_default() as _),
);

impl_as_value!(
    f64,
    Value::Float64,
    |v: &str| parse_str::<f64>(v),
    Value::Float32(Some(v)) => Ok(v as _),
    Value::Decimal(Some(v)) => v
        .to_f64()
        .ok_or_else(|| Error::msg(format!("Value {v}: Decimal does not fit into f64"))),
    ref v if v.as_i64().is_some() => Ok(v.as_i64().unwrap_or_default() as _),
);

impl_as_value!(
    Decimal,
    Value::Decimal,
    |v: &str| parse_str::<Decimal>(v),
    Value::Float64(Some(v)) => Decimal::from_f64(v)
        .ok_or_else(|| Error::msg(format!("Value {v}: f64 does not fit into Decimal"))),
    Value::Float32(Some(v)) => Decimal::from_f32(v)
        .ok_or_else(|| Error::msg(format!("Value {v}: f32 does not fit into Decimal"))),
    ref v if v.as_i64().is_some() => Ok(Decimal::from(v.as_i64().unwrap_or_default())),
);

impl_as_value!(String, Value::Varchar, |v: &str| Ok(v.to_owned()));

impl_as_value!(
    Box<[u8]>,
    Value::Blob,
    |v: &str| Ok(v.as_bytes().into()),
);

impl AsValue for Vec<u8> {
    fn as_empty_value() -> Value {
        Value::Blob(None)
    }
    fn as_value(self) -> Value {
        Value::Blob(Some(self.into_boxed_slice()))
    }
    fn try_from_value(value: Value) -> Result<Self> {
        <Box<[u8]> as AsValue>::try_from_value(value).map(Into::into)
    }
}

macro_rules! parse_time {
    ($value: expr, $($formats:literal),+ $(,)?) => {
        'value: {
            let value = $value.trim();
            $(
                let format = parse_borrowed::<2>($formats)?;
                if let Ok(parsed) = <Self>::parse(value, &format) {
                    break 'value Ok(parsed);
                }
            )+
            Err(Error::msg(format!(
                "Cannot parse `{}` as {}",
                truncate_long!(value),
                any::type_name::<Self>()
            )))
        }
    }
}

impl_as_value!(Date, Value::Date, |v: &str| parse_time!(v, "[year]-[month]-[day]"));

impl_as_value!(
    Time,
    Value::Time,
    |v: &str| parse_time!(
        v,
        "[hour]:[minute]:[second].[subsecond]",
        "[hour]:[minute]:[second]",
        "[hour]:[minute]",
    ),
);

impl_as_value!(
    PrimitiveDateTime,
    Value::Timestamp,
    |v: &str| parse_time!(
        v,
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]",
        "[year]-[month]-[day]T[hour]:[minute]:[second]",
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]",
        "[year]-[month]-[day] [hour]:[minute]:[second]",
        "[year]-[month]-[day] [hour]:[minute]",
    ),
    Value::TimestampWithTimezone(Some(v)) => Ok(PrimitiveDateTime::new(v.date(), v.time())),
);

impl_as_value!(
    OffsetDateTime,
    Value::TimestampWithTimezone,
    |v: &str| parse_time!(
        v,
        "[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond][offset_hour sign:mandatory]:[offset_minute]",
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour sign:mandatory]:[offset_minute]:[offset_second]",
        "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]:[offset_second]",
        "[year]-[month]-[day] [hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]",
    ),
    Value::Timestamp(Some(v)) => Ok(v.assume_utc()),
);

impl_as_value!(
    Uuid,
    Value::Uuid,
    |v: &str| parse_str::<Uuid>(v),
    Value::Blob(Some(ref v)) => Uuid::from_slice(v).map_err(Error::new),
);

impl<T: AsValue> AsValue for Option<T> {
    fn as_empty_value() -> Value {
        T::as_empty_value()
    }
    fn as_value(self) -> Value {
        match self {
            Some(v) => v.as_value(),
            None => T::as_empty_value(),
        }
    }
    fn try_from_value(value: Value) -> Result<Self> {
        Ok(if value.is_null() {
            None
        } else {
            Some(<T as AsValue>::try_from_value(value)?)
        })
    }
    fn parse(input: impl AsRef<str>) -> Result<Self> {
        let input = input.as_ref();
        if input.trim().eq_ignore_ascii_case("null") {
            return Ok(None);
        }
        T::parse(input).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_widen_and_check_range() {
        assert_eq!(i64::try_from_value(Value::Int8(Some(-3))).unwrap(), -3);
        assert_eq!(u16::try_from_value(Value::Int64(Some(65535))).unwrap(), 65535);
        assert!(u8::try_from_value(Value::Int64(Some(256))).is_err());
        assert!(i32::try_from_value(Value::Int64(Some(i64::MAX))).is_err());
    }

    #[test]
    fn integers_convert_to_other_kinds() {
        assert!(bool::try_from_value(Value::Int32(Some(2))).unwrap());
        assert!(!bool::try_from_value(Value::UInt8(Some(0))).unwrap());
        assert_eq!(f64::try_from_value(Value::Int16(Some(-4))).unwrap(), -4.0);
        assert_eq!(
            Decimal::try_from_value(Value::Int64(Some(12))).unwrap(),
            Decimal::from(12)
        );
        assert!(bool::try_from_value(Value::Date(None)).is_err());
    }

    #[test]
    fn text_fallback() {
        assert_eq!(i32::try_from_value(Value::Varchar(Some("17".into()))).unwrap(), 17);
        assert!(bool::try_from_value(Value::Varchar(Some("TRUE".into()))).unwrap());
        assert_eq!(
            Date::try_from_value(Value::Varchar(Some("2024-02-29".into()))).unwrap(),
            time::macros::date!(2024 - 02 - 29)
        );
        assert!(i32::try_from_value(Value::Varchar(Some("17abc".into()))).is_err());
    }

    #[test]
    fn option_maps_null() {
        assert_eq!(Option::<i64>::try_from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<i64>::try_from_value(Value::Int64(None)).unwrap(), None);
        assert_eq!(Option::<i64>::try_from_value(Value::Int64(Some(5))).unwrap(), Some(5));
        assert!(None::<String>.as_value().is_null());
        assert!(matches!(None::<String>.as_value(), Value::Varchar(None)));
    }
}
