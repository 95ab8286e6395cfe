//! Bind parameters.
//!
//! Every value appended to a [`Sql`](crate::Sql) builder becomes a [`Param`].
//! The set of variants is closed: anything that cannot be converted into a
//! `Param` is rejected by the compiler instead of being coerced to text at
//! execution time.

use bytes::BytesMut;
use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use std::error::Error;
use tokio_postgres::types::{IsNull, ToSql, Type, WrongType, to_sql_checked};

type BoxError = Box<dyn Error + Sync + Send>;

/// A single positional bind value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    /// 32-bit integer.
    Int(i32),
    /// 64-bit integer.
    Long(i64),
    /// Text.
    Text(String),
    /// Boolean.
    Bool(bool),
    /// Local date-time without a zone.
    DateTime(NaiveDateTime),
}

impl Param {
    /// Short name of the variant, logged with each statement.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Text(_) => "text",
            Self::Bool(_) => "bool",
            Self::DateTime(_) => "datetime",
        }
    }
}

impl From<i32> for Param {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for Param {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<NaiveDateTime> for Param {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

// The server decides the parameter type from the statement; each variant
// adapts to the compatible types it can represent and refuses the rest.
impl ToSql for Param {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
        match self {
            Self::Int(value) => bind_integer(i64::from(*value), ty, out),
            Self::Long(value) => bind_integer(*value, ty, out),
            Self::Text(value) => bind_exact(&value.as_str(), ty, out),
            Self::Bool(value) => bind_exact(value, ty, out),
            Self::DateTime(value) => bind_datetime(value, ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

fn bind_integer(value: i64, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::INT2 => i16::try_from(value)?.to_sql(ty, out),
        Type::INT4 => i32::try_from(value)?.to_sql(ty, out),
        Type::INT8 => value.to_sql(ty, out),
        _ => Err(Box::new(WrongType::new::<i64>(ty.clone()))),
    }
}

fn bind_exact<T: ToSql>(value: &T, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    if T::accepts(ty) {
        value.to_sql(ty, out)
    } else {
        Err(Box::new(WrongType::new::<T>(ty.clone())))
    }
}

fn bind_datetime(value: &NaiveDateTime, ty: &Type, out: &mut BytesMut) -> Result<IsNull, BoxError> {
    match *ty {
        Type::TIMESTAMP => value.to_sql(ty, out),
        Type::TIMESTAMPTZ => {
            let zoned = Local
                .from_local_datetime(value)
                .earliest()
                .ok_or_else(|| format!("{value} does not exist in the local time zone"))?;
            zoned.with_timezone(&Utc).to_sql(ty, out)
        }
        _ => Err(Box::new(WrongType::new::<NaiveDateTime>(ty.clone()))),
    }
}

/// Conversion into the ordered parameter list of one `append` call.
///
/// Implemented for single values, `()`, arrays, vectors, slices and tuples
/// of up to eight values, so mixed-type parameters can be passed together:
///
/// ```ignore
/// sql.append("SET title = ?, isBlind = ?", ("new title", true));
/// sql.append("WHERE id IN (?, ?, ?)", [0, 1, 3]);
/// sql.append("FROM article", ());
/// ```
pub trait IntoParams {
    fn into_params(self) -> Vec<Param>;
}

impl IntoParams for () {
    fn into_params(self) -> Vec<Param> {
        Vec::new()
    }
}

impl IntoParams for &str {
    fn into_params(self) -> Vec<Param> {
        vec![self.into()]
    }
}

macro_rules! impl_into_params_for_scalar {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoParams for $ty {
                fn into_params(self) -> Vec<Param> {
                    vec![self.into()]
                }
            }
        )+
    };
}

impl_into_params_for_scalar!(i32, i64, bool, String, NaiveDateTime, Param);

impl<T: Into<Param>, const N: usize> IntoParams for [T; N] {
    fn into_params(self) -> Vec<Param> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Param>> IntoParams for Vec<T> {
    fn into_params(self) -> Vec<Param> {
        self.into_iter().map(Into::into).collect()
    }
}

impl<T: Into<Param> + Clone> IntoParams for &[T] {
    fn into_params(self) -> Vec<Param> {
        self.iter().cloned().map(Into::into).collect()
    }
}

macro_rules! impl_into_params_for_tuple {
    ($($T:ident $v:ident),+) => {
        impl<$($T: Into<Param>),+> IntoParams for ($($T,)+) {
            fn into_params(self) -> Vec<Param> {
                let ($($v,)+) = self;
                vec![$($v.into()),+]
            }
        }
    };
}

impl_into_params_for_tuple!(A a);
impl_into_params_for_tuple!(A a, B b);
impl_into_params_for_tuple!(A a, B b, C c);
impl_into_params_for_tuple!(A a, B b, C c, D d);
impl_into_params_for_tuple!(A a, B b, C c, D d, E e);
impl_into_params_for_tuple!(A a, B b, C c, D d, E e, F f);
impl_into_params_for_tuple!(A a, B b, C c, D d, E e, F f, G g);
impl_into_params_for_tuple!(A a, B b, C c, D d, E e, F f, G g, H h);
