use crate::{Value, util::display_list};
use std::fmt::{self, Display};

/// Ordered values bound to the `?` placeholders of a statement.
#[derive(Default, Clone, Debug, PartialEq)]
pub struct Params(Vec<Value>);

impl Params {
    pub fn create() -> Self {
        Default::default()
    }

    pub fn add(&mut self, value: impl Into<Value>) -> &mut Self {
        self.0.push(value.into());
        self
    }

    pub fn add_params(&mut self, other: &Params) -> &mut Self {
        self.0.extend(other.0.iter().cloned());
        self
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Params {
    fn from(value: Vec<Value>) -> Self {
        Self(value)
    }
}

impl FromIterator<Value> for Params {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&display_list(&self.0))
    }
}

/// Build [`Params`] from heterogeneous values.
#[macro_export]
macro_rules! params {
    () => {
        $crate::Params::create()
    };
    ($($value:expr),+ $(,)?) => {{
        let mut params = $crate::Params::create();
        $(params.add($value);)+
        params
    }};
}
