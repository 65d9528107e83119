use serde::{Deserialize, Deserializer};

/// Tri-state field for partial updates.
///
/// A request field that is missing from the payload stays `Unset` and leaves
/// the stored value alone, an explicit JSON `null` becomes `Null` and clears
/// it, anything else is `Set`. Fields using it must carry `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Set(T),
}

impl<T> Patch<T> {
    /// Value after applying this patch on top of `current`.
    pub fn merge(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Unset => current,
            Patch::Null => None,
            Patch::Set(value) => Some(value),
        }
    }

    /// Maps a set value, turning `None` results into `Null`.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Option<U>) -> Patch<U> {
        match self {
            Patch::Unset => Patch::Unset,
            Patch::Null => Patch::Null,
            Patch::Set(value) => f(value).map_or(Patch::Null, Patch::Set),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Patch::Null, Patch::Set)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}
