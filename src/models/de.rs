use serde::{Deserialize, Deserializer};

/// Read an explicit `null` as the type's default. Pair with
/// `#[serde(default)]` so a missing field behaves the same way.
///
/// Agent output is copied into these bodies verbatim, and the model
/// emits `null` for empty lists and strings as often as it omits them.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
