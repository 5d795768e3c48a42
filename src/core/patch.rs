//! Tri-state field updates.

use sea_orm::{ActiveValue, Value};

/// Update instruction for one optional field.
///
/// `Unset` leaves the stored value alone, `Clear` removes it and `Set` replaces it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum Patch<T> {
    /// Leave the field untouched
    #[default]
    Unset,
    /// Remove the stored value
    Clear,
    /// Store a new value
    Set(T),
}

impl<T> Patch<T> {
    /// Borrowed view of the new value, if one is being set.
    #[must_use]
    pub const fn as_set(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unset | Self::Clear => None,
        }
    }
}

impl<T> Patch<T>
where
    Option<T>: Into<Value>,
{
    /// Writes the patch into an active model field; `Unset` keeps the field out of the
    /// UPDATE statement.
    pub fn apply_to(self, field: &mut ActiveValue<Option<T>>) {
        match self {
            Self::Unset => {}
            Self::Clear => *field = ActiveValue::Set(None),
            Self::Set(value) => *field = ActiveValue::Set(Some(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_to_active_value() {
        let mut field: ActiveValue<Option<f64>> = ActiveValue::Unchanged(Some(5.0));
        Patch::Unset.apply_to(&mut field);
        assert_eq!(field, ActiveValue::Unchanged(Some(5.0)));

        Patch::Clear.apply_to(&mut field);
        assert_eq!(field, ActiveValue::Set(None));

        Patch::Set(9.5).apply_to(&mut field);
        assert_eq!(field, ActiveValue::Set(Some(9.5)));
    }
}
