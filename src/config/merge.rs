//! Record merge primitives.
//!
//! Non-default-wins layering: a patch field replaces the current value only
//! when it differs from that field's declared default. This gives the
//! defaults → file → env precedence used by the configuration loader and
//! the field-by-field `Merge` impls on every settings record.

/// Field-by-field record merge against declared defaults.
pub trait Merge {
    /// Merge `patch` on top of `self`: each field keeps the patch value
    /// only when it differs from that field's default.
    #[must_use]
    fn merge(self, patch: Self) -> Self;
}

/// Keep `patch` only if it differs from the declared `default`; otherwise
/// retain `current`.
#[must_use]
pub fn merge_field<T: PartialEq>(current: T, patch: T, default: &T) -> T {
    if &patch == default {
        current
    } else {
        patch
    }
}
