//! Newtype IDs for type-safe entity references.
//!
//! The REST backend issues opaque string identifiers (document IDs). Use the
//! `define_id!` macro to create wrappers that prevent accidentally passing a
//! product ID where a profile ID is expected.

/// Macro to define a type-safe string ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Display`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use pgcards_core::define_id;
/// define_id!(WidgetId);
/// define_id!(GadgetId);
///
/// let widget = WidgetId::new("64f1c0ffee");
/// let gadget = GadgetId::new("64f1c0ffee");
///
/// // These are different types, so this won't compile:
/// // let _: WidgetId = gadget;
/// assert_eq!(widget.as_str(), gadget.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the identifier.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }

            /// True when the backend handed back an empty identifier.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(ProfileId);
define_id!(ProductId);
define_id!(VariantId);
define_id!(CartItemId);
define_id!(OrderId);
define_id!(AddressId);
define_id!(PaymentIntentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = ProfileId::new("6650a1b2c3");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"6650a1b2c3\"");
        let back: ProfileId = serde_json::from_str("\"6650a1b2c3\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_is_empty_ignores_whitespace() {
        assert!(UserId::new("  ").is_empty());
        assert!(!UserId::new("u1").is_empty());
    }

    #[test]
    fn test_display_matches_inner() {
        assert_eq!(OrderId::from("ord_1").to_string(), "ord_1");
    }
}
