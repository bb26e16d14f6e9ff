//! Strongly-typed SQL identifiers.
//!
//! [`SchemaName`] and [`TableName`] can only hold identifiers that are safe to
//! emit in generated DDL: non-empty, lowercase ASCII letters, digits and `_`,
//! not starting with a digit. Values are produced by
//! [`IdentifierNormalizer`](crate::naming::IdentifierNormalizer); the checked
//! constructors exist for deserialization and tests.

/// Return true when `s` is a plain, lowercase SQL identifier.
pub fn is_safe_identifier(s: &str) -> bool {
    let mut bytes = s.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_lowercase() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Define a validated identifier newtype.
///
/// Generates `new()` (panics on an unsafe identifier), `try_new()`,
/// `as_str()`, `into_inner()`, a validating `Deserialize`, and the usual
/// string-view impls (`Display`, `AsRef<str>`, `Deref`, `Borrow<str>`,
/// `PartialEq<str>`).
macro_rules! define_identifier {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize)]
        #[serde(transparent)]
        $vis struct $Name(String);

        impl<'de> serde::Deserialize<'de> for $Name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $Name::try_new(s).ok_or_else(|| {
                    serde::de::Error::custom(concat!(
                        stringify!($Name),
                        " must be a lowercase SQL identifier"
                    ))
                })
            }
        }

        impl $Name {
            /// Wrap an identifier, panicking if it is not identifier-safe.
            ///
            /// Prefer [`try_new`](Self::try_new) for untrusted input.
            pub fn new(name: impl Into<String>) -> Self {
                let s = name.into();
                assert!(
                    is_safe_identifier(&s),
                    concat!(stringify!($Name), " must be a lowercase SQL identifier")
                );
                Self(s)
            }

            /// Wrap an identifier, returning `None` if it is not identifier-safe.
            pub fn try_new(name: impl Into<String>) -> Option<Self> {
                let s = name.into();
                if is_safe_identifier(&s) {
                    Some(Self(s))
                } else {
                    None
                }
            }

            /// Return the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner `String`.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $Name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $Name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl std::borrow::Borrow<str> for $Name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $Name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $Name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

define_identifier! {
    /// Physical schema holding one tenant's tables, e.g. `tenant_7b21599b_...`.
    pub struct SchemaName;
}

define_identifier! {
    /// Unqualified physical table name derived from a classification.
    pub struct TableName;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_identifier_accepts_normalized_names() {
        assert!(is_safe_identifier("robot_specs"));
        assert!(is_safe_identifier("t_2024_reports"));
        assert!(is_safe_identifier("_leading_underscore"));
    }

    #[test]
    fn test_safe_identifier_rejects_unsafe_names() {
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("2024_reports"));
        assert!(!is_safe_identifier("Robot"));
        assert!(!is_safe_identifier("robot specs"));
        assert!(!is_safe_identifier("robot-specs"));
        assert!(!is_safe_identifier("café"));
    }

    #[test]
    fn test_table_name_try_new() {
        assert!(TableName::try_new("orders").is_some());
        assert!(TableName::try_new("Orders").is_none());
    }

    #[test]
    #[should_panic(expected = "TableName must be a lowercase SQL identifier")]
    fn test_table_name_new_panics_on_unsafe() {
        let _ = TableName::new("drop table;");
    }

    #[test]
    fn test_table_name_borrow_lookup() {
        use std::collections::BTreeSet;
        let mut set = BTreeSet::new();
        set.insert(TableName::new("orders"));
        assert!(set.contains("orders"));
    }

    #[test]
    fn test_schema_name_deserialize_validates() {
        let ok: SchemaName = serde_json::from_str(r#""tenant_abc""#).unwrap();
        assert_eq!(ok, "tenant_abc");
        let err = serde_json::from_str::<SchemaName>(r#""tenant-abc""#);
        assert!(err.is_err());
    }
}
