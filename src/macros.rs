/// Macro to implement `From<T>` for newtype wrappers around primitive types.
#[macro_export]
macro_rules! impl_from_primitive {
    ($wrapper:ident, $primitive:ty) => {
        impl From<$primitive> for $wrapper {
            fn from(value: $primitive) -> Self {
                Self(value)
            }
        }

        impl From<$wrapper> for $primitive {
            fn from(wrapper: $wrapper) -> Self {
                wrapper.0
            }
        }
    };
}

/// Macro to implement `From<&str>` and `AsRef<str>` for newtype wrappers around `String`.
#[macro_export]
macro_rules! impl_from_str_ref {
    ($wrapper:ident) => {
        impl From<&str> for $wrapper {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl AsRef<str> for $wrapper {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}
