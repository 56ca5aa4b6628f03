//! Macros to reduce boilerplate in the codebase

/// Generate `as_str`, `Display`, `FromStr` and an `ALL` list for a
/// fieldless enum whose variants map to fixed wire strings.
///
/// Parsing is case-insensitive. Unknown strings become
/// `BackofficeError::InvalidInput` naming the accepted values.
///
/// ```rust,ignore
/// wire_enum!(Movement, "stock movement", {
///     In => "in",
///     Out => "out",
/// });
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $enum_name:ident,
        $what:expr,
        { $($variant:ident => $str:literal),+ $(,)? }
    ) => {
        impl $enum_name {
            pub const ALL: &'static [$enum_name] = &[$($enum_name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($enum_name::$variant => $str,)+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = $crate::error::BackofficeError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($str => Ok($enum_name::$variant),)+
                    _ => {
                        let accepted: Vec<&str> = vec![$($str),+];
                        Err($crate::error::BackofficeError::InvalidInput(format!(
                            "invalid {} '{}', expected one of: {}",
                            $what,
                            s,
                            accepted.join(", ")
                        )))
                    }
                }
            }
        }
    };
}

#[cfg(test)]
mod test {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Shade {
        Light,
        Dark,
    }

    wire_enum!(Shade, "shade", { Light => "light", Dark => "dark" });

    #[test]
    fn test_display_and_parse() {
        assert_eq!(Shade::Dark.to_string(), "dark");
        assert_eq!(" LIGHT ".parse::<Shade>().unwrap(), Shade::Light);
        assert_eq!(Shade::ALL, &[Shade::Light, Shade::Dark]);
    }

    #[test]
    fn test_parse_error_lists_accepted_values() {
        let err = "dim".parse::<Shade>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid input: invalid shade 'dim', expected one of: light, dark"
        );
    }
}
