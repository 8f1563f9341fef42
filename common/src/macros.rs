#[macro_export]
macro_rules! agg_mod {
    [ $( $name:ident $(,)? )+ ] => {
        $(
            pub mod $name;
        )+
    };
}

/// Maps each variant of a fieldless enum to the exact string stored in
/// documents, and generates `as_str`, `Display` and `FromStr` from that table.
/// Extra spellings listed after `|` are accepted by `FromStr` only.
#[macro_export]
macro_rules! impl_str_for_enum {
    ($enum_name:ident, $( $variant:ident => $literal:literal $( | $alias:literal )* ),+ $(,)?) => {
        impl $enum_name {
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( $enum_name::$variant => $literal, )+
                }
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = anyhow::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $literal $( | $alias )* => Ok($enum_name::$variant), )+
                    _ => Err(anyhow::anyhow!("Invalid {}: {}", stringify!($enum_name), s)),
                }
            }
        }
    };
}
