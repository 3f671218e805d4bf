/// Raised when a string does not name any variant of a stored enum.
#[derive(Debug, Clone, thiserror::Error)]
#[error("'{value}' is not a valid {kind}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Declares an enum that is stored as a Postgres enum type and travels over
/// the wire under the same kebab-case labels. Extra labels after `|` are
/// accepted when parsing but never produced.
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident as $pg:literal {
            $($variant:ident = $label:literal $(| $alias:literal)*,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, sqlx::Type)]
        #[sqlx(type_name = $pg)]
        pub enum $name {
            $(
                #[serde(rename = $label $(, alias = $alias)*)]
                #[sqlx(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::database::models::UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label $(| $alias)* => Ok($name::$variant),)+
                    other => Err($crate::database::models::UnknownVariant {
                        kind: $pg,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

pub mod event;
pub mod organization;
pub mod prize;
pub mod staff;
pub mod step;

pub use event::*;
pub use organization::*;
pub use prize::*;
pub use staff::*;
pub use step::*;
