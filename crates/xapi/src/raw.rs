//! Fixed-width raw records filled by the field mover, and helpers to read them.

/// Declare a zero-initialised raw record, its field enum, and the
/// [`xapi_xml::RawRecord`] impl addressing each field.
macro_rules! raw_record {
    (
        $(#[$meta:meta])*
        pub struct $name:ident, field $field:ident {
            $($variant:ident => $member:ident : $width:literal),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            $(pub $member: [u8; $width],)*
        }

        impl Default for $name {
            fn default() -> Self {
                Self {
                    $($member: [0u8; $width],)*
                }
            }
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $field {
            $($variant,)*
        }

        impl xapi_xml::RawRecord for $name {
            type Field = $field;

            fn field_mut(&mut self, field: $field) -> &mut [u8] {
                match field {
                    $($field::$variant => &mut self.$member,)*
                }
            }
        }
    };
}

pub(crate) use raw_record;

/// Field content with trailing blanks and NULs removed.
pub fn text(field: &[u8]) -> String {
    String::from_utf8_lossy(field)
        .trim_end_matches([' ', '\0'])
        .to_string()
}

/// Whether the field received content (first byte above blank).
pub fn present(field: &[u8]) -> bool {
    field.first().is_some_and(|b| *b > b' ')
}

/// Decimal value of the field; blank, empty or malformed content reads as 0.
pub fn number(field: &[u8]) -> u32 {
    text(field).trim().parse().unwrap_or(0)
}

/// Case-insensitive prefix test on the field content.
pub fn starts_with(field: &[u8], prefix: &str) -> bool {
    field.len() >= prefix.len() && field[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes())
}
