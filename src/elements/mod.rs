//! Built-in element types.

pub mod border;
pub mod code;
pub mod date;
pub mod grade;
pub mod image;
pub mod qrcode;
pub mod text;
pub mod unknown;

use crate::registry::{ImplementationDescriptor, RecordConstructor};

pub use border::BorderElement;
pub use code::CodeElement;
pub use date::DateElement;
pub use grade::GradeElement;
pub use image::ImageElement;
pub use qrcode::QrCodeElement;
pub use text::TextElement;
pub use unknown::UnknownElement;

/// Type keys shipped with the core and how each is built.
pub const BUILTIN_TYPES: &[(&str, RecordConstructor)] = &[
    ("border", BorderElement::from_record),
    ("code", CodeElement::from_record),
    ("date", DateElement::from_record),
    ("grade", GradeElement::from_record),
    ("image", ImageElement::from_record),
    ("qrcode", QrCodeElement::from_record),
    ("text", TextElement::from_record),
];

pub fn builtin_implementation_id(key: &str) -> String {
    format!("certforge::elements::{key}")
}

/// `(type key, descriptor)` for every built-in type.
pub fn builtin_descriptors() -> Vec<(&'static str, ImplementationDescriptor)> {
    BUILTIN_TYPES
        .iter()
        .map(|(key, constructor)| {
            (
                *key,
                ImplementationDescriptor::from_record(
                    builtin_implementation_id(key),
                    semver::Version::new(1, 0, 0),
                    *constructor,
                ),
            )
        })
        .collect()
}
