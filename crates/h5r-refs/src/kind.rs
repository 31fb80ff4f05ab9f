use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of entity a reference points at.
///
/// The numeric values are the wire tags. Tag 0 and every tag from
/// [`ReferenceKind::MAX_TAG`] up are invalid and never held by a reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ReferenceKind {
    /// An object (group, dataset, named datatype) in the same container.
    Object = 1,
    /// A selection within a dataset in the same container.
    Region = 2,
    /// An attribute of an object in the same container.
    Attribute = 3,
    /// An object in another container, named by filename and path.
    ExternalObject = 4,
    /// A selection within a dataset in another container.
    ExternalRegion = 5,
    /// An attribute of an object in another container.
    ExternalAttribute = 6,
}

impl ReferenceKind {
    /// Tag reserved for "no kind" (before construction, on error).
    pub const INVALID_TAG: u8 = 0;

    /// One past the highest valid tag.
    pub const MAX_TAG: u8 = 7;

    /// Every valid kind, in tag order.
    pub const ALL: [ReferenceKind; 6] = [
        ReferenceKind::Object,
        ReferenceKind::Region,
        ReferenceKind::Attribute,
        ReferenceKind::ExternalObject,
        ReferenceKind::ExternalRegion,
        ReferenceKind::ExternalAttribute,
    ];

    /// The wire tag.
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a wire tag. Returns `None` unless the tag lies strictly between
    /// the two sentinels.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(ReferenceKind::Object),
            2 => Some(ReferenceKind::Region),
            3 => Some(ReferenceKind::Attribute),
            4 => Some(ReferenceKind::ExternalObject),
            5 => Some(ReferenceKind::ExternalRegion),
            6 => Some(ReferenceKind::ExternalAttribute),
            _ => None,
        }
    }

    /// Returns `true` for kinds whose target lives in another container.
    pub fn is_external(self) -> bool {
        matches!(
            self,
            ReferenceKind::ExternalObject
                | ReferenceKind::ExternalRegion
                | ReferenceKind::ExternalAttribute
        )
    }

    /// Returns `true` for `Region` and `ExternalRegion`.
    pub fn is_region(self) -> bool {
        matches!(self, ReferenceKind::Region | ReferenceKind::ExternalRegion)
    }

    /// Returns `true` for `Attribute` and `ExternalAttribute`.
    pub fn is_attribute(self) -> bool {
        matches!(
            self,
            ReferenceKind::Attribute | ReferenceKind::ExternalAttribute
        )
    }

    /// Human-readable name.
    pub fn name(self) -> &'static str {
        match self {
            ReferenceKind::Object => "object",
            ReferenceKind::Region => "region",
            ReferenceKind::Attribute => "attribute",
            ReferenceKind::ExternalObject => "external object",
            ReferenceKind::ExternalRegion => "external region",
            ReferenceKind::ExternalAttribute => "external attribute",
        }
    }
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
