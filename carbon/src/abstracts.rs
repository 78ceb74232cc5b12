//!
//! # Abstract type classes
//!
//! Every container marker carries, besides its shape, an abstract class:
//! arrays and columns are one of the multiset/set variants, objects one of
//! the multimap/map variants. Readers query the class; writers may derive a
//! container to a stronger class by rewriting its opener marker in place.
//!

use crate::field::{
    column_type_of_marker, is_array_marker, is_object_marker, ColumnType,
    DERIVED_ARRAY_SORTED_MULTISET, DERIVED_ARRAY_SORTED_SET, DERIVED_ARRAY_UNSORTED_SET,
    DERIVED_COLUMN_BASE, DERIVED_OBJECT_SORTED_MAP, DERIVED_OBJECT_SORTED_MULTIMAP,
    DERIVED_OBJECT_UNSORTED_MAP, MARKER_ARRAY_BEGIN, MARKER_OBJECT_BEGIN,
};
use ruc::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AbstractClass {
    UnsortedMultiset,
    SortedMultiset,
    UnsortedSet,
    SortedSet,
    UnsortedMultimap,
    SortedMultimap,
    UnsortedMap,
    SortedMap,
}

impl AbstractClass {
    #[inline(always)]
    pub fn is_sorted(self) -> bool {
        matches!(
            self,
            AbstractClass::SortedMultiset
                | AbstractClass::SortedSet
                | AbstractClass::SortedMultimap
                | AbstractClass::SortedMap
        )
    }

    /// Distinct-element guarantee (set or map).
    #[inline(always)]
    pub fn is_distinct(self) -> bool {
        matches!(
            self,
            AbstractClass::UnsortedSet
                | AbstractClass::SortedSet
                | AbstractClass::UnsortedMap
                | AbstractClass::SortedMap
        )
    }

    #[inline(always)]
    pub fn is_multiset(self) -> bool {
        matches!(
            self,
            AbstractClass::UnsortedMultiset | AbstractClass::SortedMultiset
        )
    }

    #[inline(always)]
    pub fn is_set(self) -> bool {
        matches!(self, AbstractClass::UnsortedSet | AbstractClass::SortedSet)
    }

    #[inline(always)]
    pub fn is_multimap(self) -> bool {
        matches!(
            self,
            AbstractClass::UnsortedMultimap | AbstractClass::SortedMultimap
        )
    }

    #[inline(always)]
    pub fn is_map(self) -> bool {
        matches!(self, AbstractClass::UnsortedMap | AbstractClass::SortedMap)
    }

    /// Classes a list-shaped container (array, column) may carry.
    #[inline(always)]
    pub fn is_list_class(self) -> bool {
        self.is_multiset() || self.is_set()
    }

    /// Classes an object may carry.
    #[inline(always)]
    pub fn is_map_class(self) -> bool {
        self.is_multimap() || self.is_map()
    }

    // Position of a list class within a derived column triple.
    fn column_variant(self) -> Option<u8> {
        match self {
            AbstractClass::SortedMultiset => Some(0),
            AbstractClass::UnsortedSet => Some(1),
            AbstractClass::SortedSet => Some(2),
            _ => None,
        }
    }
}

/// Abstract class encoded by a container opener.
pub fn class_of_marker(marker: u8) -> Result<AbstractClass> {
    match marker {
        MARKER_ARRAY_BEGIN => Ok(AbstractClass::UnsortedMultiset),
        DERIVED_ARRAY_SORTED_MULTISET => Ok(AbstractClass::SortedMultiset),
        DERIVED_ARRAY_UNSORTED_SET => Ok(AbstractClass::UnsortedSet),
        DERIVED_ARRAY_SORTED_SET => Ok(AbstractClass::SortedSet),
        MARKER_OBJECT_BEGIN => Ok(AbstractClass::UnsortedMultimap),
        DERIVED_OBJECT_SORTED_MULTIMAP => Ok(AbstractClass::SortedMultimap),
        DERIVED_OBJECT_UNSORTED_MAP => Ok(AbstractClass::UnsortedMap),
        DERIVED_OBJECT_SORTED_MAP => Ok(AbstractClass::SortedMap),
        m if column_type_of_marker(m).is_some() => {
            if m.is_ascii() {
                Ok(AbstractClass::UnsortedMultiset)
            } else {
                Ok(match (m - DERIVED_COLUMN_BASE) % 3 {
                    0 => AbstractClass::SortedMultiset,
                    1 => AbstractClass::UnsortedSet,
                    _ => AbstractClass::SortedSet,
                })
            }
        }
        m => Err(eg!(format!(
            "TypeMismatch: 0x{:02x} opens no container",
            m
        ))),
    }
}

/// Opener byte for an array of the given class.
pub fn array_marker_for(class: AbstractClass) -> Result<u8> {
    match class {
        AbstractClass::UnsortedMultiset => Ok(MARKER_ARRAY_BEGIN),
        AbstractClass::SortedMultiset => Ok(DERIVED_ARRAY_SORTED_MULTISET),
        AbstractClass::UnsortedSet => Ok(DERIVED_ARRAY_UNSORTED_SET),
        AbstractClass::SortedSet => Ok(DERIVED_ARRAY_SORTED_SET),
        _ => Err(eg!("TypeMismatch: arrays carry set/multiset classes only")),
    }
}

/// Opener byte for an object of the given class.
pub fn object_marker_for(class: AbstractClass) -> Result<u8> {
    match class {
        AbstractClass::UnsortedMultimap => Ok(MARKER_OBJECT_BEGIN),
        AbstractClass::SortedMultimap => Ok(DERIVED_OBJECT_SORTED_MULTIMAP),
        AbstractClass::UnsortedMap => Ok(DERIVED_OBJECT_UNSORTED_MAP),
        AbstractClass::SortedMap => Ok(DERIVED_OBJECT_SORTED_MAP),
        _ => Err(eg!("TypeMismatch: objects carry map/multimap classes only")),
    }
}

/// Opener byte for a column of the given primitive and class.
pub fn column_marker_for(ty: ColumnType, class: AbstractClass) -> Result<u8> {
    if class == AbstractClass::UnsortedMultiset {
        return Ok(ty.base_marker());
    }
    let variant = class
        .column_variant()
        .ok_or_else(|| eg!("TypeMismatch: columns carry set/multiset classes only"))?;
    Ok(DERIVED_COLUMN_BASE + (ty.index() as u8) * 3 + variant)
}

/// Opener byte that keeps the container at `marker` but carries `class`.
pub fn derive_marker(marker: u8, class: AbstractClass) -> Result<u8> {
    if is_array_marker(marker) {
        array_marker_for(class).c(d!())
    } else if is_object_marker(marker) {
        object_marker_for(class).c(d!())
    } else if let Some(ty) = column_type_of_marker(marker) {
        column_marker_for(ty, class).c(d!())
    } else {
        Err(eg!(format!(
            "TypeMismatch: 0x{:02x} opens no container",
            marker
        )))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn every_container_class_pair_has_a_distinct_marker() {
        let list_classes = [
            AbstractClass::UnsortedMultiset,
            AbstractClass::SortedMultiset,
            AbstractClass::UnsortedSet,
            AbstractClass::SortedSet,
        ];
        let map_classes = [
            AbstractClass::UnsortedMultimap,
            AbstractClass::SortedMultimap,
            AbstractClass::UnsortedMap,
            AbstractClass::SortedMap,
        ];

        let mut seen = std::collections::HashSet::new();
        for c in list_classes {
            assert!(seen.insert(pnk!(array_marker_for(c))));
            for ty in ColumnType::ALL {
                assert!(seen.insert(pnk!(column_marker_for(ty, c))));
            }
        }
        for c in map_classes {
            assert!(seen.insert(pnk!(object_marker_for(c))));
        }
        // 4 array + 40 column + 4 object markers
        assert_eq!(seen.len(), 48);
    }

    #[test]
    fn markers_roundtrip_through_classification() {
        for c in [
            AbstractClass::UnsortedMultiset,
            AbstractClass::SortedMultiset,
            AbstractClass::UnsortedSet,
            AbstractClass::SortedSet,
        ] {
            assert_eq!(pnk!(class_of_marker(pnk!(array_marker_for(c)))), c);
            for ty in ColumnType::ALL {
                let m = pnk!(column_marker_for(ty, c));
                assert_eq!(pnk!(class_of_marker(m)), c);
                assert_eq!(column_type_of_marker(m), Some(ty));
            }
        }
    }

    #[test]
    fn deriving_keeps_the_container_shape() {
        let m = pnk!(derive_marker(
            MARKER_ARRAY_BEGIN,
            AbstractClass::SortedSet
        ));
        assert_eq!(m, DERIVED_ARRAY_SORTED_SET);
        assert!(derive_marker(MARKER_ARRAY_BEGIN, AbstractClass::SortedMap).is_err());
    }

    #[test]
    fn class_predicates() {
        assert!(AbstractClass::SortedSet.is_sorted());
        assert!(AbstractClass::SortedSet.is_distinct());
        assert!(AbstractClass::SortedSet.is_set());
        assert!(!AbstractClass::UnsortedMultimap.is_sorted());
        assert!(AbstractClass::UnsortedMap.is_map());
        assert!(AbstractClass::UnsortedMap.is_map_class());
        assert!(!AbstractClass::UnsortedMap.is_list_class());
    }
}
