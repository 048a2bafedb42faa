use crate::PDFError;
use std::collections::HashMap;

/// A structural object number. Assigned sequentially from 1 at registration
/// time; never reused or reassigned within one document emission.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjId(pub u32);

/// The kinds of structural objects the serializer registers
#[derive(Eq, PartialEq, Hash, Copy, Clone, Debug)]
pub enum RefType {
    Catalog,
    Pages,
    Info,
    ViewerPreferences,
    Page(usize),
    ContentForPage(usize),
    /// The Type0 font object for the n-th distinct font used in the document
    Font(usize),
    CidFont(usize),
    FontDescriptor(usize),
    FontData(usize),
    ToUnicode(usize),
    Image(usize),
}

/// The registration half of the two-phase save: structural entities get
/// their object numbers here, strictly increasing from 1 in registration
/// order. Byte offsets are recorded separately at emission time.
pub struct ObjectReferences {
    refs: HashMap<RefType, ObjId>,
    next_id: u32,
}

impl ObjectReferences {
    pub fn new() -> ObjectReferences {
        ObjectReferences {
            refs: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register a structural object, assigning it the next object number
    pub fn gen(&mut self, ref_type: RefType) -> ObjId {
        let id = ObjId(self.next_id);
        self.next_id += 1;
        self.refs.insert(ref_type, id);
        id
    }

    pub fn get(&self, ref_type: RefType) -> Option<ObjId> {
        self.refs.get(&ref_type).copied()
    }

    /// Look up an object that must already be registered. Referencing an
    /// unregistered structural object is a graph-invariant violation and
    /// aborts the save.
    pub fn require(&self, ref_type: RefType) -> Result<ObjId, PDFError> {
        self.get(ref_type).ok_or_else(|| {
            PDFError::StructuralGraph(format!(
                "{ref_type:?} was referenced before it was registered"
            ))
        })
    }

    /// How many objects have been registered
    pub fn count(&self) -> u32 {
        self.next_id - 1
    }
}

impl Default for ObjectReferences {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_sequential_from_one() {
        let mut refs = ObjectReferences::new();
        assert_eq!(refs.gen(RefType::Catalog), ObjId(1));
        assert_eq!(refs.gen(RefType::Pages), ObjId(2));
        assert_eq!(refs.gen(RefType::Page(0)), ObjId(3));
        assert_eq!(refs.count(), 3);
    }

    #[test]
    fn unregistered_references_are_fatal() {
        let refs = ObjectReferences::new();
        assert!(matches!(
            refs.require(RefType::Pages),
            Err(PDFError::StructuralGraph(_))
        ));
    }
}
