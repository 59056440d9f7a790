//! Element-type information supplied by the mesh reader.
use std::collections::BTreeMap;

/// Element-type queries answered by the mesh reader.
///
/// The face tables must stay fixed for the lifetime of an analysis, since neighbor discovery
/// relies on them.
pub trait MeshReader: Send + Sync {
    /// Returns `None` if the element type is unknown.
    fn number_of_faces_for_element_type(&self, element_type: usize) -> Option<usize>;

    /// Local node indices of the given face of an element type.
    fn face_node_numbers_for_element_type(&self, element_type: usize, face: usize) -> Option<Vec<usize>>;

    /// Returns `None` if the element type is unknown.
    fn number_of_nodes_for_element_type(&self, element_type: usize) -> Option<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ElementTypeInfo {
    num_nodes: usize,
    faces: Vec<Vec<usize>>,
}

/// Face tables for the first-order Gmsh element types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmshElementTable {
    element_types: BTreeMap<usize, ElementTypeInfo>,
}

impl GmshElementTable {
    pub const POINT: usize = 15;
    pub const LINE2: usize = 1;
    pub const TRI3: usize = 2;
    pub const QUAD4: usize = 3;
    pub const TET4: usize = 4;
    pub const HEX8: usize = 5;

    pub fn new() -> Self {
        let mut element_types = BTreeMap::new();
        let mut insert = |element_type, num_nodes, faces: &[&[usize]]| {
            let faces = faces.iter().map(|face| face.to_vec()).collect();
            element_types.insert(element_type, ElementTypeInfo { num_nodes, faces });
        };

        insert(Self::POINT, 1, &[]);
        insert(Self::LINE2, 2, &[&[0], &[1]]);
        insert(Self::TRI3, 3, &[&[0, 1], &[1, 2], &[2, 0]]);
        insert(Self::QUAD4, 4, &[&[0, 1], &[1, 2], &[2, 3], &[3, 0]]);
        insert(Self::TET4, 4, &[&[0, 2, 1], &[0, 1, 3], &[1, 2, 3], &[0, 3, 2]]);
        insert(
            Self::HEX8,
            8,
            &[
                &[3, 2, 1, 0],
                &[0, 1, 5, 4],
                &[1, 2, 6, 5],
                &[2, 3, 7, 6],
                &[4, 7, 3, 0],
                &[5, 6, 7, 4],
            ],
        );

        Self { element_types }
    }
}

impl Default for GmshElementTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MeshReader for GmshElementTable {
    fn number_of_faces_for_element_type(&self, element_type: usize) -> Option<usize> {
        self.element_types.get(&element_type).map(|info| info.faces.len())
    }

    fn face_node_numbers_for_element_type(&self, element_type: usize, face: usize) -> Option<Vec<usize>> {
        self.element_types
            .get(&element_type)
            .and_then(|info| info.faces.get(face))
            .cloned()
    }

    fn number_of_nodes_for_element_type(&self, element_type: usize) -> Option<usize> {
        self.element_types.get(&element_type).map(|info| info.num_nodes)
    }
}
