//! Discovery of attachment and neighbor relations between cells.
use crate::domain::DomainManager;
use crate::error::TopologyError;
use crate::mesh::{AttachedCells, CellHandle, MeshReader, NodeHandle, NUM_DIMENSIONS};
use log::info;
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::time::Instant;

/// Topological relations of a single cell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellAttachments {
    /// Attached cells of every other dimension.
    pub attached: AttachedCells,
    /// Same-dimension neighbor per local face.
    pub neighbors: Vec<Option<CellHandle>>,
}

impl DomainManager {
    /// Computes the attachments and face neighbors of a cell from the node attachment sets.
    ///
    /// A cell of higher dimension is attached if it contains every node of the target, and a cell
    /// of lower dimension is attached if all of its nodes belong to the target. A cell of the
    /// same dimension is the neighbor across a face if it contains every node of that face.
    pub fn compute_attachments(
        &self,
        cell: CellHandle,
        reader: &dyn MeshReader,
    ) -> Result<CellAttachments, TopologyError> {
        let target = self.cell(cell);
        let element_type = target.element_type;

        let number_of_faces = reader
            .number_of_faces_for_element_type(element_type)
            .ok_or(TopologyError::UnknownElementType(element_type))?;
        if let Some(expected) = reader.number_of_nodes_for_element_type(element_type) {
            if expected != target.nodes.len() {
                return Err(TopologyError::NodeCountMismatch {
                    cell,
                    element_type,
                    expected,
                    found: target.nodes.len(),
                });
            }
        }
        if !target.neighbors.is_empty() && target.neighbors.len() != number_of_faces {
            return Err(TopologyError::FaceCountMismatch {
                cell,
                expected: number_of_faces,
                found: target.neighbors.len(),
            });
        }

        let mut attached = AttachedCells::default();
        for dim in (0..NUM_DIMENSIONS).filter(|&dim| dim != target.dim) {
            let candidates: BTreeSet<CellHandle> = target
                .nodes
                .iter()
                .flat_map(|&node| self.node_by_handle(node).attached_cells[dim].iter().copied())
                .collect();
            for candidate in candidates {
                let other = self.cell(candidate);
                let is_attached = if dim > target.dim {
                    target.nodes.iter().all(|&node| other.contains_node(node))
                } else {
                    other.nodes.iter().all(|&node| target.contains_node(node))
                };
                if is_attached {
                    attached[dim].insert(candidate);
                }
            }
        }

        let mut neighbors = Vec::with_capacity(number_of_faces);
        for face in 0..number_of_faces {
            let local_nodes = reader
                .face_node_numbers_for_element_type(element_type, face)
                .ok_or(TopologyError::UnknownElementType(element_type))?;
            let face_nodes = local_nodes
                .iter()
                .map(|&local_node| {
                    target
                        .nodes
                        .get(local_node)
                        .copied()
                        .ok_or(TopologyError::FaceNodeOutOfRange { cell, face, local_node })
                })
                .collect::<Result<Vec<NodeHandle>, _>>()?;

            // Any cell containing the whole face is attached to its first node
            let neighbor = face_nodes.first().and_then(|&first| {
                self.node_by_handle(first).attached_cells[target.dim]
                    .iter()
                    .copied()
                    .find(|&candidate| {
                        candidate != cell
                            && face_nodes
                                .iter()
                                .all(|&node| self.cell(candidate).contains_node(node))
                    })
            });
            neighbors.push(neighbor);
        }

        Ok(CellAttachments { attached, neighbors })
    }

    /// Stores the relations of a cell, and the reverse attachments in the attached cells.
    fn record_attachments(&mut self, cell: CellHandle, attachments: CellAttachments) {
        for (dim, others) in attachments.attached.iter().enumerate() {
            for &other in others {
                self.cell_mut(other).attached_cells[cell.dim].insert(cell);
            }
            self.cell_mut(cell).attached_cells[dim].extend(others.iter().copied());
        }
        self.cell_mut(cell).neighbors = attachments.neighbors;
    }

    pub fn find_cells_attached_to(&mut self, cell: CellHandle, reader: &dyn MeshReader) -> Result<(), TopologyError> {
        let attachments = self.compute_attachments(cell, reader)?;
        self.record_attachments(cell, attachments);
        Ok(())
    }

    /// Finds the attachments and neighbors of every cell.
    ///
    /// The relations are computed in parallel and recorded afterwards, so that no attachment set
    /// is mutated concurrently.
    pub fn find_cell_attachments(&mut self, reader: &dyn MeshReader) -> Result<(), TopologyError> {
        let start = Instant::now();
        let handles: Vec<CellHandle> = self.cell_handles().collect();
        let attachments = handles
            .par_iter()
            .map(|&cell| self.compute_attachments(cell, reader))
            .collect::<Result<Vec<_>, _>>()?;
        for (cell, cell_attachments) in handles.into_iter().zip(attachments) {
            self.record_attachments(cell, cell_attachments);
        }
        info!("Found cell attachments in {:.3} s", start.elapsed().as_secs_f64());
        Ok(())
    }
}
