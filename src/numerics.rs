//! Interfaces for element formulations and material models, and the registries that hold them.
use crate::dof::DofManager;
use crate::domain::DomainManager;
use crate::error::ConfigurationError;
use crate::mesh::{Cell, CellHandle};
use crate::solution::{BoundaryCondition, InitialCondition, TimeData};
use eyre::eyre;
use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;

/// A material model.
pub trait Material: Send + Sync {
    fn name(&self) -> &str;
}

/// An element formulation assigned to a region of the domain at a stage.
///
/// Hooks that receive a `&mut Cell` are called from parallel loops over the cells of one
/// dimension. Hooks that receive the domain and DOF managers are called sequentially.
pub trait Numerics: Send + Sync {
    fn name(&self) -> &str;

    fn required_number_of_materials(&self) -> usize {
        0
    }

    fn initialize_numerics_at(&self, cell: &mut Cell) -> eyre::Result<()>;

    fn initialize_materials_at(&self, _cell: &mut Cell, _materials: &[Arc<dyn Material>]) -> eyre::Result<()> {
        Ok(())
    }

    fn finalize_data_at(&self, cell: &mut Cell, time: &TimeData) -> eyre::Result<()>;

    /// Convergence criteria beyond the residual checks of the solution method.
    fn perform_additional_convergence_check_at(&self, _cell: &Cell, _stage: usize) -> bool {
        true
    }

    fn set_dof_stages_at(
        &self,
        _cell: CellHandle,
        _stage: usize,
        _domain: &mut DomainManager,
        _dofs: &mut DofManager,
    ) -> eyre::Result<()> {
        Ok(())
    }

    fn remove_constraints_on(
        &self,
        _cell: CellHandle,
        _domain: &mut DomainManager,
        _dofs: &mut DofManager,
    ) -> eyre::Result<()> {
        Ok(())
    }

    fn impose_constraint_at(
        &self,
        _cell: CellHandle,
        _stage: usize,
        condition: &BoundaryCondition,
        _time: &TimeData,
        _domain: &mut DomainManager,
        _dofs: &mut DofManager,
    ) -> eyre::Result<()> {
        Err(eyre!(
            "Numerics '{}' does not support boundary conditions of type '{}'",
            self.name(),
            condition.condition_type
        ))
    }

    fn impose_initial_condition_at(
        &self,
        _cell: CellHandle,
        _condition: &InitialCondition,
        _domain: &mut DomainManager,
        _dofs: &mut DofManager,
    ) -> eyre::Result<()> {
        Err(eyre!("Numerics '{}' does not support cell initial conditions", self.name()))
    }
}

type Constructor<T> = Box<dyn Fn() -> Box<T> + Send + Sync>;

/// Maps class names to constructors.
pub struct ObjectFactory<T: ?Sized> {
    constructors: BTreeMap<String, Constructor<T>>,
}

impl<T: ?Sized> Default for ObjectFactory<T> {
    fn default() -> Self {
        Self {
            constructors: BTreeMap::new(),
        }
    }
}

impl<T: ?Sized> Debug for ObjectFactory<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

impl<T: ?Sized> ObjectFactory<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a constructor, replacing any previous constructor with the same name.
    pub fn register<F>(&mut self, class_name: impl Into<String>, constructor: F)
    where
        F: Fn() -> Box<T> + Send + Sync + 'static,
    {
        self.constructors.insert(class_name.into(), Box::new(constructor));
    }

    pub fn has_class(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }

    pub fn instantiate(&self, class_name: &str) -> Result<Box<T>, ConfigurationError> {
        self.constructors
            .get(class_name)
            .map(|constructor| constructor())
            .ok_or_else(|| ConfigurationError::UnknownClass(class_name.to_string()))
    }
}

/// Numerics instances by label.
#[derive(Default)]
pub struct NumericsManager {
    factory: ObjectFactory<dyn Numerics>,
    numerics: BTreeMap<usize, Arc<dyn Numerics>>,
}

impl NumericsManager {
    pub fn new(factory: ObjectFactory<dyn Numerics>) -> Self {
        Self {
            factory,
            numerics: BTreeMap::new(),
        }
    }

    pub fn factory(&self) -> &ObjectFactory<dyn Numerics> {
        &self.factory
    }

    pub fn insert(&mut self, label: usize, numerics: Arc<dyn Numerics>) -> Result<(), ConfigurationError> {
        if self.numerics.contains_key(&label) {
            return Err(ConfigurationError::DuplicateNumericsLabel(label));
        }
        self.numerics.insert(label, numerics);
        Ok(())
    }

    /// Instantiates a registered numerics class under the given label.
    pub fn make_new_numerics(&mut self, label: usize, class_name: &str) -> Result<Arc<dyn Numerics>, ConfigurationError> {
        let numerics: Arc<dyn Numerics> = Arc::from(self.factory.instantiate(class_name)?);
        self.insert(label, numerics.clone())?;
        Ok(numerics)
    }

    pub fn numerics(&self, label: usize) -> Result<Arc<dyn Numerics>, ConfigurationError> {
        self.numerics
            .get(&label)
            .cloned()
            .ok_or(ConfigurationError::UnknownNumerics(label))
    }

    pub fn number_of_numerics(&self) -> usize {
        self.numerics.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Arc<dyn Numerics>)> {
        self.numerics.iter().map(|(label, numerics)| (*label, numerics))
    }
}

/// Material instances by label.
#[derive(Default)]
pub struct MaterialManager {
    factory: ObjectFactory<dyn Material>,
    materials: BTreeMap<usize, Arc<dyn Material>>,
}

impl MaterialManager {
    pub fn new(factory: ObjectFactory<dyn Material>) -> Self {
        Self {
            factory,
            materials: BTreeMap::new(),
        }
    }

    pub fn factory(&self) -> &ObjectFactory<dyn Material> {
        &self.factory
    }

    pub fn insert(&mut self, label: usize, material: Arc<dyn Material>) -> Result<(), ConfigurationError> {
        if self.materials.contains_key(&label) {
            return Err(ConfigurationError::DuplicateMaterialLabel(label));
        }
        self.materials.insert(label, material);
        Ok(())
    }

    pub fn make_new_material(&mut self, label: usize, class_name: &str) -> Result<Arc<dyn Material>, ConfigurationError> {
        let material: Arc<dyn Material> = Arc::from(self.factory.instantiate(class_name)?);
        self.insert(label, material.clone())?;
        Ok(material)
    }

    pub fn material(&self, label: usize) -> Result<Arc<dyn Material>, ConfigurationError> {
        self.materials
            .get(&label)
            .cloned()
            .ok_or(ConfigurationError::UnknownMaterial(label))
    }

    pub fn number_of_materials(&self) -> usize {
        self.materials.len()
    }
}
