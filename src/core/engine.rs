//! MS-011: End-to-end pipeline from input paths to descriptors.
//!
//! locate → build packages → scan → resolve → describe. Every package is
//! built before any candidate is resolved, and the first error aborts the
//! run. Nothing here touches stdout or exits the process.

use super::builder::SourceModelBuilder;
use super::constraint::BuildContext;
use super::descriptor::{describe, TargetDescriptor};
use super::locate::Locator;
use super::resolver::resolve_all;
use super::scanner::scan;
use super::typemap::TypeMappingTable;
use super::types::{Package, Target};
use super::validator::SourceValidator;
use crate::config::Settings;
use crate::error::Result;

pub struct Engine {
    locator: Locator,
    validator: Box<dyn SourceValidator>,
    types: TypeMappingTable,
    context: BuildContext,
}

impl Engine {
    pub fn new(
        locator: Locator,
        validator: Box<dyn SourceValidator>,
        types: TypeMappingTable,
    ) -> Self {
        Self {
            locator,
            validator,
            types,
            context: BuildContext::host(),
        }
    }

    /// Select files for `context` instead of the host platform.
    pub fn with_build_context(mut self, context: BuildContext) -> Self {
        self.context = context;
        self
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.locator(),
            settings.validator(),
            TypeMappingTable::standard(),
        )
    }

    /// Locate and build every input's package, in input order.
    pub fn load<S: AsRef<str>>(&self, inputs: &[S]) -> Result<Vec<Package>> {
        let builder =
            SourceModelBuilder::new(self.validator.as_ref()).with_context(self.context.clone());
        inputs
            .iter()
            .map(|input| {
                let dir = self.locator.locate(input.as_ref())?;
                builder.build(&dir)
            })
            .collect()
    }

    /// Scan and resolve targets across already built packages.
    pub fn resolve(&self, packages: &[Package]) -> Result<Vec<Target>> {
        let candidates = scan(packages)?;
        Ok(resolve_all(&candidates)?)
    }

    pub fn describe(&self, targets: &[Target]) -> Result<Vec<TargetDescriptor>> {
        targets.iter().map(|t| describe(t, &self.types)).collect()
    }

    /// The whole pipeline.
    pub fn run<S: AsRef<str>>(&self, inputs: &[S]) -> Result<Vec<TargetDescriptor>> {
        let packages = self.load(inputs)?;
        let targets = self.resolve(&packages)?;
        let descriptors = self.describe(&targets)?;
        tracing::info!(targets = descriptors.len(), "resolution complete");
        Ok(descriptors)
    }
}
