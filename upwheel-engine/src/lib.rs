//! Upwheel Engine
//!
//! Weighted upgrade wheels: validation and building of wheel documents,
//! exhaustion-aware spins, progression values, and merging the results into
//! game configuration documents.
//! This crate never touches files; callers provide documents through
//! [`DocumentLoader`] and persist results through [`ResultsStorage`].

pub mod apply;
pub mod builder;
pub mod constants;
pub mod data;
pub mod document;
pub mod error;
pub mod numbers;
pub mod progression;
pub mod results;
pub mod schema;
pub mod session;
pub mod spinner;
pub mod summary;

// Re-export commonly used types
pub use apply::{apply_upgrades, deep_merge, missing_games, nested_update, with_version_header};
pub use builder::{build_wheel, load_wheel_document};
pub use data::{
    ChoiceTarget, Progression, Upgrade, UpgradeKey, UpgradeKind, UpgradePath, WeightedChoice,
    Wheel,
};
pub use document::{DocPath, Document, DocumentMap, Scalar, strip_bom};
pub use error::{
    ApplyError, CapacityError, LoadError, ProgressionError, ResultsError, SchemaError,
    SchemaViolation,
};
pub use progression::{macro_progression, value};
pub use results::{SavedResults, UpgradeResults};
pub use schema::validate_wheel_document;
pub use session::{CountingRng, SpinSession, derive_stream_seed};
pub use spinner::{
    Remaining, remaining_for_upgrade, remaining_for_wheel, spin_many, spin_once, spin_upgrades,
};
pub use summary::render_summary;

/// Trait for abstracting where wheel documents come from
/// Platform-specific implementations should provide this
pub trait DocumentLoader {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the raw wheel document
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be read or parsed.
    fn load_wheel_document(&self) -> Result<Document, Self::Error>;
}

/// Trait for abstracting save/load of spin results
pub trait ResultsStorage {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Save results under `name`
    ///
    /// # Errors
    ///
    /// Returns an error if the results cannot be saved.
    fn save_results(&self, name: &str, results: &SavedResults) -> Result<(), Self::Error>;

    /// Load results saved under `name`, if any
    ///
    /// # Errors
    ///
    /// Returns an error if stored results exist but cannot be read.
    fn load_results(&self, name: &str) -> Result<Option<SavedResults>, Self::Error>;

    /// Delete results saved under `name`
    ///
    /// # Errors
    ///
    /// Returns an error if the results cannot be deleted.
    fn delete_results(&self, name: &str) -> Result<(), Self::Error>;
}

/// Load, validate and build a wheel.
///
/// # Errors
///
/// Returns [`LoadError::Source`] when the loader fails and
/// [`LoadError::Schema`] when the document is not a valid wheel.
pub fn load_wheel<L: DocumentLoader>(loader: &L) -> Result<Wheel, LoadError<L::Error>> {
    let document = loader.load_wheel_document().map_err(LoadError::Source)?;
    Ok(load_wheel_document(&document)?)
}

/// Main engine tying a wheel source to results storage
pub struct UpgradeEngine<L, S>
where
    L: DocumentLoader,
    S: ResultsStorage,
{
    loader: L,
    storage: S,
}

impl<L, S> UpgradeEngine<L, S>
where
    L: DocumentLoader,
    S: ResultsStorage,
{
    /// Create a new engine with the provided loader and storage
    pub const fn new(loader: L, storage: S) -> Self {
        Self { loader, storage }
    }

    /// Load the wheel the loader currently provides
    ///
    /// # Errors
    ///
    /// See [`load_wheel`].
    pub fn load_wheel(&self) -> Result<Wheel, LoadError<L::Error>> {
        load_wheel(&self.loader)
    }

    /// Start a fresh session on a newly loaded wheel
    ///
    /// # Errors
    ///
    /// See [`load_wheel`].
    pub fn create_session(&self, seed: u64) -> Result<SpinSession, LoadError<L::Error>> {
        Ok(SpinSession::new(self.load_wheel()?, seed))
    }

    /// Save a session's results
    ///
    /// # Errors
    ///
    /// Returns an error if the results cannot be saved.
    pub fn save_session(&self, name: &str, session: &SpinSession) -> Result<(), S::Error> {
        self.storage.save_results(name, &session.saved())
    }

    /// Resume a saved session against the current wheel
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or the saved results no longer match
    /// the wheel.
    pub fn resume_session(&self, name: &str, seed: u64) -> Result<Option<SpinSession>, anyhow::Error>
    where
        L::Error: Into<anyhow::Error>,
        S::Error: Into<anyhow::Error>,
    {
        let Some(saved) = self.storage.load_results(name).map_err(Into::into)? else {
            return Ok(None);
        };
        // Always restore against a freshly loaded wheel
        let wheel = match self.load_wheel() {
            Ok(wheel) => wheel,
            Err(LoadError::Source(err)) => return Err(err.into()),
            Err(LoadError::Schema(err)) => return Err(err.into()),
        };
        Ok(Some(SpinSession::restore(wheel, saved, seed)?))
    }

    /// Forget results saved under `name`
    ///
    /// # Errors
    ///
    /// Returns an error if the results cannot be deleted.
    pub fn delete_session(&self, name: &str) -> Result<(), S::Error> {
        self.storage.delete_results(name)
    }
}
