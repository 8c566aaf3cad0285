use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error("{path}: dataset has no rows")]
	EmptyDataset { path: PathBuf },

	#[error("{path}: need at least one feature column and a label column, found {found} column(s)")]
	TooFewColumns { path: PathBuf, found: usize },

	#[error("{path}:{line}: expected {expected} columns, found {found}")]
	RowWidth { path: PathBuf, line: usize, expected: usize, found: usize },

	#[error("{path}:{line}: column {column} is not a finite number: {value:?}")]
	Parse { path: PathBuf, line: usize, column: usize, value: String },

	#[error("need at least two classes to fit, found {found}")]
	TooFewClasses { found: usize },

	/// Every class must be seen at least twice.
	#[error("class {label:?} has {count} sample(s), need at least {required}")]
	InsufficientSamples { label: String, count: usize, required: usize },

	#[error("model fitting failed: {0}")]
	Fit(String),

	#[error("test rate must be in [0, 1), got {0}")]
	TestRate(f64),

	#[error("model expects {expected} features, got {found}")]
	FeatureWidth { expected: usize, found: usize },

	#[error("failed to render feature view: {0}")]
	Render(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
